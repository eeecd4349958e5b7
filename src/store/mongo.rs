//! MongoDB driver collections as service collections.

use async_trait::async_trait;
use bson::{Bson, Document};
use futures_util::TryStreamExt;
use mongodb::error::{Error, ErrorKind, WriteFailure};

use super::{Collection, ReplaceOutcome, StoreError};

const DUPLICATE_KEY_CODE: i32 = 11000;

fn store_error(err: Error) -> StoreError {
    match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref write_error))
            if write_error.code == DUPLICATE_KEY_CODE =>
        {
            StoreError::DuplicateKey {
                id: write_error.message.clone(),
            }
        }
        _ => StoreError::Backend(err.to_string()),
    }
}

#[async_trait]
impl Collection for mongodb::Collection<Document> {
    async fn find(&self, filter: Document) -> Result<Vec<Document>, StoreError> {
        let cursor = mongodb::Collection::find(self, filter)
            .await
            .map_err(store_error)?;
        cursor.try_collect().await.map_err(store_error)
    }

    async fn insert_one(&self, document: Document) -> Result<Bson, StoreError> {
        let result = mongodb::Collection::insert_one(self, document)
            .await
            .map_err(store_error)?;
        Ok(result.inserted_id)
    }

    async fn insert_many(&self, documents: Vec<Document>) -> Result<Vec<Bson>, StoreError> {
        let result = mongodb::Collection::insert_many(self, documents)
            .await
            .map_err(store_error)?;

        let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(index, _)| *index);
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }

    async fn replace_one(
        &self,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> Result<ReplaceOutcome, StoreError> {
        let result = mongodb::Collection::replace_one(self, filter, replacement)
            .upsert(upsert)
            .await
            .map_err(store_error)?;

        Ok(ReplaceOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn delete_many(&self, filter: Document) -> Result<u64, StoreError> {
        let result = mongodb::Collection::delete_many(self, filter)
            .await
            .map_err(store_error)?;
        Ok(result.deleted_count)
    }
}
