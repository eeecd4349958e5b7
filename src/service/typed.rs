//! TypedRecords - serde-typed accessor over a service collection.

use std::marker::PhantomData;

use bson::Document;
use futures_util::future::join_all;
use serde::{de::DeserializeOwned, Serialize};

use super::{DataService, DeleteOutcome, ServiceError};
use crate::query::IdQuery;

/// Trait for types stored through `DataService::records`.
///
/// Usually derived: `#[derive(Record)]` with `#[record(collection = "...")]`.
/// To receive identities back from `save`, declare the fields, e.g.
/// `#[serde(rename = "_id", skip_serializing_if = "Option::is_none")] native_id: Option<ObjectId>`
/// and `#[serde(skip_serializing_if = "Option::is_none")] id: Option<String>`.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    /// Name of the registered collection holding this record type.
    const COLLECTION: &'static str;
}

/// Typed view of one collection. Same semantics as the document methods.
pub struct TypedRecords<'a, R> {
    service: &'a DataService,
    _marker: PhantomData<R>,
}

impl<'a, R: Record> TypedRecords<'a, R> {
    pub fn new(service: &'a DataService) -> Self {
        Self {
            service,
            _marker: PhantomData,
        }
    }

    pub async fn fetch(&self, filter: Document) -> Result<Vec<R>, ServiceError> {
        self.service
            .fetch_in(R::COLLECTION, filter)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    pub async fn fetch_all(&self) -> Result<Vec<R>, ServiceError> {
        self.fetch(Document::new()).await
    }

    pub async fn fetch_one(
        &self,
        id_or_query: impl Into<IdQuery>,
    ) -> Result<Option<R>, ServiceError> {
        self.service
            .fetch_one_in(R::COLLECTION, id_or_query)
            .await?
            .map(from_document)
            .transpose()
    }

    /// Save `record` and return it as stored, identities included.
    pub async fn save(&self, record: &R) -> Result<R, ServiceError> {
        let document = bson::to_document(record)?;
        let outcome = self.service.save_in(R::COLLECTION, document).await?;
        from_document(outcome.record)
    }

    pub async fn save_many(&self, records: &[R]) -> Vec<Result<R, ServiceError>> {
        join_all(records.iter().map(|record| self.save(record))).await
    }

    pub async fn remove(
        &self,
        id_or_query: impl Into<IdQuery>,
    ) -> Result<DeleteOutcome, ServiceError> {
        self.service.remove_in(R::COLLECTION, id_or_query).await
    }
}

fn from_document<R: DeserializeOwned>(document: Document) -> Result<R, ServiceError> {
    Ok(bson::from_document(document)?)
}
