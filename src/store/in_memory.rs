//! InMemoryCollection - Vec-backed collection for testing and development.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document};

use super::filter::{matches, same_value, validate};
use super::{Collection, ReplaceOutcome, StoreError};

/// In-memory document collection.
///
/// Documents keep insertion order. Clone-friendly via Arc; clones share storage.
#[derive(Clone)]
pub struct InMemoryCollection {
    documents: Arc<RwLock<Vec<Document>>>,
}

impl Default for InMemoryCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCollection {
    /// Create a new empty collection.
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Number of stored documents.
    pub fn len(&self) -> Result<usize, StoreError> {
        let documents = self
            .documents
            .read()
            .map_err(|_| StoreError::LockPoisoned("read"))?;
        Ok(documents.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Store `document` with `_id` as its first field, assigning an ObjectId if needed.
    fn insert_locked(
        documents: &mut Vec<Document>,
        id: Option<Bson>,
        document: Document,
    ) -> Result<Bson, StoreError> {
        let id = id
            .or_else(|| document.get("_id").cloned())
            .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));

        let taken = documents.iter().any(|stored| {
            stored
                .get("_id")
                .is_some_and(|stored_id| same_value(stored_id, &id))
        });
        if taken {
            return Err(StoreError::DuplicateKey { id: id.to_string() });
        }

        documents.push(with_id_first(id.clone(), document));
        Ok(id)
    }
}

fn with_id_first(id: Bson, document: Document) -> Document {
    let mut stored = Document::new();
    stored.insert("_id", id);
    for (key, value) in document {
        if key != "_id" {
            stored.insert(key, value);
        }
    }
    stored
}

/// The `_id` an upsert should use when the filter pins one literally.
fn literal_id(filter: &Document) -> Option<Bson> {
    match filter.get("_id") {
        Some(Bson::Document(_)) | None => None,
        Some(id) => Some(id.clone()),
    }
}

#[async_trait]
impl Collection for InMemoryCollection {
    async fn find(&self, filter: Document) -> Result<Vec<Document>, StoreError> {
        validate(&filter)?;

        let documents = self
            .documents
            .read()
            .map_err(|_| StoreError::LockPoisoned("read"))?;

        let mut results = Vec::new();
        for document in documents.iter() {
            if matches(document, &filter)? {
                results.push(document.clone());
            }
        }

        Ok(results)
    }

    async fn insert_one(&self, document: Document) -> Result<Bson, StoreError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| StoreError::LockPoisoned("write"))?;

        Self::insert_locked(&mut documents, None, document)
    }

    /// Ordered insert: stops at the first failure, keeping earlier documents.
    async fn insert_many(&self, batch: Vec<Document>) -> Result<Vec<Bson>, StoreError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| StoreError::LockPoisoned("write"))?;

        let mut ids = Vec::with_capacity(batch.len());
        for document in batch {
            ids.push(Self::insert_locked(&mut documents, None, document)?);
        }

        Ok(ids)
    }

    async fn replace_one(
        &self,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> Result<ReplaceOutcome, StoreError> {
        validate(&filter)?;

        let mut documents = self
            .documents
            .write()
            .map_err(|_| StoreError::LockPoisoned("write"))?;

        let mut position = None;
        for (index, document) in documents.iter().enumerate() {
            if matches(document, &filter)? {
                position = Some(index);
                break;
            }
        }

        match position {
            Some(index) => {
                let existing_id = documents[index]
                    .get("_id")
                    .cloned()
                    .unwrap_or(Bson::Null);

                if let Some(new_id) = replacement.get("_id") {
                    if !same_value(new_id, &existing_id) {
                        return Err(StoreError::Backend(format!(
                            "replacement would change immutable _id {} to {}",
                            existing_id, new_id
                        )));
                    }
                }

                let stored = with_id_first(existing_id, replacement);
                let modified = documents[index] != stored;
                documents[index] = stored;

                Ok(ReplaceOutcome {
                    matched_count: 1,
                    modified_count: u64::from(modified),
                    upserted_id: None,
                })
            }
            None if upsert => {
                let id = replacement
                    .get("_id")
                    .cloned()
                    .or_else(|| literal_id(&filter));
                let id = Self::insert_locked(&mut documents, id, replacement)?;

                Ok(ReplaceOutcome {
                    matched_count: 0,
                    modified_count: 0,
                    upserted_id: Some(id),
                })
            }
            None => Ok(ReplaceOutcome {
                matched_count: 0,
                modified_count: 0,
                upserted_id: None,
            }),
        }
    }

    async fn delete_many(&self, filter: Document) -> Result<u64, StoreError> {
        validate(&filter)?;

        let mut documents = self
            .documents
            .write()
            .map_err(|_| StoreError::LockPoisoned("write"))?;

        let mut keep = Vec::with_capacity(documents.len());
        for document in documents.iter() {
            keep.push(!matches(document, &filter)?);
        }

        let before = documents.len();
        let mut flags = keep.into_iter();
        documents.retain(|_| flags.next().unwrap_or(true));

        Ok((before - documents.len()) as u64)
    }
}
