//! DataService - record access over named document collections.
//!
//! The service normalizes caller identifiers into store filters, assigns
//! independent ids on insert, and notifies a listener after every successful
//! create, update and delete. It holds no state beyond its configuration.
//!
//! ## Quick Start
//!
//! ```ignore
//! use data_service::{InMemoryCollection, ServiceOptions};
//! use bson::doc;
//!
//! let service = ServiceOptions::new()
//!     .default_collection(InMemoryCollection::new())
//!     .build()?;
//!
//! let saved = service.save(doc! { "msg": "hello" }).await?;
//! let by_native = service.fetch_one(saved.native_id().cloned().unwrap()).await?;
//! let by_independent = service.fetch_one(saved.independent_id().unwrap()).await?;
//! service.remove(saved.independent_id().unwrap()).await?;
//! ```

mod error;
mod outcome;
mod transform;
mod typed;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bson::{doc, Bson, Document};
use futures_util::future::join_all;

use crate::config::{ConfigError, ServiceOptions, DEFAULT_COLLECTION};
use crate::identity::{generate_id, INDEPENDENT_ID_FIELD, NATIVE_ID_FIELD};
use crate::notify::{ChangeEvent, ChangeKind, ChangeListener};
use crate::query::{normalize_id_query, IdQuery};
use crate::store::{Collection, StoreError};

pub use error::ServiceError;
pub use outcome::{DeleteOutcome, StoreWrite, WriteOutcome};
pub use transform::{IdentityTransform, ResultTransform};
pub use typed::{Record, TypedRecords};

/// Record access service. Cheap to clone; clones share collections and listener.
#[derive(Clone)]
pub struct DataService {
    name: String,
    collections: HashMap<String, Arc<dyn Collection>>,
    listener: Option<Arc<dyn ChangeListener>>,
    event_label: String,
    use_independent_ids: bool,
    transform: Arc<dyn ResultTransform>,
}

impl fmt::Debug for DataService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut collections: Vec<&String> = self.collections.keys().collect();
        collections.sort();
        f.debug_struct("DataService")
            .field("name", &self.name)
            .field("collections", &collections)
            .field("has_listener", &self.listener.is_some())
            .field("event_label", &self.event_label)
            .field("use_independent_ids", &self.use_independent_ids)
            .finish()
    }
}

impl DataService {
    /// Validate `options` and construct the service.
    pub fn new(options: ServiceOptions) -> Result<Self, ConfigError> {
        options.settings.validate()?;

        Ok(Self {
            name: options.settings.service_name,
            collections: options.collections,
            listener: options.listener,
            event_label: options.settings.event_label,
            use_independent_ids: options.settings.use_independent_ids,
            transform: options.transform,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn event_label(&self) -> &str {
        &self.event_label
    }

    pub fn use_independent_ids(&self) -> bool {
        self.use_independent_ids
    }

    /// Look up a registered collection handle.
    pub fn collection(&self, name: &str) -> Result<&Arc<dyn Collection>, ServiceError> {
        self.collections.get(name).ok_or_else(|| {
            tracing::error!(service = %self.name, collection = name, "unknown collection");
            ServiceError::UnknownCollection(name.to_string())
        })
    }

    /// Generate a fresh independent id.
    pub fn generate_id(&self) -> String {
        generate_id()
    }

    /// Normalize an id, id list or filter into a store filter, honoring this
    /// service's independent id setting.
    pub fn create_id_query(&self, id_or_query: impl Into<IdQuery>) -> Document {
        normalize_id_query(id_or_query.into(), self.use_independent_ids)
    }

    /// Typed access to records of `R`, stored in the collection named `R::COLLECTION`.
    pub fn records<R: Record>(&self) -> TypedRecords<'_, R> {
        TypedRecords::new(self)
    }

    /// All records in the default collection matching `filter`.
    pub async fn fetch(&self, filter: Document) -> Result<Vec<Document>, ServiceError> {
        self.fetch_in(DEFAULT_COLLECTION, filter).await
    }

    /// Every record in the default collection.
    pub async fn fetch_all(&self) -> Result<Vec<Document>, ServiceError> {
        self.fetch(Document::new()).await
    }

    /// First record in the default collection matching `id_or_query`.
    pub async fn fetch_one(
        &self,
        id_or_query: impl Into<IdQuery>,
    ) -> Result<Option<Document>, ServiceError> {
        self.fetch_one_in(DEFAULT_COLLECTION, id_or_query).await
    }

    /// Save a record to the default collection.
    pub async fn save(&self, record: Document) -> Result<WriteOutcome, ServiceError> {
        self.save_in(DEFAULT_COLLECTION, record).await
    }

    /// Save every record concurrently. One result per input, in input order.
    pub async fn save_many(
        &self,
        records: Vec<Document>,
    ) -> Vec<Result<WriteOutcome, ServiceError>> {
        self.save_many_in(DEFAULT_COLLECTION, records).await
    }

    /// Delete every record in the default collection matching `id_or_query`.
    pub async fn remove(
        &self,
        id_or_query: impl Into<IdQuery>,
    ) -> Result<DeleteOutcome, ServiceError> {
        self.remove_in(DEFAULT_COLLECTION, id_or_query).await
    }

    pub async fn fetch_in(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Vec<Document>, ServiceError> {
        let handle = self.collection(collection)?;
        let records = handle
            .find(filter)
            .await
            .map_err(|err| self.store_failure(collection, "fetch", err))?;

        tracing::debug!(
            service = %self.name,
            collection,
            count = records.len(),
            "fetched records"
        );
        Ok(self.transform.transform(records))
    }

    pub async fn fetch_one_in(
        &self,
        collection: &str,
        id_or_query: impl Into<IdQuery>,
    ) -> Result<Option<Document>, ServiceError> {
        let filter = self.create_id_query(id_or_query);
        let records = self.fetch_in(collection, filter).await?;
        Ok(records.into_iter().next())
    }

    /// Save a record to a named collection.
    ///
    /// A record carrying `_id` replaces the stored record with that `_id`
    /// (inserting it if missing) and notifies `Update`. Any other record is
    /// inserted, after receiving an independent `id` when enabled and absent,
    /// and notifies `Create`.
    pub async fn save_in(
        &self,
        collection: &str,
        mut record: Document,
    ) -> Result<WriteOutcome, ServiceError> {
        let handle = self.collection(collection)?;

        match record.get(NATIVE_ID_FIELD) {
            Some(Bson::Null) => {
                record.remove(NATIVE_ID_FIELD);
            }
            Some(native_id) => {
                let filter = doc! { NATIVE_ID_FIELD: native_id.clone() };
                let replaced = handle
                    .replace_one(filter, record.clone(), true)
                    .await
                    .map_err(|err| self.store_failure(collection, "save", err))?;

                let outcome = WriteOutcome {
                    record,
                    kind: ChangeKind::Update,
                    write: StoreWrite::Replaced(replaced),
                };
                self.notify(&outcome.record, ChangeKind::Update);
                return Ok(outcome);
            }
            None => {}
        }

        if self.use_independent_ids && !record.contains_key(INDEPENDENT_ID_FIELD) {
            record.insert(INDEPENDENT_ID_FIELD, generate_id());
        }

        let native_id = handle
            .insert_one(record.clone())
            .await
            .map_err(|err| self.store_failure(collection, "save", err))?;

        let outcome = WriteOutcome {
            record: with_native_id(native_id.clone(), record),
            kind: ChangeKind::Create,
            write: StoreWrite::Inserted { id: native_id },
        };
        self.notify(&outcome.record, ChangeKind::Create);
        Ok(outcome)
    }

    /// Save records to a named collection concurrently.
    ///
    /// Writes are issued together and are not ordered relative to each other.
    /// A failure affects only its own entry.
    pub async fn save_many_in(
        &self,
        collection: &str,
        records: Vec<Document>,
    ) -> Vec<Result<WriteOutcome, ServiceError>> {
        join_all(
            records
                .into_iter()
                .map(|record| self.save_in(collection, record)),
        )
        .await
    }

    /// Delete matching records from a named collection.
    ///
    /// The `Delete` notification carries the normalized query, not the
    /// deleted records.
    pub async fn remove_in(
        &self,
        collection: &str,
        id_or_query: impl Into<IdQuery>,
    ) -> Result<DeleteOutcome, ServiceError> {
        let handle = self.collection(collection)?;
        let query = self.create_id_query(id_or_query);

        let deleted_count = handle
            .delete_many(query.clone())
            .await
            .map_err(|err| self.store_failure(collection, "remove", err))?;

        tracing::debug!(service = %self.name, collection, deleted_count, "removed records");
        self.notify(&query, ChangeKind::Delete);
        Ok(DeleteOutcome {
            deleted_count,
            query,
        })
    }

    fn notify(&self, payload: &Document, kind: ChangeKind) {
        if let Some(listener) = &self.listener {
            listener.on_change(&ChangeEvent::new(
                self.event_label.clone(),
                payload.clone(),
                kind,
            ));
        }
    }

    fn store_failure(
        &self,
        collection: &str,
        operation: &'static str,
        err: StoreError,
    ) -> ServiceError {
        tracing::error!(
            service = %self.name,
            collection,
            operation,
            error = %err,
            "store operation failed"
        );
        ServiceError::Store(err)
    }
}

/// `record` with `_id` as its first field.
fn with_native_id(id: Bson, record: Document) -> Document {
    let mut saved = Document::new();
    saved.insert(NATIVE_ID_FIELD, id);
    for (key, value) in record {
        if key != NATIVE_ID_FIELD {
            saved.insert(key, value);
        }
    }
    saved
}
