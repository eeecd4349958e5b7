mod config;
mod identity;
mod notify;
mod query;
mod service;
mod store;

pub use config::{
    ConfigError, ServiceOptions, ServiceSettings, DEFAULT_COLLECTION, DEFAULT_EVENT_LABEL,
    DEFAULT_SERVICE_NAME,
};
pub use identity::{generate_id, INDEPENDENT_ID_FIELD, INDEPENDENT_ID_LEN, NATIVE_ID_FIELD};
pub use notify::{ChangeEvent, ChangeKind, ChangeListener};
pub use query::{normalize_id_query, IdQuery};
pub use service::{
    DataService, DeleteOutcome, IdentityTransform, Record, ResultTransform, ServiceError,
    StoreWrite, TypedRecords, WriteOutcome,
};
pub use store::{document_matches, Collection, InMemoryCollection, ReplaceOutcome, StoreError};

// Derive macro for `Record`
pub use data_service_macros::Record;

#[cfg(feature = "emitter")]
pub use notify::EmitterListener;

// Re-export the EventEmitter from the event_emitter_rs crate
#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;

// Re-export bson so callers build documents with the same version
pub use bson;
