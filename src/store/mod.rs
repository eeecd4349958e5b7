//! Collections - the document store primitives the service sits on.
//!
//! A `Collection` is any handle that can find, insert, replace and delete
//! BSON documents by filter. The service never talks to a driver directly,
//! so any client exposing this capability set is substitutable.
//!
//! ## Example
//!
//! ```ignore
//! use data_service::{Collection, InMemoryCollection};
//! use bson::doc;
//!
//! let notes = InMemoryCollection::new();
//! let id = notes.insert_one(doc! { "msg": "hello" }).await?;
//! let found = notes.find(doc! { "_id": id }).await?;
//! ```

mod filter;
mod in_memory;
#[cfg(feature = "mongodb")]
mod mongo;

use async_trait::async_trait;
use bson::{Bson, Document};
use std::fmt;

/// Abstract document collection.
#[async_trait]
pub trait Collection: Send + Sync {
    /// Find every document matching `filter`. An empty filter matches all.
    async fn find(&self, filter: Document) -> Result<Vec<Document>, StoreError>;

    /// Insert one document, returning its native identity.
    /// The store assigns an `_id` when the document carries none.
    async fn insert_one(&self, document: Document) -> Result<Bson, StoreError>;

    /// Insert several documents, returning their identities in input order.
    async fn insert_many(&self, documents: Vec<Document>) -> Result<Vec<Bson>, StoreError>;

    /// Replace the first document matching `filter`. With `upsert`, insert
    /// the replacement when nothing matches.
    async fn replace_one(
        &self,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> Result<ReplaceOutcome, StoreError>;

    /// Delete every document matching `filter`. Returns the number deleted.
    async fn delete_many(&self, filter: Document) -> Result<u64, StoreError>;
}

/// Result of a `replace_one` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
    /// Identity of the inserted document when the replace turned into an insert.
    pub upserted_id: Option<Bson>,
}

/// Error type for collection operations.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// A document with the same `_id` already exists.
    DuplicateKey { id: String },
    /// In-process storage lock was poisoned.
    LockPoisoned(&'static str),
    /// The filter uses an operator or shape the store cannot evaluate.
    UnsupportedFilter(String),
    /// Driver or backend failure (connectivity, serialization, ...).
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::DuplicateKey { id } => write!(f, "duplicate key: _id {}", id),
            StoreError::LockPoisoned(operation) => {
                write!(f, "collection lock poisoned during {}", operation)
            }
            StoreError::UnsupportedFilter(msg) => write!(f, "unsupported filter: {}", msg),
            StoreError::Backend(msg) => write!(f, "store backend error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

pub use filter::matches as document_matches;
pub use in_memory::InMemoryCollection;
