//! Error type for record access operations.

use std::error::Error;
use std::fmt;

use crate::store::StoreError;

/// Error type for `DataService` operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// The underlying collection operation failed.
    Store(StoreError),
    /// No collection is registered under this name.
    UnknownCollection(String),
    /// A typed record could not be converted to or from BSON.
    Serde(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Store(e) => write!(f, "store error: {}", e),
            ServiceError::UnknownCollection(name) => write!(f, "unknown collection: {}", name),
            ServiceError::Serde(msg) => write!(f, "record serialization error: {}", msg),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ServiceError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        ServiceError::Store(err)
    }
}

impl From<bson::ser::Error> for ServiceError {
    fn from(err: bson::ser::Error) -> Self {
        ServiceError::Serde(err.to_string())
    }
}

impl From<bson::de::Error> for ServiceError {
    fn from(err: bson::de::Error) -> Self {
        ServiceError::Serde(err.to_string())
    }
}
