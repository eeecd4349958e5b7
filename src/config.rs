//! Service configuration.
//!
//! `ServiceOptions` collects everything a `DataService` needs and validates
//! it once, at `build()`. The plain-data part (`ServiceSettings`) can also be
//! loaded from JSON.
//!
//! ## Example
//!
//! ```ignore
//! let settings = ServiceSettings::from_json(r#"{ "service_name": "notes" }"#)?;
//! let service = ServiceOptions::new()
//!     .settings(settings)
//!     .default_collection(InMemoryCollection::new())
//!     .collection("archive", InMemoryCollection::new())
//!     .build()?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::notify::ChangeListener;
use crate::service::{DataService, IdentityTransform, ResultTransform};
use crate::store::Collection;

/// Name of the collection used by the methods that take no collection name.
pub const DEFAULT_COLLECTION: &str = "default";

/// Label attached to every change notification unless configured otherwise.
pub const DEFAULT_EVENT_LABEL: &str = "object-change";

pub const DEFAULT_SERVICE_NAME: &str = "data-service";

/// Serializable service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Name used in log events.
    pub service_name: String,
    pub event_label: String,
    /// Assign an independent `id` to records saved without one.
    pub use_independent_ids: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            event_label: DEFAULT_EVENT_LABEL.to_string(),
            use_independent_ids: true,
        }
    }
}

impl ServiceSettings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::EmptyServiceName);
        }
        if self.event_label.trim().is_empty() {
            return Err(ConfigError::EmptyEventLabel);
        }
        Ok(())
    }
}

/// Error type for invalid service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyServiceName,
    EmptyEventLabel,
    /// Settings could not be parsed.
    Settings(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyServiceName => write!(f, "service name must not be empty"),
            ConfigError::EmptyEventLabel => write!(f, "event label must not be empty"),
            ConfigError::Settings(msg) => write!(f, "invalid settings: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Builder for `DataService`.
pub struct ServiceOptions {
    pub(crate) settings: ServiceSettings,
    pub(crate) collections: HashMap<String, Arc<dyn Collection>>,
    pub(crate) listener: Option<Arc<dyn ChangeListener>>,
    pub(crate) transform: Arc<dyn ResultTransform>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceOptions {
    pub fn new() -> Self {
        Self {
            settings: ServiceSettings::default(),
            collections: HashMap::new(),
            listener: None,
            transform: Arc::new(IdentityTransform),
        }
    }

    /// Replace name, event label and id policy at once.
    pub fn settings(mut self, settings: ServiceSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.settings.service_name = name.into();
        self
    }

    pub fn event_label(mut self, label: impl Into<String>) -> Self {
        self.settings.event_label = label.into();
        self
    }

    pub fn use_independent_ids(mut self, enabled: bool) -> Self {
        self.settings.use_independent_ids = enabled;
        self
    }

    /// Register a collection under a logical name. Re-registering a name replaces it.
    pub fn collection<C>(self, name: impl Into<String>, collection: C) -> Self
    where
        C: Collection + 'static,
    {
        self.collection_handle(name, Arc::new(collection))
    }

    /// Register an already shared collection handle.
    pub fn collection_handle(
        mut self,
        name: impl Into<String>,
        collection: Arc<dyn Collection>,
    ) -> Self {
        self.collections.insert(name.into(), collection);
        self
    }

    /// Register the collection used by `fetch`, `save`, `remove`, ...
    pub fn default_collection<C>(self, collection: C) -> Self
    where
        C: Collection + 'static,
    {
        self.collection(DEFAULT_COLLECTION, collection)
    }

    pub fn listener<L>(mut self, listener: L) -> Self
    where
        L: ChangeListener + 'static,
    {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// Post-process every fetched result set.
    pub fn transform<T>(mut self, transform: T) -> Self
    where
        T: ResultTransform + 'static,
    {
        self.transform = Arc::new(transform);
        self
    }

    /// Validate and construct the service.
    ///
    /// A missing `default` collection is not an error here; the no-argument
    /// methods report it when called.
    pub fn build(self) -> Result<DataService, ConfigError> {
        DataService::new(self)
    }
}
