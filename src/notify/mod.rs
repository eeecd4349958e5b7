//! Change notifications - what the service reports after a successful write.
//!
//! The service holds at most one `ChangeListener`. Closures, tokio unbounded
//! senders and (with the `emitter` feature) an `EventEmitter` wrapper all
//! implement it.
//!
//! ## Example
//!
//! ```ignore
//! use data_service::{ChangeEvent, DataService, InMemoryCollection, ServiceOptions};
//!
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ChangeEvent>();
//! let service = ServiceOptions::new()
//!     .default_collection(InMemoryCollection::new())
//!     .listener(tx)
//!     .build()?;
//!
//! service.save(doc! { "msg": "hello" }).await?;
//! let event = rx.recv().await.unwrap();
//! ```

#[cfg(feature = "emitter")]
mod emitter;

use std::fmt;

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

/// How a record changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Create => "create",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single change notification.
///
/// For creates and updates `payload` is the saved record. For deletes it is
/// the normalized query, since one delete may remove several records.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// The configured event label (`"object-change"` by default).
    pub label: String,
    pub payload: Document,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(label: impl Into<String>, payload: Document, kind: ChangeKind) -> Self {
        Self {
            label: label.into(),
            payload,
            kind,
        }
    }

    /// JSON form: `{"event": .., "kind": .., "payload": <relaxed extended JSON>}`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "event": self.label,
            "kind": self.kind,
            "payload": Bson::Document(self.payload.clone()).into_relaxed_extjson(),
        })
    }
}

/// Receives change notifications. Called synchronously, once per successful
/// create, update or delete, after the store operation completes.
pub trait ChangeListener: Send + Sync {
    fn on_change(&self, event: &ChangeEvent);
}

impl<F> ChangeListener for F
where
    F: Fn(&ChangeEvent) + Send + Sync,
{
    fn on_change(&self, event: &ChangeEvent) {
        self(event)
    }
}

/// Forwards events to an async consumer. A closed receiver drops the event.
impl ChangeListener for UnboundedSender<ChangeEvent> {
    fn on_change(&self, event: &ChangeEvent) {
        if self.send(event.clone()).is_err() {
            tracing::warn!(
                event = %event.label,
                kind = %event.kind,
                "change receiver closed, dropping notification"
            );
        }
    }
}

#[cfg(feature = "emitter")]
pub use emitter::EmitterListener;
