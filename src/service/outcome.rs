use bson::{Bson, Document};

use crate::identity::{INDEPENDENT_ID_FIELD, NATIVE_ID_FIELD};
use crate::notify::ChangeKind;
use crate::store::ReplaceOutcome;

/// What the store did for a save, independent of driver result shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreWrite {
    /// The record was inserted and the store assigned (or accepted) `id`.
    Inserted { id: Bson },
    /// The record was replaced by `_id`, or upserted if it did not exist.
    Replaced(ReplaceOutcome),
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    /// The record as stored, including `_id` and any assigned `id`.
    pub record: Document,
    /// `Create` for inserts, `Update` for replacements.
    pub kind: ChangeKind,
    pub write: StoreWrite,
}

impl WriteOutcome {
    pub fn native_id(&self) -> Option<&Bson> {
        self.record.get(NATIVE_ID_FIELD)
    }

    pub fn independent_id(&self) -> Option<&str> {
        self.record.get_str(INDEPENDENT_ID_FIELD).ok()
    }

    pub fn into_record(self) -> Document {
        self.record
    }
}

/// Result of a successful remove.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOutcome {
    pub deleted_count: u64,
    /// The normalized filter that was executed.
    pub query: Document,
}
