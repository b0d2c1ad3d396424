//! Record handles and identity.
//!
//! A [`Record`] is an opaque handle to one persisted (or pending-persisted)
//! object instance. Field data is owned by the store; handles are cheap to
//! clone and carry only the identifier and the entity type they belong to.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Globally unique, stable record identifier.
///
/// Once created, a `RecordId` never changes, even as the record moves from
/// transient to persisted state.
///
/// # Examples
///
/// ```
/// use fetchkit::RecordId;
///
/// let id = RecordId::new();
/// assert!(!id.is_nil());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Creates a new random record ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a record ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns true if this is a nil (all zeros) UUID.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Creates a nil record ID (for testing or sentinel values).
    #[must_use]
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RecordId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<RecordId> for Uuid {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

/// Lifecycle state of a record inside its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Created through the store but never committed.
    Transient,
    /// Present in the committed layer.
    Persisted,
    /// Pending deletion, or already removed by a save.
    Deleted,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Persisted => write!(f, "persisted"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

/// Opaque handle to one record owned by an object store.
///
/// Handles compare by identifier: two handles to the same record are equal
/// regardless of how they were obtained.
///
/// # Examples
///
/// ```
/// use fetchkit::{Record, RecordId};
///
/// let id = RecordId::new();
/// let a = Record::new(id, "track");
/// let b = Record::new(id, "track");
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    entity_type: String,
}

impl Record {
    /// Creates a handle from an identifier and entity type name.
    ///
    /// Stores mint handles themselves; constructing one by hand is mostly
    /// useful in tests.
    #[must_use]
    pub fn new(id: RecordId, entity_type: impl Into<String>) -> Self {
        Self {
            id,
            entity_type: entity_type.into(),
        }
    }

    /// The record's stable identifier.
    #[must_use]
    pub const fn id(&self) -> RecordId {
        self.id
    }

    /// Name of the entity type this record conforms to.
    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Record {}

impl std::hash::Hash for Record {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.id)
    }
}
