//! Abstract store contract.
//!
//! The `ObjectStore` trait is the seam between the resolver and whatever
//! actually persists records. Implementations own all record data; callers
//! hold only [`Record`] handles. All mutations are pending until `save`
//! commits them atomically.

use crate::error::StoreResult;
use crate::query::FetchRequest;
use crate::record::{Lifecycle, Record, RecordId};
use crate::value::Value;

/// A transactional collection of typed records.
///
/// # Transactional model
/// `create`, `delete`, `set_field`, and the relation mutators only touch the
/// store's pending-changes set. `save` commits everything pending atomically;
/// on failure the pending set is left unchanged and the caller decides
/// between retry and rollback. `rollback_record` discards pending changes to
/// exactly one record, unlike a whole-store rollback.
///
/// # Concurrency
/// Implementations are `Send + Sync`, but one store instance models one
/// logical writer: callers serialize mutating sequences themselves, and the
/// store performs no coordination beyond keeping individual operations
/// internally consistent.
pub trait ObjectStore: Send + Sync {
    /// Fetches records matching a request, in store-defined order unless the
    /// request carries sort descriptors.
    fn fetch(&self, request: &FetchRequest) -> StoreResult<Vec<Record>>;

    /// Creates a transient record of `entity_type` in the pending set.
    fn create(&self, entity_type: &str) -> StoreResult<Record>;

    /// Marks a record deleted in the pending set. Deleting a transient
    /// record discards its pending insert entirely.
    fn delete(&self, record: &Record) -> StoreResult<()>;

    /// Commits all pending inserts, updates, and deletes atomically.
    fn save(&self) -> StoreResult<()>;

    /// Discards pending changes to one record, restoring its last-committed
    /// field values. Other pending records are unaffected.
    fn rollback_record(&self, record: &Record) -> StoreResult<()>;

    /// Reloads a record's fields from committed state. With `merge_pending`,
    /// local pending edits are preserved on top of the reloaded values;
    /// without it they are discarded.
    fn refresh(&self, record: &Record, merge_pending: bool) -> StoreResult<()>;

    /// Reads a field through the entity type's field table. Unset declared
    /// fields read as `Value::Null`.
    fn get_field(&self, record: &Record, name: &str) -> StoreResult<Value>;

    /// Writes a field through the entity type's field table; the write stays
    /// pending until `save`.
    fn set_field(&self, record: &Record, name: &str, value: Value) -> StoreResult<()>;

    /// Current members of a relation, in relation order.
    fn relation_members(&self, record: &Record, name: &str) -> StoreResult<Vec<RecordId>>;

    /// Adds members to a relation. Already-present members are skipped;
    /// ordered relations append new members in the given order.
    fn add_related(&self, record: &Record, name: &str, related: &[RecordId]) -> StoreResult<()>;

    /// Removes members from a relation. Absent members are skipped.
    fn remove_related(&self, record: &Record, name: &str, related: &[RecordId])
        -> StoreResult<()>;

    /// Lifecycle state of a record as the store currently sees it.
    fn lifecycle(&self, record: &Record) -> StoreResult<Lifecycle>;
}
