//! Fetch-or-create resolution.
//!
//! The [`Resolver`] turns "give me the record whose key field equals this
//! value, creating it if missing" into store operations, without creating
//! duplicates for values submitted together. The bulk form is the point of
//! the API: `resolve_many` issues exactly one fetch for the whole candidate
//! set instead of one per value. Do not call [`Resolver::resolve_one`] in a
//! loop; that reintroduces both the round trips and the duplicate-creation
//! window the bulk form exists to close.
//!
//! Stores are passed explicitly into every call. There is no ambient
//! context; one resolver can serve any number of stores.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::query::{FetchRequest, Predicate};
use crate::record::{Record, RecordId};
use crate::storage::ObjectStore;
use crate::value::{KeyValue, Value};

/// What to do when more than one existing record matches a key value.
///
/// Key uniqueness is not enforced by the store; avoiding cross-call
/// duplicates is the caller's responsibility (typically a uniqueness
/// constraint in the real backing store).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Take the first record in store-defined order and log a warning.
    #[default]
    FirstMatch,
    /// Fail with [`StoreError::AmbiguousMatch`].
    Reject,
}

/// Resolver configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Policy for multiple existing matches per key value.
    pub ambiguity: AmbiguityPolicy,
}

/// Key-based fetch-or-create resolution over an [`ObjectStore`].
///
/// All mutations made through the resolver stay in the store's pending set
/// until [`Resolver::save_changes`] commits them.
///
/// # Examples
///
/// ```
/// use fetchkit::{EntityDef, InMemoryObjectStore, Resolver, Schema, Value, ValueKind};
///
/// let schema = Schema::new().entity(EntityDef::new("tag").field("name", ValueKind::String));
/// let store = InMemoryObjectStore::new(schema);
/// let resolver = Resolver::new();
///
/// let jazz = resolver.resolve_one(&store, "tag", "name", Value::from("jazz")).unwrap();
/// let again = resolver.resolve_one(&store, "tag", "name", Value::from("jazz")).unwrap();
/// assert_eq!(jazz, again);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    config: ResolverConfig,
}

impl Resolver {
    /// Creates a resolver with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a resolver with an explicit configuration.
    #[must_use]
    pub const fn with_config(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Fetches the record of `entity_type` whose `key` field equals `value`,
    /// creating one (with the key field set) if none exists.
    ///
    /// The create path adds a transient record to the store's pending set;
    /// nothing is committed. Multiple existing matches follow the configured
    /// [`AmbiguityPolicy`].
    ///
    /// For more than one value, use [`Resolver::resolve_many`] instead of
    /// calling this in a loop.
    pub fn resolve_one(
        &self,
        store: &dyn ObjectStore,
        entity_type: &str,
        key: &str,
        value: Value,
    ) -> StoreResult<Record> {
        KeyValue::try_from_value(&value)
            .map_err(|e| StoreError::invalid_argument(e.to_string()))?;

        let request = FetchRequest::new(entity_type)
            .predicate(Predicate::Eq {
                field: key.to_string(),
                value: value.clone(),
            });
        let matches = store.fetch(&request)?;

        match self.pick_match(entity_type, key, &value, matches)? {
            Some(record) => {
                debug!(entity_type, key, %value, "resolved existing record");
                Ok(record)
            }
            None => {
                let record = store.create(entity_type)?;
                store.set_field(&record, key, value.clone())?;
                debug!(entity_type, key, %value, id = %record.id(), "created record");
                Ok(record)
            }
        }
    }

    /// Resolves every value in `values` with a single fetch, creating the
    /// missing records in one pass.
    ///
    /// The result is positional: `result[i]` is the record for `values[i]`,
    /// and a value appearing twice yields the same record at both positions.
    /// At most `|distinct(values)| - |existing matches|` records are created.
    ///
    /// # Errors
    /// `InvalidArgument` for an empty value set and for values outside the
    /// comparable subset.
    pub fn resolve_many(
        &self,
        store: &dyn ObjectStore,
        entity_type: &str,
        key: &str,
        values: &[Value],
    ) -> StoreResult<Vec<Record>> {
        if values.is_empty() {
            return Err(StoreError::invalid_argument(
                "empty candidate value set passed to bulk resolution",
            ));
        }

        let mut distinct: Vec<Value> = Vec::new();
        let mut keys: Vec<KeyValue> = Vec::with_capacity(values.len());
        for value in values {
            let kv = KeyValue::try_from_value(value)
                .map_err(|e| StoreError::invalid_argument(e.to_string()))?;
            if !distinct.contains(value) {
                distinct.push(value.clone());
            }
            keys.push(kv);
        }

        // One fetch covers the whole candidate set.
        let request = FetchRequest::new(entity_type).predicate(Predicate::In {
            field: key.to_string(),
            values: distinct,
        });
        let matches = store.fetch(&request)?;

        // Partition the matches by key value, store order preserved per value.
        let mut by_value: BTreeMap<KeyValue, Vec<Record>> = BTreeMap::new();
        for record in matches {
            let found = store.get_field(&record, key)?;
            if let Ok(kv) = KeyValue::try_from_value(&found) {
                by_value.entry(kv).or_default().push(record);
            }
        }

        let mut resolved: BTreeMap<KeyValue, Record> = BTreeMap::new();
        for (kv, candidates) in by_value {
            let value = kv.to_value();
            if let Some(record) =
                self.pick_match(entity_type, key, &value, candidates)?
            {
                resolved.insert(kv, record);
            }
        }

        let fetched = resolved.len();
        let mut results = Vec::with_capacity(values.len());
        for (value, kv) in values.iter().zip(keys) {
            if let Some(record) = resolved.get(&kv) {
                results.push(record.clone());
                continue;
            }
            // Register the new record immediately so a repeated value in the
            // same call maps to the record created for its first occurrence.
            let record = store.create(entity_type)?;
            store.set_field(&record, key, value.clone())?;
            results.push(record.clone());
            resolved.insert(kv, record);
        }

        debug!(
            entity_type,
            key,
            requested = values.len(),
            fetched,
            created = resolved.len() - fetched,
            "bulk resolution"
        );
        Ok(results)
    }

    /// Applies the ambiguity policy to the matches for one key value.
    fn pick_match(
        &self,
        entity_type: &str,
        key: &str,
        value: &Value,
        matches: Vec<Record>,
    ) -> StoreResult<Option<Record>> {
        let count = matches.len();
        if count > 1 {
            match self.config.ambiguity {
                AmbiguityPolicy::FirstMatch => {
                    warn!(
                        entity_type,
                        key,
                        %value,
                        matches = count,
                        "ambiguous match; taking first in store order"
                    );
                }
                AmbiguityPolicy::Reject => {
                    return Err(StoreError::AmbiguousMatch {
                        entity: entity_type.to_string(),
                        field: key.to_string(),
                        value: value.clone(),
                        matches: count,
                    });
                }
            }
        }
        Ok(matches.into_iter().next())
    }

    /// Marks a record deleted in the store's pending set; committed by the
    /// next [`Resolver::save_changes`].
    pub fn delete_record(&self, store: &dyn ObjectStore, record: &Record) -> StoreResult<()> {
        store.delete(record)
    }

    /// Commits all pending changes in the store atomically. Validation and
    /// commit failures surface verbatim and leave the pending set unchanged;
    /// the caller decides between retry and rollback.
    pub fn save_changes(&self, store: &dyn ObjectStore) -> StoreResult<()> {
        store.save()
    }

    /// Discards pending changes to exactly one record, unlike rolling back
    /// the store's entire pending set.
    pub fn rollback_one(&self, store: &dyn ObjectStore, record: &Record) -> StoreResult<()> {
        store.rollback_record(record)
    }

    /// Reloads a record's fields from committed state, merging pending local
    /// edits over the reloaded values when `merge_pending` is set and
    /// discarding them otherwise.
    pub fn refresh(
        &self,
        store: &dyn ObjectStore,
        record: &Record,
        merge_pending: bool,
    ) -> StoreResult<()> {
        store.refresh(record, merge_pending)
    }

    /// Type-erased property read.
    pub fn get_property(
        &self,
        store: &dyn ObjectStore,
        record: &Record,
        name: &str,
    ) -> StoreResult<Value> {
        store.get_field(record, name)
    }

    /// Type-erased property write; pending until save.
    pub fn set_property(
        &self,
        store: &dyn ObjectStore,
        record: &Record,
        name: &str,
        value: Value,
    ) -> StoreResult<()> {
        store.set_field(record, name, value)
    }

    /// Adds a batch of members to a relation (set or ordered set, per the
    /// schema declaration). Equivalent to, but cheaper than, repeated
    /// single-member calls.
    pub fn add_related(
        &self,
        store: &dyn ObjectStore,
        record: &Record,
        relation: &str,
        members: &[Record],
    ) -> StoreResult<()> {
        let ids: Vec<RecordId> = members.iter().map(Record::id).collect();
        store.add_related(record, relation, &ids)
    }

    /// Adds one member to a relation: a batch of one.
    pub fn add_one_related(
        &self,
        store: &dyn ObjectStore,
        record: &Record,
        relation: &str,
        member: &Record,
    ) -> StoreResult<()> {
        self.add_related(store, record, relation, std::slice::from_ref(member))
    }

    /// Removes a batch of members from a relation.
    pub fn remove_related(
        &self,
        store: &dyn ObjectStore,
        record: &Record,
        relation: &str,
        members: &[Record],
    ) -> StoreResult<()> {
        let ids: Vec<RecordId> = members.iter().map(Record::id).collect();
        store.remove_related(record, relation, &ids)
    }

    /// Removes one member from a relation: a batch of one.
    pub fn remove_one_related(
        &self,
        store: &dyn ObjectStore,
        record: &Record,
        relation: &str,
        member: &Record,
    ) -> StoreResult<()> {
        self.remove_related(store, record, relation, std::slice::from_ref(member))
    }
}
