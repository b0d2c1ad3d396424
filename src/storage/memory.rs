//! In-memory object store.
//!
//! Thread-safe reference implementation of [`ObjectStore`]: a committed layer
//! plus a per-record pending-changes overlay under one `RwLock`. Intended for
//! embedded usage, tests, and as the behavioral reference for persistent
//! backends.
//!
//! The live view of a record is its committed data overlaid by its pending
//! entry. `save` applies the whole pending set atomically; everything else
//! only edits the overlay.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::error::{StoreError, StoreResult, ValidationError};
use crate::query::{FetchRequest, SortDescriptor};
use crate::record::{Lifecycle, Record, RecordId};
use crate::schema::Schema;
use crate::storage::traits::ObjectStore;
use crate::value::{KeyValue, Value};

fn lock_err(context: &'static str) -> StoreError {
    StoreError::unavailable(format!("poisoned lock: {context}"))
}

/// Store-defined ordering for field values during sorted fetches.
///
/// Null sorts before everything; values outside the comparable subset
/// (structured, NaN) compare equal so a sort never fails mid-fetch.
fn cmp_field_values(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => match (KeyValue::try_from_value(a), KeyValue::try_from_value(b)) {
            (Ok(ka), Ok(kb)) => ka.cmp(&kb),
            _ => Ordering::Equal,
        },
    }
}

#[derive(Debug, Clone)]
struct CommittedRecord {
    entity_type: String,
    fields: BTreeMap<String, Value>,
    relations: BTreeMap<String, Vec<RecordId>>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingPhase {
    Inserted,
    Updated,
    Deleted,
}

/// Overlay entry for one record. Field writes of `Value::Null` act as clear
/// markers; relation edits copy the whole member list on first write.
#[derive(Debug, Clone)]
struct PendingRecord {
    entity_type: String,
    phase: PendingPhase,
    fields: BTreeMap<String, Value>,
    relations: BTreeMap<String, Vec<RecordId>>,
    seq: u64,
}

#[derive(Debug, Default)]
struct StoreState {
    committed: HashMap<RecordId, CommittedRecord>,
    pending: HashMap<RecordId, PendingRecord>,
    /// Records removed by a committed delete. Lets `lifecycle` distinguish
    /// "deleted" from "never existed".
    tombstones: HashSet<RecordId>,
    next_seq: u64,
    closed: bool,
    commit_fault: Option<String>,
}

impl StoreState {
    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed {
            Err(StoreError::unavailable("store is closed"))
        } else {
            Ok(())
        }
    }

    fn entity_type_of(&self, id: RecordId) -> Option<&str> {
        if let Some(p) = self.pending.get(&id) {
            return Some(&p.entity_type);
        }
        self.committed.get(&id).map(|c| c.entity_type.as_str())
    }

    /// A record is live if a fetch could return it.
    fn is_live(&self, id: RecordId) -> bool {
        match self.pending.get(&id) {
            Some(p) => p.phase != PendingPhase::Deleted,
            None => self.committed.contains_key(&id),
        }
    }

    fn live_field(&self, id: RecordId, name: &str) -> Value {
        if let Some(p) = self.pending.get(&id) {
            if let Some(v) = p.fields.get(name) {
                return v.clone();
            }
            if p.phase == PendingPhase::Inserted {
                return Value::Null;
            }
        }
        self.committed
            .get(&id)
            .and_then(|c| c.fields.get(name).cloned())
            .unwrap_or(Value::Null)
    }

    fn live_relation(&self, id: RecordId, name: &str) -> Vec<RecordId> {
        if let Some(p) = self.pending.get(&id) {
            if let Some(members) = p.relations.get(name) {
                return members.clone();
            }
            if p.phase == PendingPhase::Inserted {
                return Vec::new();
            }
        }
        self.committed
            .get(&id)
            .and_then(|c| c.relations.get(name).cloned())
            .unwrap_or_default()
    }

    fn seq_of(&self, id: RecordId) -> u64 {
        self.pending
            .get(&id)
            .map(|p| p.seq)
            .or_else(|| self.committed.get(&id).map(|c| c.seq))
            .unwrap_or(u64::MAX)
    }

    /// Resolves a handle to a live record, checking the handle's entity type
    /// against what the store has on file.
    fn expect_live(&self, record: &Record) -> StoreResult<()> {
        let id = record.id();
        let Some(actual) = self.entity_type_of(id) else {
            return Err(StoreError::RecordNotFound { id });
        };
        if actual != record.entity_type() {
            return Err(StoreError::invalid_argument(format!(
                "handle entity type '{}' does not match stored type '{actual}' for {id}",
                record.entity_type()
            )));
        }
        if !self.is_live(id) {
            return Err(StoreError::RecordNotFound { id });
        }
        Ok(())
    }

    /// Overlay entry for editing, created on first write to a committed
    /// record.
    fn pending_for_edit(&mut self, record: &Record) -> StoreResult<&mut PendingRecord> {
        self.expect_live(record)?;
        let id = record.id();
        let seq = self.committed.get(&id).map_or(u64::MAX, |c| c.seq);
        let entity_type = record.entity_type().to_string();
        Ok(self.pending.entry(id).or_insert_with(|| PendingRecord {
            entity_type,
            phase: PendingPhase::Updated,
            fields: BTreeMap::new(),
            relations: BTreeMap::new(),
            seq,
        }))
    }
}

/// Thread-safe in-memory object store.
///
/// # Examples
///
/// ```
/// use fetchkit::{EntityDef, InMemoryObjectStore, ObjectStore, Schema, Value, ValueKind};
///
/// let schema = Schema::new().entity(EntityDef::new("track").field("isrc", ValueKind::String));
/// let store = InMemoryObjectStore::new(schema);
///
/// let record = store.create("track").unwrap();
/// store.set_field(&record, "isrc", Value::from("USRC17607839")).unwrap();
/// store.save().unwrap();
/// ```
#[derive(Debug)]
pub struct InMemoryObjectStore {
    schema: Schema,
    state: RwLock<StoreState>,
}

impl InMemoryObjectStore {
    /// Creates an empty store serving `schema`.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            state: RwLock::new(StoreState::default()),
        }
    }

    /// The schema this store serves.
    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Marks the store unavailable; every subsequent operation fails with
    /// `Unavailable`.
    pub fn close(&self) -> StoreResult<()> {
        let mut state = self.state.write().map_err(|_| lock_err("close"))?;
        state.closed = true;
        Ok(())
    }

    /// Makes the next `save` fail with a commit error, leaving the pending
    /// set untouched. Test hook for exercising commit-failure paths.
    pub fn inject_commit_fault(&self, message: impl Into<String>) -> StoreResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("inject_commit_fault"))?;
        state.commit_fault = Some(message.into());
        Ok(())
    }

    /// Number of records with pending changes.
    pub fn pending_count(&self) -> StoreResult<usize> {
        let state = self.state.read().map_err(|_| lock_err("pending_count"))?;
        Ok(state.pending.len())
    }

    /// Committed version of a record, if it has been saved.
    pub fn committed_version(&self, record: &Record) -> StoreResult<Option<u64>> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("committed_version"))?;
        Ok(state.committed.get(&record.id()).map(|c| c.version))
    }

    fn validate_pending(&self, state: &StoreState) -> StoreResult<()> {
        for (id, pending) in &state.pending {
            if pending.phase == PendingPhase::Deleted {
                continue;
            }
            let def = self.schema.expect_entity(&pending.entity_type)?;
            for (name, field) in def.fields() {
                if !field.required {
                    continue;
                }
                if state.live_field(*id, name).is_null() {
                    return Err(ValidationError::MissingRequiredField {
                        entity: pending.entity_type.clone(),
                        field: name.to_string(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    fn apply_pending(state: &mut StoreState) {
        let pending = std::mem::take(&mut state.pending);
        let now = Utc::now();

        for (id, entry) in pending {
            match entry.phase {
                PendingPhase::Inserted => {
                    let mut fields = entry.fields;
                    fields.retain(|_, v| !v.is_null());
                    state.committed.insert(
                        id,
                        CommittedRecord {
                            entity_type: entry.entity_type,
                            fields,
                            relations: entry.relations,
                            version: 1,
                            created_at: now,
                            updated_at: now,
                            seq: entry.seq,
                        },
                    );
                }
                PendingPhase::Updated => {
                    let Some(committed) = state.committed.get_mut(&id) else {
                        continue;
                    };
                    for (name, value) in entry.fields {
                        if value.is_null() {
                            committed.fields.remove(&name);
                        } else {
                            committed.fields.insert(name, value);
                        }
                    }
                    for (name, members) in entry.relations {
                        committed.relations.insert(name, members);
                    }
                    committed.version += 1;
                    committed.updated_at = now;
                }
                PendingPhase::Deleted => {
                    state.committed.remove(&id);
                    state.tombstones.insert(id);
                }
            }
        }
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn fetch(&self, request: &FetchRequest) -> StoreResult<Vec<Record>> {
        let state = self.state.read().map_err(|_| lock_err("fetch"))?;
        state.ensure_open()?;

        let def = self.schema.expect_entity(request.entity_type())?;
        if let Some(field) = request.predicate_ref().field() {
            def.expect_field(field)?;
        }
        for descriptor in request.sort_descriptors() {
            def.expect_field(&descriptor.field)?;
        }
        for relation in request.prefetch_relations() {
            // Prefetch is a hint here: everything is resident. Validating the
            // names keeps request bugs from passing silently.
            def.expect_relation(relation)?;
        }

        let mut ids: Vec<RecordId> = state
            .committed
            .iter()
            .filter(|(id, c)| c.entity_type == request.entity_type() && state.is_live(**id))
            .map(|(id, _)| *id)
            .collect();
        ids.extend(state.pending.iter().filter_map(|(id, p)| {
            (p.phase == PendingPhase::Inserted && p.entity_type == request.entity_type())
                .then_some(*id)
        }));

        let mut matched: Vec<RecordId> = ids
            .into_iter()
            .filter(|id| match request.predicate_ref().field() {
                Some(field) => request.predicate_ref().matches(&state.live_field(*id, field)),
                None => true,
            })
            .collect();

        // Store-defined order: ascending creation sequence.
        matched.sort_by_key(|id| state.seq_of(*id));

        if !request.sort_descriptors().is_empty() {
            let descriptors: &[SortDescriptor] = request.sort_descriptors();
            matched.sort_by(|a, b| {
                for descriptor in descriptors {
                    let va = state.live_field(*a, &descriptor.field);
                    let vb = state.live_field(*b, &descriptor.field);
                    let ord = cmp_field_values(&va, &vb);
                    let ord = if descriptor.ascending { ord } else { ord.reverse() };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        if let Some(limit) = request.limit_value() {
            matched.truncate(limit);
        }

        Ok(matched
            .into_iter()
            .map(|id| Record::new(id, request.entity_type()))
            .collect())
    }

    fn create(&self, entity_type: &str) -> StoreResult<Record> {
        let mut state = self.state.write().map_err(|_| lock_err("create"))?;
        state.ensure_open()?;
        self.schema.expect_entity(entity_type)?;

        let id = RecordId::new();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.pending.insert(
            id,
            PendingRecord {
                entity_type: entity_type.to_string(),
                phase: PendingPhase::Inserted,
                fields: BTreeMap::new(),
                relations: BTreeMap::new(),
                seq,
            },
        );
        Ok(Record::new(id, entity_type))
    }

    fn delete(&self, record: &Record) -> StoreResult<()> {
        let mut state = self.state.write().map_err(|_| lock_err("delete"))?;
        state.ensure_open()?;
        state.expect_live(record)?;

        let id = record.id();
        if state
            .pending
            .get(&id)
            .is_some_and(|p| p.phase == PendingPhase::Inserted)
        {
            // A never-saved record vanishes outright.
            state.pending.remove(&id);
            return Ok(());
        }

        let seq = state.seq_of(id);
        state.pending.insert(
            id,
            PendingRecord {
                entity_type: record.entity_type().to_string(),
                phase: PendingPhase::Deleted,
                fields: BTreeMap::new(),
                relations: BTreeMap::new(),
                seq,
            },
        );
        Ok(())
    }

    fn save(&self) -> StoreResult<()> {
        let mut state = self.state.write().map_err(|_| lock_err("save"))?;
        state.ensure_open()?;

        if let Some(message) = state.commit_fault.take() {
            return Err(StoreError::commit(message));
        }

        // Two-phase: validate everything before mutating anything, so a
        // failed save leaves the pending set intact.
        self.validate_pending(&state)?;
        Self::apply_pending(&mut state);
        Ok(())
    }

    fn rollback_record(&self, record: &Record) -> StoreResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("rollback_record"))?;
        state.ensure_open()?;

        let id = record.id();
        if state.pending.remove(&id).is_none() && !state.committed.contains_key(&id) {
            return Err(StoreError::RecordNotFound { id });
        }
        Ok(())
    }

    fn refresh(&self, record: &Record, merge_pending: bool) -> StoreResult<()> {
        let mut state = self.state.write().map_err(|_| lock_err("refresh"))?;
        state.ensure_open()?;
        state.expect_live(record)?;

        // expect_live has already rejected pending-deleted records, so the
        // overlay here is either an insert, which has no committed state to
        // reload, or an update. Reload is identity for a purely committed
        // record either way.
        let id = record.id();
        if !merge_pending
            && state.pending.get(&id).map(|p| p.phase) == Some(PendingPhase::Updated)
        {
            state.pending.remove(&id);
        }
        Ok(())
    }

    fn get_field(&self, record: &Record, name: &str) -> StoreResult<Value> {
        let state = self.state.read().map_err(|_| lock_err("get_field"))?;
        state.ensure_open()?;

        let def = self.schema.expect_entity(record.entity_type())?;
        def.expect_field(name)?;
        state.expect_live(record)?;
        Ok(state.live_field(record.id(), name))
    }

    fn set_field(&self, record: &Record, name: &str, value: Value) -> StoreResult<()> {
        let mut state = self.state.write().map_err(|_| lock_err("set_field"))?;
        state.ensure_open()?;

        let def = self.schema.expect_entity(record.entity_type())?;
        def.check_value(name, &value)?;
        let pending = state.pending_for_edit(record)?;
        pending.fields.insert(name.to_string(), value);
        Ok(())
    }

    fn relation_members(&self, record: &Record, name: &str) -> StoreResult<Vec<RecordId>> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("relation_members"))?;
        state.ensure_open()?;

        let def = self.schema.expect_entity(record.entity_type())?;
        def.expect_relation(name)?;
        state.expect_live(record)?;
        Ok(state.live_relation(record.id(), name))
    }

    fn add_related(&self, record: &Record, name: &str, related: &[RecordId]) -> StoreResult<()> {
        let mut state = self.state.write().map_err(|_| lock_err("add_related"))?;
        state.ensure_open()?;

        let def = self.schema.expect_entity(record.entity_type())?;
        let relation = def.expect_relation(name)?.clone();
        state.expect_live(record)?;

        for member in related {
            match state.entity_type_of(*member) {
                None => return Err(StoreError::RecordNotFound { id: *member }),
                Some(actual) if actual != relation.target => {
                    return Err(StoreError::invalid_argument(format!(
                        "relation '{name}' on '{}' targets '{}', got a '{actual}' record",
                        record.entity_type(),
                        relation.target
                    )));
                }
                Some(_) => {}
            }
        }

        if related.is_empty() {
            return Ok(());
        }

        let current = state.live_relation(record.id(), name);
        let pending = state.pending_for_edit(record)?;
        let members = pending
            .relations
            .entry(name.to_string())
            .or_insert(current);
        for member in related {
            if !members.contains(member) {
                members.push(*member);
            }
        }
        Ok(())
    }

    fn remove_related(
        &self,
        record: &Record,
        name: &str,
        related: &[RecordId],
    ) -> StoreResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("remove_related"))?;
        state.ensure_open()?;

        let def = self.schema.expect_entity(record.entity_type())?;
        def.expect_relation(name)?;
        state.expect_live(record)?;

        if related.is_empty() {
            return Ok(());
        }

        let current = state.live_relation(record.id(), name);
        let pending = state.pending_for_edit(record)?;
        let members = pending
            .relations
            .entry(name.to_string())
            .or_insert(current);
        members.retain(|m| !related.contains(m));
        Ok(())
    }

    fn lifecycle(&self, record: &Record) -> StoreResult<Lifecycle> {
        let state = self.state.read().map_err(|_| lock_err("lifecycle"))?;
        state.ensure_open()?;

        let id = record.id();
        if let Some(pending) = state.pending.get(&id) {
            return Ok(match pending.phase {
                PendingPhase::Inserted => Lifecycle::Transient,
                PendingPhase::Updated => Lifecycle::Persisted,
                PendingPhase::Deleted => Lifecycle::Deleted,
            });
        }
        if state.committed.contains_key(&id) {
            return Ok(Lifecycle::Persisted);
        }
        if state.tombstones.contains(&id) {
            return Ok(Lifecycle::Deleted);
        }
        Err(StoreError::RecordNotFound { id })
    }
}
