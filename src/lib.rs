//! # fetchkit - key-based fetch-or-create over a transactional object store
//!
//! fetchkit resolves candidate key values to records in an object store,
//! fetching the ones that exist and materializing the ones that don't,
//! without creating duplicates for values submitted together and without a
//! per-value round trip for bulk lookups.
//!
//! ## Core Concepts
//!
//! - **Record**: an opaque handle to one persisted or pending-persisted
//!   object instance; all data is owned by the store
//! - **Object Store**: the transactional collection managing record
//!   lifecycle, fetches, and commits ([`ObjectStore`], with
//!   [`InMemoryObjectStore`] as the reference backend)
//! - **Resolver**: fetch-or-create by key, one fetch per call even for bulk
//!   candidate sets
//! - **Schema**: per-entity-type field and relation tables; type-erased
//!   property access resolves through them, not through reflection
//!
//! ## Usage
//!
//! ```rust
//! use fetchkit::{EntityDef, InMemoryObjectStore, Resolver, Schema, Value, ValueKind};
//!
//! let schema = Schema::new().entity(EntityDef::new("tag").field("name", ValueKind::String));
//! let store = InMemoryObjectStore::new(schema);
//! let resolver = Resolver::new();
//!
//! // One fetch resolves the whole batch; the duplicate "jazz" maps to one record.
//! let tags = resolver
//!     .resolve_many(
//!         &store,
//!         "tag",
//!         "name",
//!         &[Value::from("jazz"), Value::from("bebop"), Value::from("jazz")],
//!     )
//!     .unwrap();
//! assert_eq!(tags[0], tags[2]);
//!
//! resolver.save_changes(&store).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod query;
pub mod record;
pub mod resolver;
pub mod schema;
pub mod storage;
pub mod value;

// Re-export primary types at crate root for convenience
pub use error::{StoreError, StoreResult, ValidationError};
pub use query::{FetchRequest, Predicate, SortDescriptor};
pub use record::{Lifecycle, Record, RecordId};
pub use resolver::{AmbiguityPolicy, Resolver, ResolverConfig};
pub use schema::{EntityDef, FieldDef, RelationDef, RelationKind, Schema};
pub use storage::{InMemoryObjectStore, ObjectStore};
pub use value::{KeyValue, Value, ValueKind};
