//! Fetch requests: predicates, sort descriptors, and prefetch hints.
//!
//! This is the minimal query surface the store contract needs. The two
//! non-trivial predicates are exactly the ones fetch-or-create resolution
//! uses: equality for the single case and set membership for the bulk case,
//! so a batch of candidate values costs one fetch instead of N.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Filter applied to a record's fields during a fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    /// Matches every record of the entity type.
    All,
    /// Field equals a value. An unset field reads as `Null`.
    Eq { field: String, value: Value },
    /// Field equals any of the listed values.
    In { field: String, values: Vec<Value> },
}

impl Predicate {
    /// Equality predicate.
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Membership predicate.
    #[must_use]
    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::In {
            field: field.into(),
            values,
        }
    }

    /// Field name this predicate filters on, if any.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Eq { field, .. } | Self::In { field, .. } => Some(field),
        }
    }

    /// Evaluates the predicate against one field value.
    ///
    /// `Eq` and `In` are evaluated against the value stored under the
    /// predicate's field; callers pass `Value::Null` for unset fields.
    #[must_use]
    pub fn matches(&self, field_value: &Value) -> bool {
        match self {
            Self::All => true,
            Self::Eq { value, .. } => field_value == value,
            Self::In { values, .. } => values.iter().any(|v| v == field_value),
        }
    }
}

impl Default for Predicate {
    fn default() -> Self {
        Self::All
    }
}

/// Sort direction for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDescriptor {
    /// Field to sort by.
    pub field: String,
    /// Ascending if true, descending otherwise.
    pub ascending: bool,
}

impl SortDescriptor {
    /// Ascending sort on `field`.
    #[must_use]
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: true,
        }
    }

    /// Descending sort on `field`.
    #[must_use]
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: false,
        }
    }
}

/// A fetch against one entity type.
///
/// Without sort descriptors, results come back in store-defined order
/// (ascending creation sequence for the in-memory store), which is what the
/// ambiguity policy's "first match" refers to.
///
/// # Example
/// ```
/// use fetchkit::{FetchRequest, Predicate, SortDescriptor};
///
/// let request = FetchRequest::new("track")
///     .predicate(Predicate::eq("isrc", "USRC17607839"))
///     .sort(SortDescriptor::ascending("title"))
///     .prefetch("tags")
///     .limit(10);
/// assert_eq!(request.entity_type(), "track");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    entity_type: String,
    predicate: Predicate,
    sort: Vec<SortDescriptor>,
    prefetch: Vec<String>,
    limit: Option<usize>,
}

impl FetchRequest {
    /// Creates a fetch over all records of `entity_type`.
    #[must_use]
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            predicate: Predicate::All,
            sort: Vec::new(),
            prefetch: Vec::new(),
            limit: None,
        }
    }

    /// Sets the filter predicate.
    #[must_use]
    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    /// Appends a sort descriptor. Earlier descriptors take precedence.
    #[must_use]
    pub fn sort(mut self, descriptor: SortDescriptor) -> Self {
        self.sort.push(descriptor);
        self
    }

    /// Names a relation whose members the store should load eagerly.
    #[must_use]
    pub fn prefetch(mut self, relation: impl Into<String>) -> Self {
        self.prefetch.push(relation.into());
        self
    }

    /// Caps the number of returned records.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Entity type being fetched.
    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// The filter predicate.
    #[must_use]
    pub fn predicate_ref(&self) -> &Predicate {
        &self.predicate
    }

    /// Sort descriptors in precedence order.
    #[must_use]
    pub fn sort_descriptors(&self) -> &[SortDescriptor] {
        &self.sort
    }

    /// Relations to prefetch.
    #[must_use]
    pub fn prefetch_relations(&self) -> &[String] {
        &self.prefetch
    }

    /// Result cap, if any.
    #[must_use]
    pub const fn limit_value(&self) -> Option<usize> {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_all_matches_everything() {
        assert!(Predicate::All.matches(&Value::Null));
        assert!(Predicate::All.matches(&Value::Int(3)));
        assert!(Predicate::All.field().is_none());
    }

    #[test]
    fn test_predicate_eq() {
        let p = Predicate::eq("isrc", "USRC17607839");
        assert_eq!(p.field(), Some("isrc"));
        assert!(p.matches(&Value::String("USRC17607839".into())));
        assert!(!p.matches(&Value::String("other".into())));
        assert!(!p.matches(&Value::Null));
    }

    #[test]
    fn test_predicate_in() {
        let p = Predicate::is_in("n", vec![Value::Int(7), Value::Int(3)]);
        assert!(p.matches(&Value::Int(7)));
        assert!(p.matches(&Value::Int(3)));
        assert!(!p.matches(&Value::Int(5)));
    }

    #[test]
    fn test_predicate_eq_null_matches_unset() {
        let p = Predicate::eq("isrc", Value::Null);
        assert!(p.matches(&Value::Null));
        assert!(!p.matches(&Value::Int(0)));
    }

    #[test]
    fn test_fetch_request_builder() {
        let request = FetchRequest::new("track")
            .predicate(Predicate::eq("isrc", "X"))
            .sort(SortDescriptor::ascending("title"))
            .sort(SortDescriptor::descending("duration_ms"))
            .prefetch("tags")
            .limit(5);

        assert_eq!(request.entity_type(), "track");
        assert_eq!(request.sort_descriptors().len(), 2);
        assert!(request.sort_descriptors()[0].ascending);
        assert!(!request.sort_descriptors()[1].ascending);
        assert_eq!(request.prefetch_relations(), &["tags".to_string()]);
        assert_eq!(request.limit_value(), Some(5));
    }

    #[test]
    fn test_fetch_request_defaults() {
        let request = FetchRequest::new("track");
        assert_eq!(request.predicate_ref(), &Predicate::All);
        assert!(request.sort_descriptors().is_empty());
        assert!(request.limit_value().is_none());
    }

    #[test]
    fn test_fetch_request_serialization() {
        let request = FetchRequest::new("track")
            .predicate(Predicate::is_in("n", vec![Value::Int(1), Value::Int(2)]))
            .limit(3);
        let json = serde_json::to_string(&request).unwrap();
        let decoded: FetchRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request, decoded);
    }
}
