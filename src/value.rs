//! Field value types.
//!
//! Record fields are type-erased behind [`Value`]. The comparable subset of
//! values usable for fetch-or-create key matching is wrapped in [`KeyValue`],
//! which carries a total order so the bulk resolver can build an ordered map
//! from candidate values to records without panicking on `NaN` or on value
//! kinds that have no useful ordering.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::record::RecordId;

/// Possible values a record field can hold.
///
/// # Examples
///
/// ```
/// use fetchkit::Value;
///
/// let bool_val = Value::Bool(true);
/// let int_val = Value::Int(42);
/// let string_val = Value::String("hello".to_string());
///
/// assert!(bool_val.is_bool());
/// assert!(int_val.is_int());
/// assert!(string_val.is_string());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Record(RecordId),
    Structured(serde_json::Value),
    Null,
}

impl Value {
    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }

    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    pub const fn is_record(&self) -> bool {
        matches!(self, Self::Record(_))
    }

    pub const fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_record(&self) -> Option<RecordId> {
        match self {
            Self::Record(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_structured(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Structured(v) => Some(v),
            _ => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Record(_) => "record",
            Self::Structured(_) => "structured",
            Self::Null => "null",
        }
    }

    /// The [`ValueKind`] this value belongs to.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::String(_) => ValueKind::String,
            Self::Record(_) => ValueKind::Record,
            Self::Structured(_) => ValueKind::Structured,
            Self::Null => ValueKind::Any,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Record(v) => write!(f, "record:{v}"),
            Self::Structured(v) => write!(f, "{v}"),
            Self::Null => write!(f, "null"),
        }
    }
}

// Convenient From implementations
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<RecordId> for Value {
    fn from(v: RecordId) -> Self {
        Self::Record(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Self::Structured(v)
    }
}

/// Declared kind of a schema field.
///
/// `Any` accepts every value, including `Null`; the other kinds reject
/// mismatched writes at set time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    String,
    Record,
    Structured,
    Any,
}

impl ValueKind {
    /// Returns true if `value` may be stored in a field of this kind.
    ///
    /// `Null` is accepted by every kind: an unset field reads as `Null`, so
    /// writing `Null` is how a field is cleared.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        match self {
            Self::Bool => value.is_bool(),
            Self::Int => value.is_int(),
            Self::Float => value.is_float() || value.is_int(),
            Self::String => value.is_string(),
            Self::Record => value.is_record(),
            Self::Structured => value.is_structured(),
            Self::Any => true,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::String => write!(f, "string"),
            Self::Record => write!(f, "record"),
            Self::Structured => write!(f, "structured"),
            Self::Any => write!(f, "any"),
        }
    }
}

/// A value from the comparable subset of [`Value`], carrying a total order.
///
/// Bulk resolution matches candidate values against fetched records through
/// an ordered map, which requires keys with a total order. `Null`,
/// `Structured`, and non-finite floats are rejected at construction, so the
/// `Ord` impl never has to invent an answer for them.
///
/// Ordering across kinds is by kind rank (bool, int, float, string, record),
/// then by value within a kind; `Int` and `Float` do not cross-compare, which
/// keeps equality consistent with `Value`'s derived `PartialEq`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct KeyValue(KeyRepr);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum KeyRepr {
    Bool(bool),
    Int(i64),
    Float(TotalFloat),
    String(String),
    Record(RecordId),
}

/// f64 wrapper ordered by `total_cmp`. Construction rejects non-finite
/// values and normalizes `-0.0` to `0.0`, so equality here agrees with
/// `==` on the underlying float.
#[derive(Debug, Clone)]
struct TotalFloat(f64);

impl PartialEq for TotalFloat {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for TotalFloat {}

impl PartialOrd for TotalFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TotalFloat {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl KeyValue {
    /// Wraps a value for use as a resolution key.
    ///
    /// # Errors
    /// Returns [`ValidationError::NotComparable`] for `Null`, `Structured`,
    /// and non-finite floats.
    pub fn try_from_value(value: &Value) -> Result<Self, ValidationError> {
        match value {
            Value::Bool(v) => Ok(Self(KeyRepr::Bool(*v))),
            Value::Int(v) => Ok(Self(KeyRepr::Int(*v))),
            // Collapse -0.0 into 0.0; total_cmp distinguishes the two zeros
            // but `f64 ==` does not, and key equality must match `f64 ==`.
            Value::Float(v) if v.is_finite() => {
                let v = if *v == 0.0 { 0.0 } else { *v };
                Ok(Self(KeyRepr::Float(TotalFloat(v))))
            }
            Value::Float(_) => Err(ValidationError::NotComparable {
                kind: "non-finite float".to_string(),
            }),
            Value::String(v) => Ok(Self(KeyRepr::String(v.clone()))),
            Value::Record(v) => Ok(Self(KeyRepr::Record(*v))),
            Value::Structured(_) | Value::Null => Err(ValidationError::NotComparable {
                kind: value.type_name().to_string(),
            }),
        }
    }

    /// Recovers the wrapped [`Value`].
    #[must_use]
    pub fn to_value(&self) -> Value {
        match &self.0 {
            KeyRepr::Bool(v) => Value::Bool(*v),
            KeyRepr::Int(v) => Value::Int(*v),
            KeyRepr::Float(v) => Value::Float(v.0),
            KeyRepr::String(v) => Value::String(v.clone()),
            KeyRepr::Record(v) => Value::Record(*v),
        }
    }
}

impl TryFrom<&Value> for KeyValue {
    type Error = ValidationError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Self::try_from_value(value)
    }
}
