//! Module: value
//! Responsibility: the tagged value union, its total canonical order, and
//! token extraction for contains matching.
//! Does not own: index row layout or predicate semantics.

use crate::types::EntityId;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};

///
/// Value
///
/// Dynamic property value. Entities are duck-typed property bags, so every
/// indexed or queried value flows through this union rather than a typed
/// column model.
///
/// Null → the property is absent (projection's "absent" marker).
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Id(EntityId),
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Canonical variant rank. Int and Float share the numeric rank so
    /// mixed-numeric range scans interleave correctly.
    #[must_use]
    pub const fn canonical_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 2,
            Self::Text(_) => 3,
            Self::Id(_) => 4,
            Self::List(_) => 5,
            Self::Map(_) => 6,
        }
    }

    /// Whether this value can appear as an index row key component.
    /// Lists index per element; maps index per dotted path; neither is a
    /// row key itself.
    #[must_use]
    pub const fn is_indexable_scalar(&self) -> bool {
        matches!(
            self,
            Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Text(_) | Self::Id(_)
        )
    }

    /// Normalized contains-match tokens: lowercased alphanumeric runs.
    /// Text tokenizes on whitespace/punctuation; lists tokenize per element.
    #[must_use]
    pub fn tokens(&self) -> Vec<String> {
        match self {
            Self::Text(text) => tokenize(text),
            Self::List(items) => {
                let mut out = Vec::new();
                for item in items {
                    out.extend(item.tokens());
                }
                out
            }
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Total canonical comparator: variant rank first, then same-rank comparison.
/// Every surface that orders values (index keys, sorts, cursor boundaries)
/// goes through this so the order is identical everywhere.
#[must_use]
pub fn canonical_cmp(left: &Value, right: &Value) -> Ordering {
    let rank = left.canonical_rank().cmp(&right.canonical_rank());
    if rank != Ordering::Equal {
        return rank;
    }

    match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Text(a), Value::Text(b)) => a.cmp(b),
        (Value::Id(a), Value::Id(b)) => a.cmp(b),
        (Value::List(a), Value::List(b)) => cmp_list(a, b),
        (Value::Map(a), Value::Map(b)) => cmp_map(a, b),
        (a, b) => cmp_numeric(a, b),
    }
}

fn cmp_numeric(left: &Value, right: &Value) -> Ordering {
    // Same-representation comparisons stay exact.
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => return a.cmp(b),
        (Value::Float(a), Value::Float(b)) => return a.total_cmp(b),
        _ => {}
    }

    let (a, a_tag) = numeric_repr(left);
    let (b, b_tag) = numeric_repr(right);

    // Mixed Int/Float compares numerically; the variant tag breaks exact
    // ties so the order stays antisymmetric.
    a.total_cmp(&b).then_with(|| a_tag.cmp(&b_tag))
}

#[expect(clippy::cast_precision_loss)]
fn numeric_repr(value: &Value) -> (f64, u8) {
    match value {
        Value::Int(n) => (*n as f64, 0),
        Value::Float(f) => (*f, 1),
        _ => (f64::NAN, 2),
    }
}

fn cmp_list(left: &[Value], right: &[Value]) -> Ordering {
    for (a, b) in left.iter().zip(right.iter()) {
        let cmp = canonical_cmp(a, b);
        if cmp != Ordering::Equal {
            return cmp;
        }
    }

    left.len().cmp(&right.len())
}

fn cmp_map(left: &[(String, Value)], right: &[(String, Value)]) -> Ordering {
    for ((ak, av), (bk, bv)) in left.iter().zip(right.iter()) {
        let key_cmp = ak.cmp(bk);
        if key_cmp != Ordering::Equal {
            return key_cmp;
        }

        let value_cmp = canonical_cmp(av, bv);
        if value_cmp != Ordering::Equal {
            return value_cmp;
        }
    }

    left.len().cmp(&right.len())
}

/// Split on whitespace/punctuation and lowercase; contains matching is
/// case-insensitive by construction.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        canonical_cmp(self, other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        canonical_cmp(self, other)
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "'{s}'"),
            Self::Id(id) => write!(f, "{id}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(pairs) => {
                f.write_str("{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<EntityId> for Value {
    fn from(id: EntityId) -> Self {
        Self::Id(id)
    }
}

///
/// TESTS
///
