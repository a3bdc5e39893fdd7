//! Module: query::predicate
//! Responsibility: the boolean filter tree and its canonical normal form.
//! Does not own: parsing (parse) or evaluation (executor).

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// CompareOp
///

#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum CompareOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Contains => "contains",
        };
        f.write_str(symbol)
    }
}

///
/// ComparePredicate
///
/// One leaf: property path, operator, literal. The path may be dotted
/// (`actor.displayName`); the index treats the whole path as the property
/// name.
///

#[derive(Clone, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ComparePredicate {
    pub property: String,
    pub op: CompareOp,
    pub value: Value,
}

impl ComparePredicate {
    #[must_use]
    pub fn new(property: impl Into<String>, op: CompareOp, value: Value) -> Self {
        Self {
            property: property.into(),
            op,
            value,
        }
    }
}

///
/// FilterExpr
///
/// Boolean filter tree. And/Or hold two or more children after
/// normalization; evaluation treats them as pure set intersection/union, so
/// operand order never affects results.
///

#[derive(Clone, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub enum FilterExpr {
    Compare(ComparePredicate),
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
    Not(Box<FilterExpr>),
}

impl FilterExpr {
    #[must_use]
    pub fn eq(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Compare(ComparePredicate::new(property, CompareOp::Eq, value.into()))
    }

    #[must_use]
    pub fn contains(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Compare(ComparePredicate::new(
            property,
            CompareOp::Contains,
            value.into(),
        ))
    }

    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(vec![self, other])
    }

    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(vec![self, other])
    }

    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Canonical normal form: nested And/Or of the same kind flatten,
    /// single-child nodes collapse, and children sort canonically. Two
    /// filters that denote the same set compare equal after this, which is
    /// what the cursor signature hashes.
    #[must_use]
    pub fn normalize(self) -> Self {
        match self {
            Self::Compare(leaf) => Self::Compare(leaf),
            Self::Not(inner) => Self::Not(Box::new(inner.normalize())),
            Self::And(children) => Self::rebuild(children, true),
            Self::Or(children) => Self::rebuild(children, false),
        }
    }

    fn rebuild(children: Vec<Self>, conjunctive: bool) -> Self {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child.normalize() {
                Self::And(inner) if conjunctive => flat.extend(inner),
                Self::Or(inner) if !conjunctive => flat.extend(inner),
                other => flat.push(other),
            }
        }

        flat.sort();
        flat.dedup();

        if flat.len() == 1 {
            flat.swap_remove(0)
        } else if conjunctive {
            Self::And(flat)
        } else {
            Self::Or(flat)
        }
    }

    /// Every property path the tree references, for index validation.
    #[must_use]
    pub fn properties(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_properties(&mut out);
        out.sort_unstable();
        out.dedup();
        out
    }

    fn collect_properties<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Compare(leaf) => out.push(leaf.property.as_str()),
            Self::Not(inner) => inner.collect_properties(out),
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.collect_properties(out);
                }
            }
        }
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare(leaf) => write!(f, "{} {} {}", leaf.property, leaf.op, leaf.value),
            Self::Not(inner) => write!(f, "not ({inner})"),
            Self::And(children) => write_joined(f, children, " and "),
            Self::Or(children) => write_joined(f, children, " or "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[FilterExpr], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{child}")?;
    }
    f.write_str(")")
}
