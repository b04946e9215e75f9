// ============================================================================
// Filter predicates
// ============================================================================
//
// Typed filter state keyed by logical field. Keys are exclusive: setting a
// key replaces its value, clearing it removes the key from serialization.
// Serialization is ordered by key so equal states produce identical output.
//
// ============================================================================

use crate::core::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value of one filter key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterValue {
    Equals(String),
    Substring(String),
    /// Half-open time window: `after <= t < before`. Either bound may be open.
    Range {
        after: Option<DateTime<Utc>>,
        before: Option<DateTime<Utc>>,
    },
    OneOf(Vec<String>),
}

impl FilterValue {
    pub fn equals(value: impl Into<String>) -> Self {
        Self::Equals(value.into())
    }

    pub fn substring(value: impl Into<String>) -> Self {
        Self::Substring(value.into())
    }

    pub fn range(after: Option<DateTime<Utc>>, before: Option<DateTime<Utc>>) -> Self {
        Self::Range { after, before }
    }

    pub fn one_of<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::OneOf(values.into_iter().map(Into::into).collect())
    }

    /// Canonical form of the value, or `None` when it constrains nothing.
    ///
    /// An empty string, an empty membership list and a fully open range are
    /// all equivalent to the key being absent.
    fn normalize(self) -> Option<Self> {
        match self {
            Self::Equals(v) if v.is_empty() => None,
            Self::Substring(v) if v.is_empty() => None,
            Self::Range {
                after: None,
                before: None,
            } => None,
            Self::OneOf(mut values) => {
                values.retain(|v| !v.is_empty());
                values.sort();
                values.dedup();
                if values.is_empty() {
                    None
                } else {
                    Some(Self::OneOf(values))
                }
            }
            other => Some(other),
        }
    }
}

/// One typed filter condition as produced by [`FilterPredicateSet::serialize`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Predicate {
    pub key: String,
    pub value: FilterValue,
}

impl Predicate {
    /// Backend wire form. A two-sided range expands into two conditions.
    pub fn to_wire(&self) -> Vec<WirePredicate> {
        let key = || self.key.clone();
        match &self.value {
            FilterValue::Equals(v) => vec![WirePredicate {
                key: key(),
                operation: PredicateOp::Equals,
                operand: Operand::StringValue(v.clone()),
            }],
            FilterValue::Substring(v) => vec![WirePredicate {
                key: key(),
                operation: PredicateOp::IsSubstring,
                operand: Operand::StringValue(v.clone()),
            }],
            FilterValue::Range { after, before } => {
                let mut out = Vec::with_capacity(2);
                if let Some(after) = after {
                    out.push(WirePredicate {
                        key: key(),
                        operation: PredicateOp::GreaterThanEquals,
                        operand: Operand::TimestampValue(format_timestamp(after)),
                    });
                }
                if let Some(before) = before {
                    out.push(WirePredicate {
                        key: key(),
                        operation: PredicateOp::LessThan,
                        operand: Operand::TimestampValue(format_timestamp(before)),
                    });
                }
                out
            }
            FilterValue::OneOf(values) => vec![WirePredicate {
                key: key(),
                operation: PredicateOp::In,
                operand: Operand::StringValues(StringValues {
                    values: values.clone(),
                }),
            }],
        }
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredicateOp {
    Equals,
    IsSubstring,
    GreaterThanEquals,
    LessThan,
    In,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    StringValue(String),
    TimestampValue(String),
    StringValues(StringValues),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringValues {
    pub values: Vec<String>,
}

/// A single predicate as the list endpoint receives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePredicate {
    pub key: String,
    pub operation: PredicateOp,
    #[serde(flatten)]
    pub operand: Operand,
}

#[derive(Serialize)]
struct WireFilter<'a> {
    predicates: &'a [WirePredicate],
}

/// Encodes predicates into the backend filter document.
///
/// An empty slice still produces `{"predicates":[]}` so "no filter" is never
/// confused with a dropped parameter.
pub fn encode_predicates(predicates: &[Predicate]) -> Result<String> {
    let wire: Vec<WirePredicate> = predicates.iter().flat_map(Predicate::to_wire).collect();
    Ok(serde_json::to_string(&WireFilter { predicates: &wire })?)
}

/// Ordered, key-exclusive filter state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPredicateSet {
    entries: BTreeMap<String, FilterValue>,
}

impl FilterPredicateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing any previous value.
    ///
    /// Returns whether the effective filter changed. A value that constrains
    /// nothing clears the key.
    pub fn set(&mut self, key: impl Into<String>, value: FilterValue) -> bool {
        let key = key.into();
        match value.normalize() {
            Some(value) => {
                if self.entries.get(&key) == Some(&value) {
                    return false;
                }
                self.entries.insert(key, value);
                true
            }
            None => self.entries.remove(&key).is_some(),
        }
    }

    /// Removes `key`. Returns whether it was present.
    pub fn clear(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear_all(&mut self) -> bool {
        let changed = !self.entries.is_empty();
        self.entries.clear();
        changed
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.entries.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Predicates sorted by key.
    pub fn serialize(&self) -> Vec<Predicate> {
        self.entries
            .iter()
            .map(|(key, value)| Predicate {
                key: key.clone(),
                value: value.clone(),
            })
            .collect()
    }

    pub fn encode(&self) -> Result<String> {
        encode_predicates(&self.serialize())
    }
}
