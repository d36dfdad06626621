//! Search-engine query documents produced by the compiler.
//!
//! Clauses are kept typed until serialization; the `Serialize` impls below
//! emit the exact JSON shapes the search engine expects.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::rules::{Condition, TimeUnit};

/// Which side of a range a bound sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Lower,
    Upper,
}

impl Bound {
    pub fn key(self) -> &'static str {
        match self {
            Self::Lower => "gte",
            Self::Upper => "lte",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    MatchAll,
    /// Exact match of `field` against `value`.
    Match { field: String, value: Value },
    /// Any of `values`.
    Terms { field: String, values: Vec<Value> },
    NumericRange {
        field: String,
        bound: Bound,
        value: f64,
    },
    /// `now-<amount><unit>/<unit>`, resolved by the engine at query time.
    DateRange {
        field: String,
        bound: Bound,
        amount: u64,
        unit: TimeUnit,
    },
    Bool {
        condition: Condition,
        clauses: Vec<Clause>,
    },
    /// Restricts `filter` to documents reached through the `path` relation.
    Nested { path: String, filter: Box<Clause> },
}

impl Clause {
    pub fn date_math(amount: u64, unit: TimeUnit) -> String {
        format!("now-{amount}{unit}/{unit}")
    }
}

/// One-entry JSON object.
struct Entry<'a, V: ?Sized>(&'a str, &'a V);

impl<V: Serialize + ?Sized> Serialize for Entry<'_, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.0, self.1)?;
        map.end()
    }
}

/// `{"constant_score": {"filter": <clause>}}`: filter only, no scoring.
struct ConstantScore<'a>(&'a Clause);

impl Serialize for ConstantScore<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Entry("constant_score", &Entry("filter", self.0)).serialize(serializer)
    }
}

struct EmptyObject;

impl Serialize for EmptyObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_map(Some(0))?.end()
    }
}

struct Nested<'a> {
    path: &'a str,
    filter: &'a Clause,
}

impl Serialize for Nested<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("path", self.path)?;
        map.serialize_entry("query", &ConstantScore(self.filter))?;
        map.end()
    }
}

impl Serialize for Clause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::MatchAll => Entry("match_all", &EmptyObject).serialize(serializer),
            Self::Match { field, value } => {
                Entry("match", &Entry(field, value)).serialize(serializer)
            }
            Self::Terms { field, values } => {
                Entry("terms", &Entry(field, values)).serialize(serializer)
            }
            Self::NumericRange {
                field,
                bound,
                value,
            } => Entry("range", &Entry(field, &Entry(bound.key(), value))).serialize(serializer),
            Self::DateRange {
                field,
                bound,
                amount,
                unit,
            } => {
                let expr = Self::date_math(*amount, *unit);
                Entry("range", &Entry(field, &Entry(bound.key(), &expr))).serialize(serializer)
            }
            Self::Bool { condition, clauses } => {
                Entry(condition.key(), clauses).serialize(serializer)
            }
            Self::Nested { path, filter } => {
                Entry("nested", &Nested { path, filter }).serialize(serializer)
            }
        }
    }
}

/// Final query document handed to the search engine.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    filter: Clause,
}

impl CompiledQuery {
    /// Selects every document.
    pub fn match_all() -> Self {
        Self {
            filter: Clause::MatchAll,
        }
    }

    pub fn filtered(filter: Clause) -> Self {
        Self { filter }
    }

    pub fn is_match_all(&self) -> bool {
        self.filter == Clause::MatchAll
    }

    pub fn to_value(&self) -> Value {
        // Every clause serializes to string-keyed maps of plain values.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for CompiledQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Entry("query", &ConstantScore(&self.filter)).serialize(serializer)
    }
}
