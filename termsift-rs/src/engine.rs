//! The query-engine contract the compilers target.
//!
//! Storage and execution live behind [`Query`]. The compilers only ever call
//! the methods below, handing over [`Predicate`] trees and property names.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A deferred query transform, used as a branch of [`Query::any`] and [`Query::all`].
pub type QueryBranch<'a, Q> = Box<dyn FnOnce(Q) -> Q + 'a>;

/// An executable query over some index type.
pub trait Query: Sized {
    /// Narrow the result set (`where`).
    fn filter(self, predicate: Predicate) -> Self;

    /// Establish the primary sort key, ascending.
    fn order_by(self, property: &str) -> Self;

    /// Establish the primary sort key, descending.
    fn order_by_descending(self, property: &str) -> Self;

    /// Add a secondary sort key, ascending.
    fn then_by(self, property: &str) -> Self;

    /// Add a secondary sort key, descending.
    fn then_by_descending(self, property: &str) -> Self;

    /// Union: keep results matched by any branch applied to this query.
    fn any<'b>(self, branches: Vec<QueryBranch<'b, Self>>) -> Self;

    /// Intersection: keep results matched by every branch applied to this query.
    fn all<'b>(self, branches: Vec<QueryBranch<'b, Self>>) -> Self;
}

/// Value type of an indexed property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Text,
    Integer,
    Float,
    Boolean,
    /// ISO date (YYYY-MM-DD).
    Date,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// A typed constant produced from a search value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Constant {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
}

impl Constant {
    /// Convert raw search text to a constant of `kind`.
    ///
    /// Text that does not convert yields the kind's default value instead of
    /// failing the query.
    pub fn coerce(raw: &str, kind: FieldKind) -> Self {
        let trimmed = raw.trim();
        match kind {
            FieldKind::Text => Constant::Text(raw.to_string()),
            FieldKind::Integer => Constant::Integer(trimmed.parse().unwrap_or_else(|_| {
                debug!(value = raw, "not an integer, using 0");
                0
            })),
            FieldKind::Float => Constant::Float(trimmed.parse().unwrap_or_else(|_| {
                debug!(value = raw, "not a number, using 0.0");
                0.0
            })),
            FieldKind::Boolean => Constant::Boolean(match trimmed.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => true,
                "false" | "no" | "0" => false,
                _ => {
                    debug!(value = raw, "not a boolean, using false");
                    false
                }
            }),
            FieldKind::Date => Constant::Date(
                NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").unwrap_or_else(|_| {
                    debug!(value = raw, "not a date, using the default date");
                    NaiveDate::default()
                }),
            ),
        }
    }
}

/// A boolean condition over index properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    /// Text property contains the value.
    Contains { property: String, value: String },
    /// Text property does not contain the value.
    NotContains { property: String, value: String },
    Equals { property: String, value: Constant },
    NotEquals { property: String, value: Constant },
    And { children: Vec<Predicate> },
    Or { children: Vec<Predicate> },
}

impl Predicate {
    /// The predicate a value must satisfy to match `property`.
    pub fn matching(property: &str, kind: FieldKind, value: &str) -> Self {
        match kind {
            FieldKind::Text => Predicate::Contains {
                property: property.to_string(),
                value: value.to_string(),
            },
            _ => Predicate::Equals {
                property: property.to_string(),
                value: Constant::coerce(value, kind),
            },
        }
    }

    /// The predicate a value must satisfy to NOT match `property`.
    pub fn not_matching(property: &str, kind: FieldKind, value: &str) -> Self {
        match kind {
            FieldKind::Text => Predicate::NotContains {
                property: property.to_string(),
                value: value.to_string(),
            },
            _ => Predicate::NotEquals {
                property: property.to_string(),
                value: Constant::coerce(value, kind),
            },
        }
    }

    /// Conjunction, flattening nested `And` nodes.
    pub fn and(left: Predicate, right: Predicate) -> Self {
        let mut children = Vec::new();
        for p in [left, right] {
            match p {
                Predicate::And { children: nested } => children.extend(nested),
                other => children.push(other),
            }
        }
        Predicate::And { children }
    }

    /// Disjunction, flattening nested `Or` nodes.
    pub fn or(left: Predicate, right: Predicate) -> Self {
        let mut children = Vec::new();
        for p in [left, right] {
            match p {
                Predicate::Or { children: nested } => children.extend(nested),
                other => children.push(other),
            }
        }
        Predicate::Or { children }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_coerce_integer() {
        assert_eq!(Constant::coerce("20", FieldKind::Integer), Constant::Integer(20));
        assert_eq!(Constant::coerce(" 7 ", FieldKind::Integer), Constant::Integer(7));
    }

    #[test]
    fn test_coerce_falls_back_to_default() {
        assert_eq!(Constant::coerce("twenty", FieldKind::Integer), Constant::Integer(0));
        assert_eq!(Constant::coerce("abc", FieldKind::Float), Constant::Float(0.0));
        assert_eq!(Constant::coerce("maybe", FieldKind::Boolean), Constant::Boolean(false));
        assert_eq!(
            Constant::coerce("yesterday", FieldKind::Date),
            Constant::Date(NaiveDate::default())
        );
    }

    #[test]
    fn test_coerce_boolean_and_date() {
        assert_eq!(Constant::coerce("TRUE", FieldKind::Boolean), Constant::Boolean(true));
        assert_eq!(Constant::coerce("no", FieldKind::Boolean), Constant::Boolean(false));
        assert_eq!(
            Constant::coerce("2024-03-01", FieldKind::Date),
            Constant::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
    }

    #[test]
    fn test_matching_text_uses_containment() {
        assert_eq!(
            Predicate::matching("title", FieldKind::Text, "beach"),
            Predicate::Contains {
                property: "title".to_string(),
                value: "beach".to_string()
            }
        );
        assert_eq!(
            Predicate::not_matching("title", FieldKind::Text, "beach"),
            Predicate::NotContains {
                property: "title".to_string(),
                value: "beach".to_string()
            }
        );
    }

    #[test]
    fn test_matching_typed_uses_equality() {
        assert_eq!(
            Predicate::matching("age", FieldKind::Integer, "20"),
            Predicate::Equals {
                property: "age".to_string(),
                value: Constant::Integer(20)
            }
        );
    }

    #[test]
    fn test_and_flattens() {
        let a = Predicate::matching("t", FieldKind::Text, "a");
        let b = Predicate::matching("t", FieldKind::Text, "b");
        let c = Predicate::matching("t", FieldKind::Text, "c");
        let combined = Predicate::and(Predicate::and(a.clone(), b.clone()), c.clone());
        assert_eq!(combined, Predicate::And { children: vec![a, b, c] });
    }

    #[test]
    fn test_or_keeps_nested_and() {
        let a = Predicate::matching("t", FieldKind::Text, "a");
        let b = Predicate::matching("t", FieldKind::Text, "b");
        let and = Predicate::and(a.clone(), b.clone());
        let combined = Predicate::or(and.clone(), a.clone());
        assert_eq!(combined, Predicate::Or { children: vec![and, a] });
    }

    #[test]
    fn test_predicate_serializes_tagged() {
        let p = Predicate::matching("views", FieldKind::Integer, "3");
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["op"], "equals");
        assert_eq!(json["value"]["type"], "integer");
        assert_eq!(json["value"]["value"], 3);
    }
}
