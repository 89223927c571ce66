//! In-memory [`Query`] over JSON records.
//!
//! Used by the CLI `search` command and by tests. Properties are looked up by
//! dotted path (`stats.views`). Text matching is case-insensitive containment.

use crate::engine::{Constant, Predicate, Query, QueryBranch, SortDirection};
use crate::error::{QueryError, Result};
use chrono::NaiveDate;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

/// A selection of records plus the sort keys applied so far.
#[derive(Debug, Clone)]
pub struct RecordQuery {
    records: Arc<[Value]>,
    selected: Vec<usize>,
    order: Vec<(String, SortDirection)>,
}

impl RecordQuery {
    pub fn new(records: Vec<Value>) -> Self {
        let selected = (0..records.len()).collect();
        Self {
            records: Arc::from(records),
            selected,
            order: Vec::new(),
        }
    }

    /// Load records from a JSON array.
    pub fn from_json(text: &str) -> Result<Self> {
        match serde_json::from_str(text)? {
            Value::Array(records) => Ok(Self::new(records)),
            _ => Err(QueryError::ConfigError(
                "record data must be a JSON array".to_string(),
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Sort keys in application order.
    pub fn ordering(&self) -> &[(String, SortDirection)] {
        &self.order
    }

    /// Selected records, sorted by the applied keys.
    pub fn results(&self) -> Vec<&Value> {
        let mut indices = self.selected.clone();
        indices.sort_by(|&a, &b| {
            self.order
                .iter()
                .map(|(property, direction)| {
                    compare(
                        lookup(&self.records[a], property),
                        lookup(&self.records[b], property),
                        *direction,
                    )
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
        indices.into_iter().map(|i| &self.records[i]).collect()
    }

    fn with_selection(&self, selected: Vec<usize>) -> Self {
        Self {
            records: Arc::clone(&self.records),
            selected,
            order: self.order.clone(),
        }
    }
}

impl Query for RecordQuery {
    fn filter(mut self, predicate: Predicate) -> Self {
        let records = Arc::clone(&self.records);
        self.selected.retain(|&i| evaluate(&predicate, &records[i]));
        self
    }

    fn order_by(mut self, property: &str) -> Self {
        self.order = vec![(property.to_string(), SortDirection::Ascending)];
        self
    }

    fn order_by_descending(mut self, property: &str) -> Self {
        self.order = vec![(property.to_string(), SortDirection::Descending)];
        self
    }

    fn then_by(mut self, property: &str) -> Self {
        self.order.push((property.to_string(), SortDirection::Ascending));
        self
    }

    fn then_by_descending(mut self, property: &str) -> Self {
        self.order.push((property.to_string(), SortDirection::Descending));
        self
    }

    fn any<'b>(self, branches: Vec<QueryBranch<'b, Self>>) -> Self {
        let mut union = BTreeSet::new();
        for branch in branches {
            union.extend(branch(self.clone()).selected);
        }
        self.with_selection(union.into_iter().collect())
    }

    fn all<'b>(self, branches: Vec<QueryBranch<'b, Self>>) -> Self {
        let mut intersection: BTreeSet<usize> = self.selected.iter().copied().collect();
        for branch in branches {
            let matched: BTreeSet<usize> = branch(self.clone()).selected.into_iter().collect();
            intersection.retain(|i| matched.contains(i));
        }
        self.with_selection(intersection.into_iter().collect())
    }
}

// ============================================================================
// Evaluation
// ============================================================================

fn lookup<'v>(record: &'v Value, property: &str) -> Option<&'v Value> {
    property
        .split('.')
        .try_fold(record, |value, key| value.as_object()?.get(key))
        .filter(|value| !value.is_null())
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn contains(value: Option<&Value>, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| text_of(item).to_lowercase().contains(&needle)),
        Some(value) => text_of(value).to_lowercase().contains(&needle),
        None => false,
    }
}

fn equals(value: Option<&Value>, constant: &Constant) -> bool {
    let Some(value) = value else {
        return false;
    };
    if let Value::Array(items) = value {
        return items.iter().any(|item| equals(Some(item), constant));
    }
    match constant {
        Constant::Text(text) => text_of(value).eq_ignore_ascii_case(text),
        Constant::Integer(n) => value.as_i64() == Some(*n) || value.as_f64() == Some(*n as f64),
        Constant::Float(x) => value.as_f64() == Some(*x),
        Constant::Boolean(b) => value.as_bool() == Some(*b),
        Constant::Date(date) => value
            .as_str()
            .and_then(|s| s.get(..10))
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .is_some_and(|d| d == *date),
    }
}

/// Whether `record` satisfies `predicate`.
pub fn evaluate(predicate: &Predicate, record: &Value) -> bool {
    match predicate {
        Predicate::Contains { property, value } => contains(lookup(record, property), value),
        Predicate::NotContains { property, value } => !contains(lookup(record, property), value),
        Predicate::Equals { property, value } => equals(lookup(record, property), value),
        Predicate::NotEquals { property, value } => !equals(lookup(record, property), value),
        Predicate::And { children } => children.iter().all(|c| evaluate(c, record)),
        Predicate::Or { children } => children.iter().any(|c| evaluate(c, record)),
    }
}

/// Missing values sort last in either direction.
fn compare(a: Option<&Value>, b: Option<&Value>, direction: SortDirection) -> Ordering {
    let (x, y) = match (a, b) {
        (None, None) => return Ordering::Equal,
        (Some(_), None) => return Ordering::Less,
        (None, Some(_)) => return Ordering::Greater,
        (Some(x), Some(y)) => (x, y),
    };
    let ord = match (x, y) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (x, y) => text_of(x).to_lowercase().cmp(&text_of(y).to_lowercase()),
    };
    match direction {
        SortDirection::Ascending => ord,
        SortDirection::Descending => ord.reverse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FieldKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn records() -> RecordQuery {
        RecordQuery::new(vec![
            json!({"title": "Beach day", "views": 10, "published": "2024-03-01", "tags": ["sun"]}),
            json!({"title": "Mountain lake", "views": 30, "published": "2024-01-15"}),
            json!({"title": "Sand and beach", "views": 20, "stats": {"likes": 5}}),
        ])
    }

    fn titles(query: &RecordQuery) -> Vec<String> {
        query
            .results()
            .iter()
            .map(|r| r["title"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let q = records().filter(Predicate::matching("title", FieldKind::Text, "BEACH"));
        assert_eq!(titles(&q), vec!["Beach day", "Sand and beach"]);
    }

    #[test]
    fn test_not_contains_includes_missing() {
        let q = records().filter(Predicate::not_matching("tags", FieldKind::Text, "sun"));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn test_equals_typed() {
        let q = records().filter(Predicate::matching("views", FieldKind::Integer, "30"));
        assert_eq!(titles(&q), vec!["Mountain lake"]);

        let q = records().filter(Predicate::matching("published", FieldKind::Date, "2024-03-01"));
        assert_eq!(titles(&q), vec!["Beach day"]);

        let q = records().filter(Predicate::matching("stats.likes", FieldKind::Integer, "5"));
        assert_eq!(titles(&q), vec!["Sand and beach"]);
    }

    #[test]
    fn test_any_is_union_all_is_intersection() {
        let beach: QueryBranch<'_, RecordQuery> =
            Box::new(|q| q.filter(Predicate::matching("title", FieldKind::Text, "beach")));
        let lake: QueryBranch<'_, RecordQuery> =
            Box::new(|q| q.filter(Predicate::matching("title", FieldKind::Text, "lake")));
        assert_eq!(records().any(vec![beach, lake]).len(), 3);

        let beach: QueryBranch<'_, RecordQuery> =
            Box::new(|q| q.filter(Predicate::matching("title", FieldKind::Text, "beach")));
        let sand: QueryBranch<'_, RecordQuery> =
            Box::new(|q| q.filter(Predicate::matching("title", FieldKind::Text, "sand")));
        assert_eq!(titles(&records().all(vec![beach, sand])), vec!["Sand and beach"]);
    }

    #[test]
    fn test_ordering() {
        let q = records().order_by_descending("views");
        assert_eq!(titles(&q), vec!["Mountain lake", "Sand and beach", "Beach day"]);

        // Missing dates sort last, ties broken by title.
        let q = records().order_by("published").then_by("title");
        assert_eq!(titles(&q), vec!["Mountain lake", "Beach day", "Sand and beach"]);
    }

    #[test]
    fn test_missing_values_last_when_descending() {
        let q = records().order_by_descending("published");
        assert_eq!(titles(&q), vec!["Beach day", "Mountain lake", "Sand and beach"]);
    }

    #[test]
    fn test_from_json_requires_array() {
        assert!(RecordQuery::from_json("[{\"a\": 1}]").is_ok());
        assert!(RecordQuery::from_json("{\"a\": 1}").is_err());
    }
}
