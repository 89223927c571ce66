//! Merging and canonical re-serialization of statement lists.
//!
//! A search box usually has two sources of truth: the statements persisted in
//! the query string and the statements just submitted by a form. [`merge`]
//! reconciles them so the rendered text can be written back to both.

use crate::error::Result;
use crate::search::parser::parse_search;
use crate::search::types::{SearchStatement, StatementList, join_rendered};

fn same_field(a: &SearchStatement, b: &SearchStatement) -> bool {
    match (a, b) {
        (
            SearchStatement::FieldFilter { name: left, .. },
            SearchStatement::FieldFilter { name: right, .. },
        ) => left.eq_ignore_ascii_case(right),
        _ => false,
    }
}

/// Merge form statements into query-string statements.
///
/// A form field filter replaces the query-string filter with the same name,
/// keeping the query-string position. Unmatched form statements are appended
/// in their original order.
pub fn merge(query_string: &StatementList, form: &StatementList) -> StatementList {
    let mut remaining: Vec<Option<&SearchStatement>> = form.statements.iter().map(Some).collect();
    let mut merged = Vec::with_capacity(query_string.len() + form.len());

    for statement in query_string.iter() {
        let replacement = remaining
            .iter_mut()
            .find(|slot| slot.is_some_and(|candidate| same_field(statement, candidate)))
            .and_then(Option::take);
        merged.push(replacement.unwrap_or(statement).clone());
    }
    merged.extend(remaining.into_iter().flatten().cloned());

    StatementList::new(merged)
}

/// Render statements for display or persistence.
///
/// The default filter is written once and default sorts are never written.
pub fn serialize(statements: &StatementList) -> String {
    let mut default_written = false;
    join_rendered(statements.iter().filter_map(|statement| match statement {
        SearchStatement::DefaultSort { .. } => None,
        SearchStatement::DefaultFilter { .. } if default_written => None,
        SearchStatement::DefaultFilter { .. } => {
            default_written = true;
            Some(statement.to_string())
        }
        _ => Some(statement.to_string()),
    }))
}

pub fn merge_and_serialize(query_string: &StatementList, form: &StatementList) -> String {
    serialize(&merge(query_string, form))
}

/// Serialize and percent-encode statements for use in a URL.
pub fn encode_statements(statements: &StatementList) -> String {
    urlencoding::encode(&serialize(statements)).into_owned()
}

/// Decode a percent-encoded query (`+` read as a space) and parse it.
pub fn decode_statements(encoded: &str) -> Result<StatementList> {
    let spaced = encoded.replace('+', " ");
    let decoded = urlencoding::decode(&spaced)?;
    parse_search(&decoded)
}
