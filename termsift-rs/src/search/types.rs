//! Statement AST for search query strings.
//!
//! Every node renders two ways: `Display` reproduces the operator tokens the
//! user typed, [`to_normalized_string`](FilterExpression::to_normalized_string)
//! produces the canonical, fully bracketed form.

use crate::engine::SortDirection;
use crate::lexer::{is_bare_word, quote};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw scalar token taken from the query text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchValue(String);

impl SearchValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchValue {
    /// Renders the value so it reads back as a single value, quoting when needed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if is_bare_word(&self.0) {
            f.write_str(&self.0)
        } else {
            f.write_str(&quote(&self.0))
        }
    }
}

/// Whether a value must be present or absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchOperator {
    Match,
    /// Carries the token used (`NOT`, `!` or `-`).
    NotMatch { token: String },
}

impl SearchOperator {
    pub fn not_match(token: impl Into<String>) -> Self {
        SearchOperator::NotMatch {
            token: token.into(),
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, SearchOperator::Match)
    }
}

impl fmt::Display for SearchOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchOperator::Match => Ok(()),
            SearchOperator::NotMatch { token } if token == "NOT" => f.write_str("NOT "),
            SearchOperator::NotMatch { token } => f.write_str(token),
        }
    }
}

/// A boolean filter over one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterExpression {
    Unary {
        operator: SearchOperator,
        value: SearchValue,
    },
    And {
        left: Box<FilterExpression>,
        right: Box<FilterExpression>,
        operator: String,
    },
    Or {
        left: Box<FilterExpression>,
        right: Box<FilterExpression>,
        /// `OR`, `||`, or `" "` for the implicit operator.
        operator: String,
    },
    /// Produced by explicit parentheses.
    Group { expression: Box<FilterExpression> },
}

impl FilterExpression {
    /// A value that must be present.
    pub fn matching(value: impl Into<String>) -> Self {
        FilterExpression::Unary {
            operator: SearchOperator::Match,
            value: SearchValue::new(value),
        }
    }

    /// A value that must be absent.
    pub fn not_matching(token: impl Into<String>, value: impl Into<String>) -> Self {
        FilterExpression::Unary {
            operator: SearchOperator::not_match(token),
            value: SearchValue::new(value),
        }
    }

    pub fn and(left: FilterExpression, right: FilterExpression, operator: impl Into<String>) -> Self {
        FilterExpression::And {
            left: Box::new(left),
            right: Box::new(right),
            operator: operator.into(),
        }
    }

    pub fn or(left: FilterExpression, right: FilterExpression, operator: impl Into<String>) -> Self {
        FilterExpression::Or {
            left: Box::new(left),
            right: Box::new(right),
            operator: operator.into(),
        }
    }

    pub fn group(expression: FilterExpression) -> Self {
        FilterExpression::Group {
            expression: Box::new(expression),
        }
    }

    /// Canonical form: explicit `AND`/`OR`/`NOT`, every binary node bracketed.
    pub fn to_normalized_string(&self) -> String {
        match self {
            FilterExpression::Unary {
                operator: SearchOperator::Match,
                value,
            } => value.to_string(),
            FilterExpression::Unary { value, .. } => format!("NOT {}", value),
            FilterExpression::And { left, right, .. } => format!(
                "({} AND {})",
                left.to_normalized_string(),
                right.to_normalized_string()
            ),
            FilterExpression::Or { left, right, .. } => format!(
                "({} OR {})",
                left.to_normalized_string(),
                right.to_normalized_string()
            ),
            FilterExpression::Group { expression } => match expression.as_ref() {
                FilterExpression::Unary { .. } => {
                    format!("({})", expression.to_normalized_string())
                }
                _ => expression.to_normalized_string(),
            },
        }
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpression::Unary { operator, value } => write!(f, "{}{}", operator, value),
            FilterExpression::And {
                left,
                right,
                operator,
            }
            | FilterExpression::Or {
                left,
                right,
                operator,
            } => {
                // Blank operator: implicit, written as plain whitespace.
                if operator.trim().is_empty() {
                    write!(f, "{} {}", left, right)
                } else {
                    write!(f, "{} {} {}", left, operator, right)
                }
            }
            FilterExpression::Group { expression } => write!(f, "({})", expression),
        }
    }
}

/// Sort direction as written in a `sort:` statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "direction", rename_all = "snake_case")]
pub enum SortExpression {
    /// `explicit` records whether `-asc` was typed.
    Ascending { explicit: bool },
    Descending,
}

impl SortExpression {
    pub fn direction(&self) -> SortDirection {
        match self {
            SortExpression::Ascending { .. } => SortDirection::Ascending,
            SortExpression::Descending => SortDirection::Descending,
        }
    }

    fn to_normalized_string(self) -> &'static str {
        match self {
            SortExpression::Ascending { .. } => "",
            SortExpression::Descending => "-desc",
        }
    }
}

impl From<SortDirection> for SortExpression {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Ascending => SortExpression::Ascending { explicit: false },
            SortDirection::Descending => SortExpression::Descending,
        }
    }
}

impl fmt::Display for SortExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortExpression::Ascending { explicit: true } => f.write_str("-asc"),
            SortExpression::Ascending { explicit: false } => Ok(()),
            SortExpression::Descending => f.write_str("-desc"),
        }
    }
}

/// One top-level unit of a search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchStatement {
    /// Unqualified text, applied to the default filter.
    DefaultFilter { expression: FilterExpression },
    /// `name:expression`.
    FieldFilter {
        name: String,
        expression: FilterExpression,
    },
    /// `sort:field[-asc|-desc]`.
    Sort {
        field: SearchValue,
        sort: SortExpression,
    },
    /// Injected by the caller; applied only when no explicit sort exists.
    /// Never rendered.
    DefaultSort {
        field: SearchValue,
        sort: SortExpression,
    },
}

impl SearchStatement {
    pub fn to_normalized_string(&self) -> String {
        match self {
            SearchStatement::DefaultFilter { expression } => expression.to_normalized_string(),
            SearchStatement::FieldFilter { name, expression } => {
                format!("{}:{}", name, expression.to_normalized_string())
            }
            SearchStatement::Sort { field, sort } => {
                format!("sort:{}{}", field.as_str(), sort.to_normalized_string())
            }
            SearchStatement::DefaultSort { .. } => String::new(),
        }
    }
}

impl fmt::Display for SearchStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchStatement::DefaultFilter { expression } => write!(f, "{}", expression),
            SearchStatement::FieldFilter { name, expression } => {
                write!(f, "{}:{}", name, expression)
            }
            SearchStatement::Sort { field, sort } => write!(f, "sort:{}{}", field.as_str(), sort),
            SearchStatement::DefaultSort { .. } => Ok(()),
        }
    }
}

/// Parsed statements in application order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementList {
    pub statements: Vec<SearchStatement>,

    /// Set during execution once a primary sort key has been applied, so later
    /// sorts become secondary keys.
    #[serde(skip)]
    pub has_order: bool,
}

impl StatementList {
    pub fn new(statements: Vec<SearchStatement>) -> Self {
        Self {
            statements,
            has_order: false,
        }
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SearchStatement> {
        self.statements.iter()
    }

    pub fn push(&mut self, statement: SearchStatement) {
        self.statements.push(statement);
    }

    /// Whether the list contains a user-specified `sort:` statement.
    pub fn has_explicit_sort(&self) -> bool {
        self.statements
            .iter()
            .any(|s| matches!(s, SearchStatement::Sort { .. }))
    }

    pub fn to_normalized_string(&self) -> String {
        join_rendered(self.statements.iter().map(|s| s.to_normalized_string()))
    }
}

impl fmt::Display for StatementList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_rendered(self.statements.iter().map(|s| s.to_string())))
    }
}

/// Join rendered statements with single spaces, skipping empty renderings.
pub(crate) fn join_rendered(parts: impl Iterator<Item = String>) -> String {
    parts
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
