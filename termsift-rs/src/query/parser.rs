//! Term grammar and the compiler entry point.
//!
//! Grammar:
//! ```text
//! terms     = term (WS+ term)*
//! term      = TERM_NAME WS* operation | operation        (default term)
//! operation = one | many                                 (per registered term)
//! one       = QUOTED | NON_WHITESPACE
//! many      = and_expr ((or_op and_expr) | (not_op VALUE))*
//! and_expr  = unary (("AND" | "&&") unary)*
//! unary     = not_op VALUE | primary
//! primary   = QUOTED | BARE_WORD | "(" many ")"
//! or_op     = "OR" | "||" | WS (not before an operator or a TERM_NAME)
//! not_op    = "NOT" | "!" | "-"
//! ```
//! `a NOT b` sits at the same level as OR and folds left, so
//! `a NOT b c` reads as `(a NOT b) OR c`.

use crate::engine::Query;
use crate::error::{QueryError, Result};
use crate::lexer::Cursor;
use crate::query::nodes::{OperatorNode, TermList, TermNode};
use crate::query::options::{
    Condition, OperatorParser, QueryExecutionContext, Services, TermOption, TermRegistry,
};
use std::fmt;
use tracing::{debug, trace};

const NEGATED_GROUP: &str = "a single value after a negation (negating a group is not supported)";

/// Parses term queries and compiles them against registered terms.
///
/// Build once with [`QueryParser::builder`] and share between executions.
pub struct QueryParser<Q> {
    registry: TermRegistry<Q>,
}

impl<Q> fmt::Debug for QueryParser<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryParser")
            .field("registry", &self.registry)
            .finish()
    }
}

/// Collects term registrations for a [`QueryParser`].
///
/// The first registration error is reported by [`build`](Self::build).
pub struct QueryParserBuilder<Q> {
    registry: TermRegistry<Q>,
    error: Option<QueryError>,
}

impl<Q: Query> QueryParserBuilder<Q> {
    fn register(mut self, name: &str, is_default: bool, parser: OperatorParser<Q>) -> Self {
        if self.error.is_none() {
            let option = TermOption {
                name: name.to_string(),
                is_default,
                parser,
            };
            if let Err(e) = self.registry.register(option) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn named_term(self, name: &str, parser: OperatorParser<Q>) -> Self {
        self.register(name, false, parser)
    }

    /// Register the term that receives unqualified text.
    pub fn default_term(self, name: &str, parser: OperatorParser<Q>) -> Self {
        self.register(name, true, parser)
    }

    pub fn build(self) -> Result<QueryParser<Q>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(QueryParser {
                registry: self.registry,
            }),
        }
    }
}

impl<Q: Query> QueryParser<Q> {
    pub fn builder() -> QueryParserBuilder<Q> {
        QueryParserBuilder {
            registry: TermRegistry::new(),
            error: None,
        }
    }

    pub fn registry(&self) -> &TermRegistry<Q> {
        &self.registry
    }

    /// Parse `text` into terms.
    pub fn parse(&self, text: &str) -> Result<TermList> {
        let mut cursor = Cursor::new(text);
        let mut terms = Vec::new();

        cursor.skip_whitespace();
        while !cursor.is_eof() {
            match self.parse_term(&mut cursor) {
                Some(term) => terms.push(term),
                None => return Err(cursor.error()),
            }

            let skipped = cursor.skip_whitespace();
            if !cursor.is_eof() && skipped == 0 {
                cursor.expected("whitespace between terms");
                return Err(cursor.error());
            }
        }

        Ok(TermList::new(terms))
    }

    /// Like [`parse`](Self::parse), but malformed input yields an empty list.
    pub fn parse_or_empty(&self, text: &str) -> TermList {
        self.parse(text).unwrap_or_else(|e| {
            debug!(query = text, error = %e, "unparseable query, treating as empty");
            TermList::default()
        })
    }

    /// Parse and render in canonical form.
    pub fn normalize(&self, text: &str) -> Result<String> {
        Ok(self.parse(text)?.to_normalized_string())
    }

    /// Apply every term to `query` in input order.
    ///
    /// Terms that are not registered are skipped.
    pub fn execute(&self, terms: &TermList, query: Q, services: &Services) -> Q {
        let mut context = QueryExecutionContext::new(services);
        let mut query = query;

        for term in terms {
            let Some(option) = self.registry.get(term.name()) else {
                debug!(term = term.name(), "term not registered, skipping");
                continue;
            };
            trace!(term = %term, "applying term");
            context.set_current_term_option(Some(option.clone()));
            query = term.operation().build(&context)(query);
        }

        query
    }

    fn parse_term(&self, cursor: &mut Cursor) -> Option<TermNode> {
        if let Some(name) = cursor.peek_term_name() {
            cursor.term_name();
            cursor.skip_whitespace();
            return match self.registry.get(name) {
                Some(option) => Some(TermNode::Named {
                    name: option.name.clone(),
                    operation: parse_operation(cursor, option.condition())?,
                }),
                None => {
                    debug!(term = name, "unknown term, reading a single value");
                    Some(TermNode::Named {
                        name: name.to_string(),
                        operation: parse_operation(cursor, Condition::One)?,
                    })
                }
            };
        }

        let Some(default) = self.registry.default_term() else {
            cursor.expected("a term name (no default term is registered)");
            return None;
        };
        Some(TermNode::Default {
            name: default.name.clone(),
            operation: parse_operation(cursor, default.condition())?,
        })
    }
}

fn parse_operation(cursor: &mut Cursor, condition: Condition) -> Option<OperatorNode> {
    match condition {
        Condition::One => parse_single(cursor),
        Condition::Many => parse_many(cursor),
    }
}

// ============================================================================
// One condition
// ============================================================================

fn parse_single(cursor: &mut Cursor) -> Option<OperatorNode> {
    if let Some(quoted) = cursor.quoted() {
        return Some(OperatorNode::unary(quoted));
    }
    match cursor.non_whitespace() {
        Some(value) => Some(OperatorNode::unary(value)),
        None => {
            cursor.expected("a value");
            None
        }
    }
}

// ============================================================================
// Many conditions
// ============================================================================

enum Step {
    Or(&'static str),
    Not(&'static str),
}

fn parse_many(cursor: &mut Cursor) -> Option<OperatorNode> {
    let mut left = parse_and(cursor)?;

    loop {
        let save = cursor.pos();
        let after_group = cursor.prev() == Some(')');
        let skipped = cursor.skip_whitespace();
        let spaced = skipped > 0 || after_group;

        let step = if spaced && cursor.eat_keyword("OR") {
            Step::Or("OR")
        } else if cursor.eat_symbol("||") {
            Step::Or("||")
        } else if spaced && cursor.eat_keyword("NOT") {
            Step::Not("NOT")
        } else if cursor.eat_char('!') {
            Step::Not("!")
        } else if spaced && cursor.eat_char('-') {
            Step::Not("-")
        } else if skipped > 0
            && !cursor.is_eof()
            && cursor.peek() != Some(')')
            && !cursor.peek_operator()
            && cursor.peek_term_name().is_none()
        {
            Step::Or(" ")
        } else {
            cursor.reset(save);
            break;
        };

        left = match step {
            Step::Or(" ") => match parse_and(cursor) {
                Some(right) => OperatorNode::or(left, right, " "),
                None => {
                    cursor.reset(save);
                    break;
                }
            },
            Step::Or(operator) => {
                cursor.skip_whitespace();
                OperatorNode::or(left, parse_and(cursor)?, operator)
            }
            Step::Not(operator) => {
                OperatorNode::not(left, parse_negated_value(cursor)?, operator)
            }
        };
    }

    Some(left)
}

fn parse_and(cursor: &mut Cursor) -> Option<OperatorNode> {
    let mut left = parse_unary(cursor)?;

    loop {
        let save = cursor.pos();
        let after_group = cursor.prev() == Some(')');
        let skipped = cursor.skip_whitespace();

        let operator = if (skipped > 0 || after_group) && cursor.eat_keyword("AND") {
            "AND"
        } else if cursor.eat_symbol("&&") {
            "&&"
        } else {
            cursor.reset(save);
            break;
        };
        cursor.skip_whitespace();
        left = OperatorNode::and(left, parse_unary(cursor)?, operator);
    }

    Some(left)
}

fn parse_unary(cursor: &mut Cursor) -> Option<OperatorNode> {
    let operator = if cursor.eat_keyword("NOT") {
        "NOT"
    } else if cursor.eat_char('!') {
        "!"
    } else if cursor.eat_char('-') {
        "-"
    } else {
        return parse_primary(cursor);
    };

    Some(OperatorNode::not_unary(operator, parse_negated_value(cursor)?))
}

/// The single value a negation applies to. Whitespace after the operator is allowed.
fn parse_negated_value(cursor: &mut Cursor) -> Option<String> {
    cursor.skip_whitespace();
    if cursor.peek() == Some('(') {
        cursor.expected(NEGATED_GROUP);
        return None;
    }
    if let Some(quoted) = cursor.quoted() {
        return Some(quoted);
    }
    match cursor.bare_word() {
        Some(word) => Some(word.to_string()),
        None => {
            cursor.expected("a value after a negation");
            None
        }
    }
}

fn parse_primary(cursor: &mut Cursor) -> Option<OperatorNode> {
    if let Some(quoted) = cursor.quoted() {
        return Some(OperatorNode::unary(quoted));
    }
    if let Some(word) = cursor.bare_word() {
        return Some(OperatorNode::unary(word));
    }
    if cursor.eat_char('(') {
        cursor.skip_whitespace();
        let inner = parse_many(cursor)?;
        cursor.skip_whitespace();
        if !cursor.eat_char(')') {
            cursor.expected("')'");
            return None;
        }
        return Some(OperatorNode::group(inner));
    }

    cursor.expected("a value");
    None
}
