//! Recursive descent parser for search statements.
//!
//! Grammar:
//! ```text
//! query      = statement (WS+ statement)*
//! statement  = sort_stmt | field_stmt | default_stmt
//! sort_stmt  = "sort:" SORT_FIELD ("-asc" | "-desc" | "-dsc")?
//! field_stmt = TERM_NAME WS* or_expr
//! default    = or_expr
//! or_expr    = and_expr (or_op and_expr)*
//! and_expr   = unary (and_op unary)*
//! unary      = not_op VALUE | primary
//! primary    = QUOTED | BARE_WORD | "(" or_expr ")"
//! or_op      = "OR" | "||" | WS (not before an operator or a TERM_NAME)
//! and_op     = "AND" | "&&" | WS (before a not_op)
//! not_op     = "NOT" | "!" | "-"
//! ```
//! Whitespace followed by a negation joins the operands with AND, so
//! `beach NOT mountain` reads as `beach AND NOT mountain`.

use crate::error::Result;
use crate::lexer::Cursor;
use crate::search::types::*;
use tracing::debug;

/// Parse a query string into statements.
///
/// Empty or whitespace-only input yields an empty list. Input that does not
/// match the grammar is rejected with [`QueryError::Parse`](crate::QueryError::Parse).
pub fn parse_search(text: &str) -> Result<StatementList> {
    let mut cursor = Cursor::new(text);
    let mut statements = Vec::new();

    cursor.skip_whitespace();
    while !cursor.is_eof() {
        let statement = match parse_statement(&mut cursor) {
            Some(statement) => statement,
            None => return Err(cursor.error()),
        };
        statements.push(statement);

        let skipped = cursor.skip_whitespace();
        if !cursor.is_eof() && skipped == 0 {
            cursor.expected("whitespace between statements");
            return Err(cursor.error());
        }
    }

    Ok(StatementList::new(statements))
}

/// Like [`parse_search`], but malformed input yields an empty list.
pub fn parse_search_or_empty(text: &str) -> StatementList {
    parse_search(text).unwrap_or_else(|e| {
        debug!(query = text, error = %e, "unparseable search, treating as empty");
        StatementList::default()
    })
}

// ============================================================================
// Statements
// ============================================================================

fn parse_statement(cursor: &mut Cursor) -> Option<SearchStatement> {
    if let Some(name) = cursor.peek_term_name() {
        if name.eq_ignore_ascii_case("sort") {
            return parse_sort(cursor);
        }
        cursor.term_name();
        cursor.skip_whitespace();
        let expression = parse_or(cursor)?;
        return Some(SearchStatement::FieldFilter {
            name: name.to_string(),
            expression,
        });
    }

    parse_or(cursor).map(|expression| SearchStatement::DefaultFilter { expression })
}

fn parse_sort(cursor: &mut Cursor) -> Option<SearchStatement> {
    let start = cursor.pos();
    cursor.term_name();

    let rest = cursor.rest();
    let end = rest
        .char_indices()
        .find(|(_, ch)| ch.is_whitespace() || *ch == '-')
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    if end == 0 {
        cursor.expected("a sort field");
        cursor.reset(start);
        return None;
    }
    let field = SearchValue::new(&rest[..end]);
    cursor.reset(cursor.pos() + end);

    let sort = if cursor.peek() == Some('-') {
        match parse_sort_suffix(cursor) {
            Some(sort) => sort,
            None => {
                cursor.expected("'-asc', '-desc' or '-dsc'");
                cursor.reset(start);
                return None;
            }
        }
    } else {
        SortExpression::Ascending { explicit: false }
    };

    Some(SearchStatement::Sort { field, sort })
}

fn parse_sort_suffix(cursor: &mut Cursor) -> Option<SortExpression> {
    let rest = cursor.rest();
    let end = rest
        .char_indices()
        .find(|(_, ch)| ch.is_whitespace())
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    let sort = match rest[..end].to_ascii_lowercase().as_str() {
        "-asc" => SortExpression::Ascending { explicit: true },
        "-desc" | "-dsc" => SortExpression::Descending,
        _ => return None,
    };
    cursor.reset(cursor.pos() + end);
    Some(sort)
}

// ============================================================================
// Filter expressions
// ============================================================================

fn parse_or(cursor: &mut Cursor) -> Option<FilterExpression> {
    let mut left = parse_and(cursor)?;

    loop {
        let save = cursor.pos();
        let after_group = cursor.prev() == Some(')');
        let skipped = cursor.skip_whitespace();

        let operator = if (skipped > 0 || after_group) && cursor.eat_keyword("OR") {
            "OR"
        } else if cursor.eat_symbol("||") {
            "||"
        } else if skipped > 0
            && !cursor.is_eof()
            && cursor.peek() != Some(')')
            && !cursor.peek_operator()
            && cursor.peek_term_name().is_none()
        {
            " "
        } else {
            cursor.reset(save);
            break;
        };
        if operator != " " {
            cursor.skip_whitespace();
        }

        match parse_and(cursor) {
            Some(right) => left = FilterExpression::or(left, right, operator),
            None => {
                cursor.reset(save);
                break;
            }
        }
    }

    Some(left)
}

fn parse_and(cursor: &mut Cursor) -> Option<FilterExpression> {
    let mut left = parse_unary(cursor)?;

    loop {
        let save = cursor.pos();
        let after_group = cursor.prev() == Some(')');
        let skipped = cursor.skip_whitespace();

        let operator = if (skipped > 0 || after_group) && cursor.eat_keyword("AND") {
            "AND"
        } else if cursor.eat_symbol("&&") {
            "&&"
        } else if skipped > 0 && peek_not_operator(cursor) {
            " "
        } else {
            cursor.reset(save);
            break;
        };
        if operator != " " {
            cursor.skip_whitespace();
        }

        match parse_unary(cursor) {
            Some(right) => left = FilterExpression::and(left, right, operator),
            None => {
                cursor.reset(save);
                break;
            }
        }
    }

    Some(left)
}

fn peek_not_operator(cursor: &Cursor) -> bool {
    cursor.peek_keyword("NOT")
        || cursor.starts_with("!")
        || cursor.starts_with("-")
}

fn parse_unary(cursor: &mut Cursor) -> Option<FilterExpression> {
    let start = cursor.pos();
    let token = if cursor.eat_keyword("NOT") {
        "NOT"
    } else if cursor.eat_char('!') {
        "!"
    } else if cursor.eat_char('-') {
        "-"
    } else {
        return parse_primary(cursor);
    };
    cursor.skip_whitespace();

    if cursor.peek() == Some('(') {
        cursor.expected("a single value after a negation (negating a group is not supported)");
        cursor.reset(start);
        return None;
    }

    let value = if let Some(quoted) = cursor.quoted() {
        quoted
    } else if let Some(word) = cursor.bare_word() {
        word.to_string()
    } else {
        cursor.expected("a value after a negation");
        cursor.reset(start);
        return None;
    };

    Some(FilterExpression::not_matching(token, value))
}

fn parse_primary(cursor: &mut Cursor) -> Option<FilterExpression> {
    if let Some(quoted) = cursor.quoted() {
        return Some(FilterExpression::matching(quoted));
    }
    if let Some(word) = cursor.bare_word() {
        return Some(FilterExpression::matching(word));
    }

    let start = cursor.pos();
    if cursor.eat_char('(') {
        cursor.skip_whitespace();
        if let Some(inner) = parse_or(cursor) {
            cursor.skip_whitespace();
            if cursor.eat_char(')') {
                return Some(FilterExpression::group(inner));
            }
            cursor.expected("')'");
        }
        cursor.reset(start);
        return None;
    }

    cursor.expected("a value");
    None
}
