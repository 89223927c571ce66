//! Lexical layer shared by the statement and term grammars.
//!
//! Token classes:
//! ```text
//! identifier  = [A-Za-z_][A-Za-z0-9_]*
//! term_name   = identifier ":"            (no whitespace before the colon)
//! quoted      = '"' ( '\"' | '\\' | [^"] )* '"'
//! bare_word   = word_start word_char*     (not a keyword, not followed by ':')
//! non_space   = [^\s]+
//! ```
//! The cursor works on byte offsets into the original input and supports
//! checkpoint/reset so the grammars can backtrack.

use crate::error::QueryError;

/// Reserved boolean keywords. They are matched case-sensitively.
pub const KEYWORDS: &[&str] = &["AND", "OR", "NOT"];

/// Characters that terminate a bare word.
const STRUCTURAL: &[char] = &['(', ')', '"', ':', '!', '&', '|'];

pub fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

pub fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

pub fn is_word_char(ch: char) -> bool {
    !ch.is_whitespace() && !STRUCTURAL.contains(&ch)
}

fn is_word_start(ch: char) -> bool {
    is_word_char(ch) && ch != '-'
}

/// Whether `name` is a valid term or field name.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_identifier_start(first) => chars.all(is_identifier_char),
        _ => false,
    }
}

/// Whether `value` can be written without quotes and read back as one bare word.
pub fn is_bare_word(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if is_word_start(first) => {
            chars.all(is_word_char) && !KEYWORDS.contains(&value)
        }
        _ => false,
    }
}

/// Quote a value for rendering, escaping `"` and `\`.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

/// Backtracking cursor over a query string.
#[derive(Debug)]
pub struct Cursor<'a> {
    input: &'a str,
    pos: usize,
    furthest: Option<(usize, &'static str)>,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            furthest: None,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn reset(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// The character just before the cursor.
    pub fn prev(&self) -> Option<char> {
        self.input[..self.pos].chars().next_back()
    }

    fn bump(&mut self, ch: char) {
        self.pos += ch.len_utf8();
    }

    /// Skip whitespace, returning how many characters were skipped.
    pub fn skip_whitespace(&mut self) -> usize {
        let mut count = 0;
        while let Some(ch) = self.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.bump(ch);
            count += 1;
        }
        count
    }

    pub fn eat_char(&mut self, expected: char) -> bool {
        match self.peek() {
            Some(ch) if ch == expected => {
                self.bump(ch);
                true
            }
            _ => false,
        }
    }

    pub fn starts_with(&self, symbol: &str) -> bool {
        self.rest().starts_with(symbol)
    }

    /// Consume a literal symbol such as `&&` or `!`.
    pub fn eat_symbol(&mut self, symbol: &str) -> bool {
        if self.starts_with(symbol) {
            self.pos += symbol.len();
            true
        } else {
            false
        }
    }

    /// Whether a keyword starts here and ends at a word boundary.
    pub fn peek_keyword(&self, keyword: &str) -> bool {
        let rest = self.rest();
        rest.starts_with(keyword)
            && rest[keyword.len()..]
                .chars()
                .next()
                .is_none_or(|ch| !is_word_char(ch))
    }

    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    /// Whether any keyword or symbolic operator starts here.
    pub fn peek_operator(&self) -> bool {
        KEYWORDS.iter().any(|kw| self.peek_keyword(kw))
            || ["&&", "||", "!", "-"].iter().any(|sym| self.starts_with(sym))
    }

    fn scan_identifier(&self) -> Option<&'a str> {
        let rest = self.rest();
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, ch)) if is_identifier_start(ch) => {}
            _ => return None,
        }
        let end = chars
            .find(|(_, ch)| !is_identifier_char(*ch))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        Some(&rest[..end])
    }

    pub fn identifier(&mut self) -> Option<&'a str> {
        let ident = self.scan_identifier()?;
        self.pos += ident.len();
        Some(ident)
    }

    /// Look ahead for `identifier:` without consuming anything.
    pub fn peek_term_name(&self) -> Option<&'a str> {
        let ident = self.scan_identifier()?;
        self.rest()[ident.len()..].starts_with(':').then_some(ident)
    }

    /// Consume `identifier:` and return the identifier.
    pub fn term_name(&mut self) -> Option<&'a str> {
        let ident = self.peek_term_name()?;
        self.pos += ident.len() + 1;
        Some(ident)
    }

    /// Consume a double-quoted string, returning its unescaped content.
    pub fn quoted(&mut self) -> Option<String> {
        let start = self.pos;
        if !self.eat_char('"') {
            return None;
        }
        let mut value = String::new();
        let mut escaped = false;
        while let Some(ch) = self.peek() {
            self.bump(ch);
            if escaped {
                value.push(ch);
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                return Some(value);
            } else {
                value.push(ch);
            }
        }
        self.expected("a closing '\"'");
        self.pos = start;
        None
    }

    /// Consume a bare word. Keywords and term names are rejected.
    pub fn bare_word(&mut self) -> Option<&'a str> {
        let rest = self.rest();
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, ch)) if is_word_start(ch) => {}
            _ => return None,
        }
        let end = chars
            .find(|(_, ch)| !is_word_char(*ch))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let word = &rest[..end];
        if KEYWORDS.contains(&word) || rest[end..].starts_with(':') {
            return None;
        }
        self.pos += end;
        Some(word)
    }

    /// Consume a run of non-whitespace characters.
    pub fn non_whitespace(&mut self) -> Option<&'a str> {
        let rest = self.rest();
        let end = rest
            .char_indices()
            .find(|(_, ch)| ch.is_whitespace())
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        if end == 0 {
            return None;
        }
        self.pos += end;
        Some(&rest[..end])
    }

    /// Record a failed expectation at the current position.
    ///
    /// Only the failure that got furthest into the input is kept.
    pub fn expected(&mut self, what: &'static str) {
        match self.furthest {
            Some((pos, _)) if pos > self.pos => {}
            _ => self.furthest = Some((self.pos, what)),
        }
    }

    /// Build a parse error for input that could not be consumed.
    pub fn error(&self) -> QueryError {
        let (position, message) = match self.furthest {
            Some((pos, what)) if pos >= self.pos => {
                (pos, format!("expected {}", what))
            }
            _ => match self.peek() {
                Some(ch) => (self.pos, format!("unexpected '{}'", ch)),
                None => (self.pos, "unexpected end of input".to_string()),
            },
        };
        QueryError::Parse { position, message }
    }
}
