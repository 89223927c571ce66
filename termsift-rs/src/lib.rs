//! termsift: a search-query language compiler.
//!
//! Two grammars share one lexer:
//!
//! - [`search`]: statements (`title:(beach AND sand) sort:date-desc`) compiled
//!   through an [`IndexContext`] of named filters and sorts, plus merging and
//!   canonical serialization of statement lists.
//! - [`query`]: terms (`steve age:20`) compiled through a registry of
//!   per-term match and not-match builders.
//!
//! Both target the [`Query`] trait; [`memory::RecordQuery`] implements it over
//! JSON records.
//!
//! # Example
//!
//! ```
//! use termsift::{QueryParser, OperatorParser, RecordQuery, Query, Predicate, FieldKind};
//!
//! let parser: QueryParser<RecordQuery> = QueryParser::builder()
//!     .default_term("title", OperatorParser::many(
//!         |v: &str, q: RecordQuery| q.filter(Predicate::matching("title", FieldKind::Text, v)),
//!         |v: &str, q: RecordQuery| q.filter(Predicate::not_matching("title", FieldKind::Text, v)),
//!     ))
//!     .build()
//!     .unwrap();
//!
//! let terms = parser.parse("beach NOT mountain lake").unwrap();
//! assert_eq!(terms.to_normalized_string(), "title:((beach NOT mountain) OR lake)");
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod lexer;
pub mod memory;
pub mod query;
pub mod search;

pub use config::SchemaConfig;
pub use engine::{Constant, FieldKind, Predicate, Query, QueryBranch, SortDirection};
pub use error::{QueryError, Result};
pub use memory::RecordQuery;
pub use query::{OperatorParser, QueryParser, Services, TermList, TermNode};
pub use search::{IndexContext, StatementList, parse_search};
