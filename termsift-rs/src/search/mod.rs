//! Statement-level search: `name:filter`, free text and `sort:` directives.

pub mod parser;
pub mod serializer;
pub mod types;
pub mod visitor;

pub use parser::{parse_search, parse_search_or_empty};
pub use serializer::{decode_statements, encode_statements, merge, merge_and_serialize, serialize};
pub use types::*;
pub use visitor::{FilterFn, FilterMap, IndexContext, SortMap};
