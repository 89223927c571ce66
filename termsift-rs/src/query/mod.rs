//! Term-level queries: registered `name:value` terms with per-term grammars.

pub mod nodes;
pub mod options;
pub mod parser;

pub use nodes::{OperatorNode, TermList, TermNode};
pub use options::{
    Condition, OperatorParser, QueryExecutionContext, Services, TermOption, TermQueryFn,
    TermQueryOption, TermRegistry,
};
pub use parser::{QueryParser, QueryParserBuilder};
