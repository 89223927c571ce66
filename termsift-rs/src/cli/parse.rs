//! Parse command implementation.

use crate::cli::args::ParseArgs;
use crate::cli::output::Output;
use crate::config::SchemaConfig;
use crate::error::Result;
use crate::memory::RecordQuery;
use crate::search::parse_search;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ParseResponse<T> {
    pub query: String,
    pub grammar: &'static str,
    pub literal: String,
    pub normalized: String,
    pub ast: T,
}

pub fn run(schema: &SchemaConfig, args: &ParseArgs, output: &Output) -> Result<()> {
    if args.terms {
        let parser = schema.query_parser::<RecordQuery>()?;
        let terms = parser.parse(&args.query)?;
        output.print(&ParseResponse {
            query: args.query.clone(),
            grammar: "terms",
            literal: terms.to_string(),
            normalized: terms.to_normalized_string(),
            ast: &terms.terms,
        })
    } else {
        let statements = parse_search(&args.query)?;
        output.print(&ParseResponse {
            query: args.query.clone(),
            grammar: "statements",
            literal: statements.to_string(),
            normalized: statements.to_normalized_string(),
            ast: &statements.statements,
        })
    }
}
