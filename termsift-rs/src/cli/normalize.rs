//! Normalize command implementation.

use crate::cli::args::NormalizeArgs;
use crate::cli::output::Output;
use crate::config::SchemaConfig;
use crate::error::Result;
use crate::memory::RecordQuery;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct NormalizeResponse {
    pub query: String,
    pub normalized: String,
    pub terms: usize,
}

pub fn run(schema: &SchemaConfig, args: &NormalizeArgs, output: &Output) -> Result<()> {
    let parser = schema.query_parser::<RecordQuery>()?;
    let terms = parser.parse(&args.query)?;
    let normalized = terms.to_normalized_string();

    if args.raw {
        output.print_raw(&normalized);
        return Ok(());
    }

    output.print(&NormalizeResponse {
        query: args.query.clone(),
        normalized,
        terms: terms.len(),
    })
}
