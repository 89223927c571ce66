//! Search command implementation.

use crate::cli::args::SearchArgs;
use crate::cli::output::Output;
use crate::config::SchemaConfig;
use crate::error::Result;
use crate::memory::RecordQuery;
use crate::query::Services;
use crate::search::parse_search;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct SearchResponse<'a> {
    pub query: String,
    pub normalized: String,
    pub total: usize,
    pub results: Vec<&'a Value>,
}

/// Compile the query against the records and return the matches.
pub fn execute(schema: &SchemaConfig, args: &SearchArgs, records: RecordQuery) -> Result<(String, RecordQuery)> {
    if args.terms {
        let parser = schema.query_parser::<RecordQuery>()?;
        let terms = parser.parse(&args.query)?;
        let matched = parser.execute(&terms, records, &Services::new());
        Ok((terms.to_normalized_string(), matched))
    } else {
        let context = schema.index_context::<RecordQuery>()?;
        let mut statements = parse_search(&args.query)?;
        schema.apply_default_sort(&context, &mut statements)?;
        let matched = context.execute(&mut statements, records);
        Ok((statements.to_normalized_string(), matched))
    }
}

pub fn run(schema: &SchemaConfig, args: &SearchArgs, output: &Output) -> Result<()> {
    let data = fs::read_to_string(&args.data)?;
    let records = RecordQuery::from_json(&data)?;
    info!(records = records.len(), path = %args.data.display(), "loaded records");

    let records_len = records.len();
    let (normalized, matched) = execute(schema, args, records)?;
    let mut results = matched.results();
    let total = results.len();
    if let Some(limit) = args.limit {
        results.truncate(limit);
    }
    output.info(&format!("{} of {} records matched", total, records_len));

    output.print(&SearchResponse {
        query: args.query.clone(),
        normalized,
        total,
        results,
    })
}
