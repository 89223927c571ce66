//! Merge command implementation.

use crate::cli::args::MergeArgs;
use crate::cli::output::Output;
use crate::error::Result;
use crate::search::{encode_statements, merge, parse_search, serialize};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct MergeResponse {
    pub query: String,
    pub form: String,
    pub merged: String,
    pub normalized: String,
}

pub fn run(args: &MergeArgs, output: &Output) -> Result<()> {
    let query_string = parse_search(&args.query)?;
    let form = parse_search(&args.form)?;
    let merged = merge(&query_string, &form);

    let text = if args.encode {
        encode_statements(&merged)
    } else {
        serialize(&merged)
    };

    output.print(&MergeResponse {
        query: args.query.clone(),
        form: args.form.clone(),
        merged: text,
        normalized: merged.to_normalized_string(),
    })
}
