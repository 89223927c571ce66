//! termsift CLI entry point.

use clap::Parser;
use std::process::ExitCode;
use termsift::cli::args::{Cli, Commands};
use termsift::cli::output::Output;
use termsift::cli::{merge, normalize, parse, search};
use termsift::config::SchemaConfig;
use termsift::error::{ExitCode as QueryExitCode, QueryError};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("termsift={}", cli.log_level()))),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(&cli) {
        Ok(code) => ExitCode::from(code.code() as u8),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {}", e);
            }
            ExitCode::from(e.exit_code().code() as u8)
        }
    }
}

fn run(cli: &Cli) -> Result<QueryExitCode, QueryError> {
    let output = Output::new(cli.output_format(), cli.quiet);

    match &cli.command {
        Commands::Parse(args) => {
            let schema = SchemaConfig::load(cli.schema.as_deref())?;
            parse::run(&schema, args, &output)?;
        }
        Commands::Normalize(args) => {
            let schema = SchemaConfig::load(cli.schema.as_deref())?;
            normalize::run(&schema, args, &output)?;
        }
        Commands::Merge(args) => {
            merge::run(args, &output)?;
        }
        Commands::Search(args) => {
            let schema = SchemaConfig::load(cli.schema.as_deref())?;
            search::run(&schema, args, &output)?;
        }
    }

    Ok(QueryExitCode::Success)
}
