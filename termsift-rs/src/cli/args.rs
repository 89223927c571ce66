//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "termsift")]
#[command(author, version, about = "Parse, normalize and run search queries", long_about = None)]
pub struct Cli {
    /// Schema file (defaults to <config dir>/termsift/schema.toml)
    #[arg(long, global = true)]
    pub schema: Option<PathBuf>,

    /// Output as JSON (default)
    #[arg(long, global = true, conflicts_with_all = ["yaml", "toml"])]
    pub json: bool,

    /// Output as YAML
    #[arg(long, global = true, conflicts_with_all = ["json", "toml"])]
    pub yaml: bool,

    /// Output as TOML
    #[arg(long, global = true, conflicts_with_all = ["json", "yaml"])]
    pub toml: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (can be repeated)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_format(&self) -> OutputFormat {
        if self.yaml {
            OutputFormat::Yaml
        } else if self.toml {
            OutputFormat::Toml
        } else {
            OutputFormat::Json
        }
    }

    /// Log filter directive for the verbosity flags.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Toml,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a query and print its syntax tree
    Parse(ParseArgs),

    /// Print the canonical form of a term query
    Normalize(NormalizeArgs),

    /// Merge form statements into query-string statements
    Merge(MergeArgs),

    /// Run a query against a JSON array of records
    Search(SearchArgs),
}

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Query text
    pub query: String,

    /// Use the term grammar instead of the statement grammar
    #[arg(long)]
    pub terms: bool,
}

#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Query text
    pub query: String,

    /// Print only the normalized text
    #[arg(long)]
    pub raw: bool,
}

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Statements persisted in the query string
    #[arg(long, default_value = "")]
    pub query: String,

    /// Statements submitted by the form
    #[arg(long, default_value = "")]
    pub form: String,

    /// Percent-encode the merged text
    #[arg(long)]
    pub encode: bool,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Query text
    pub query: String,

    /// JSON file holding an array of records
    #[arg(long)]
    pub data: PathBuf,

    /// Use the term grammar instead of the statement grammar
    #[arg(long)]
    pub terms: bool,

    /// Maximum number of records to print
    #[arg(long)]
    pub limit: Option<usize>,
}
