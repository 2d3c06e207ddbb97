//! Command-line arguments for the `newsrank` binary.
//!
//! Unset flags fall back to `config/newsrank.toml`, then to built-in
//! defaults (6 days, 10 articles, short query terms).

use std::path::PathBuf;

use clap::Parser;

use crate::config::QueryTermSet;
use crate::pipeline::RunOptions;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Number of days back to search
    #[arg(long)]
    pub days: Option<i64>,

    /// Number of top articles to keep in the digest
    #[arg(long)]
    pub count: Option<usize>,

    /// Query term set to fetch with
    #[arg(long, value_enum)]
    pub query_terms: Option<QueryTermSet>,

    /// Path to the TOML config (overrides NEWSRANK_CONFIG_PATH)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Build and export the digest but do not send it
    #[arg(long)]
    pub dry_run: bool,

    /// Skip AI summaries
    #[arg(long)]
    pub no_summary: bool,
}

impl Cli {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            days: self.days,
            count: self.count,
            query_terms: self.query_terms,
            dry_run: self.dry_run,
            no_summary: self.no_summary,
        }
    }
}
