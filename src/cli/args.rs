//! CLI argument definitions using clap
//!
//! Commands:
//! - yojana init
//! - yojana apply --delta <file>
//! - yojana evaluate --profile <file> [--category <c>] [--as-of <date>]
//! - yojana explain --profile <file> --scheme <id> [--as-of <date>]
//! - yojana changes --since <version>
//! - yojana status
//! - yojana verify
//!
//! Every command takes `--config <path>` (default `./yojana.json`).

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Yojana - eligibility matching over a versioned scheme corpus
#[derive(Parser, Debug)]
#[command(name = "yojana")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "./yojana.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the corpus directory under data_dir
    Init,

    /// Apply a delta file atomically
    Apply {
        /// JSON file with `{"ops": [...]}`
        #[arg(long)]
        delta: PathBuf,
    },

    /// Rank eligible schemes for a profile
    Evaluate {
        /// JSON profile file
        #[arg(long)]
        profile: PathBuf,

        /// Only consider schemes in this category
        #[arg(long)]
        category: Option<String>,

        /// Evaluation date (YYYY-MM-DD), defaults to today (UTC)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Explain one scheme's outcome for a profile
    Explain {
        #[arg(long)]
        profile: PathBuf,

        #[arg(long)]
        scheme: String,

        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Print the cumulative delta since a version
    Changes {
        #[arg(long)]
        since: u64,
    },

    /// Print corpus version and health
    Status,

    /// Replay the change log and report quarantined records
    Verify,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
