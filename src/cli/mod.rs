//! Command-line interface
//!
//! - init: create the corpus directory
//! - apply: apply a delta file
//! - evaluate / explain: match a profile (or household) file against the
//!   current corpus
//! - changes / status / verify: inspect the persisted corpus

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{evaluation_report, run, run_command, status_report, ProfileInput};
pub use errors::{CliError, CliResult};
pub use io::{read_json_file, write_error, write_response};
