//! yojana CLI entry point
//!
//! Argument parsing, config loading and dispatch all live in `cli::run`,
//! which also prints the JSON error object. This only sets the exit code.

use yojana::cli;

fn main() {
    if cli::run().is_err() {
        std::process::exit(1);
    }
}
