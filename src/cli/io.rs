//! JSON I/O for the CLI
//!
//! - Input: JSON files named on the command line
//! - Output: one JSON object per invocation on stdout

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::errors::{CliError, CliResult};

/// Reads and parses a JSON input file.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let content = fs::read_to_string(path).map_err(|e| CliError::input(path, e))?;
    serde_json::from_str(&content).map_err(|e| CliError::input(path, e))
}

/// Writes `{"status": "ok", "data": ...}`.
pub fn write_response<T: Serialize>(data: &T) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data,
    });
    write_line(&response)
}

/// Writes `{"status": "error", "code": ..., "message": ...}`.
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message,
    });
    write_line(&response)
}

fn write_line(value: &serde_json::Value) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
