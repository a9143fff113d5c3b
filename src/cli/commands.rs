//! CLI command implementations
//!
//! Each command loads the config, opens the corpus from `data_dir` (which
//! replays the change log), does one thing and prints one JSON object.
//! `evaluate` and `status` build their object in a separate `*_report`
//! function so it can be inspected without capturing stdout.

use std::fs;
use std::path::Path;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::Config;
use crate::corpus::{CorpusVersion, Delta, SchemeCorpus};
use crate::matching::{explain_eligibility, EvaluationContext, MatchCache, MatchingEngine};
use crate::observability::{init_logging, Event};
use crate::profile::Profile;
use crate::sync::CheckpointFile;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_json_file, write_error, write_response};

/// Main CLI entry point.
///
/// Parses arguments, runs the command and prints the error object on
/// failure. The error is still returned so `main` can exit non-zero.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let result = run_command(&cli.config, cli.command);
    if let Err(e) = &result {
        write_error(e.code(), &e.to_string())?;
    }
    result
}

pub fn run_command(config_path: &Path, cmd: Command) -> CliResult<()> {
    let config = Config::load(config_path)?;
    init_logging(&config.logging);
    tracing::debug!(
        event = Event::ConfigLoaded.as_str(),
        path = %config_path.display(),
        "configuration loaded"
    );

    match cmd {
        Command::Init => init(&config),
        Command::Apply { delta } => apply(&config, &delta),
        Command::Evaluate {
            profile,
            category,
            as_of,
        } => evaluate(&config, &profile, category, as_of),
        Command::Explain {
            profile,
            scheme,
            as_of,
        } => explain(&config, &profile, &scheme, as_of),
        Command::Changes { since } => changes(&config, since),
        Command::Status => status(&config),
        Command::Verify => verify(&config),
    }
}

/// Creates `<data_dir>/corpus`. Writes no change log records.
pub fn init(config: &Config) -> CliResult<()> {
    let corpus_dir = corpus_dir(config);
    if corpus_dir.exists() {
        return Err(CliError::AlreadyInitialized);
    }
    fs::create_dir_all(&corpus_dir).map_err(|e| {
        CliError::Config(format!("Failed to create directory {:?}: {}", corpus_dir, e))
    })?;
    write_response(&json!({"initialized": true}))
}

pub fn apply(config: &Config, delta_path: &Path) -> CliResult<()> {
    let delta: Delta = read_json_file(delta_path)?;
    let corpus = open_corpus(config)?;
    let applied = corpus.apply_delta(&delta)?;
    write_response(&json!({
        "version": applied.version,
        "events": applied.events,
    }))
}

/// A profile file holds one profile, or an array of them (a household).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProfileInput {
    One(Profile),
    Many(Vec<Profile>),
}

pub fn evaluate(
    config: &Config,
    profile_path: &Path,
    category: Option<String>,
    as_of: Option<NaiveDate>,
) -> CliResult<()> {
    let input: ProfileInput = read_json_file(profile_path)?;
    let mut ctx = as_of.map(EvaluationContext::on).unwrap_or_else(EvaluationContext::today);
    if let Some(category) = category {
        ctx = ctx.with_category(category);
    }
    write_response(&evaluation_report(config, &input, &ctx)?)
}

/// Evaluates every profile in `input` against the current snapshot.
///
/// Members with identical attributes share one evaluation through the
/// match cache; each result is still labelled with its own user id.
pub fn evaluation_report(
    config: &Config,
    input: &ProfileInput,
    ctx: &EvaluationContext,
) -> CliResult<Value> {
    let corpus = open_corpus(config)?;
    let snapshot = corpus.current_snapshot();
    let engine = MatchingEngine::new(config.scoring.clone());
    match input {
        ProfileInput::One(profile) => {
            Ok(serde_json::to_value(engine.evaluate_with(profile, &snapshot, ctx))?)
        }
        ProfileInput::Many(profiles) => {
            let cache = MatchCache::new(profiles.len());
            let mut members = Vec::with_capacity(profiles.len());
            for profile in profiles {
                let evaluation = cache.get_or_evaluate(&engine, profile, &snapshot, ctx);
                members.push(json!({
                    "userId": profile.user_id,
                    "evaluation": serde_json::to_value(evaluation.as_ref())?,
                }));
            }
            let stats = cache.stats();
            Ok(json!({
                "version": snapshot.version(),
                "members": members,
                "distinctEvaluations": stats.misses,
            }))
        }
    }
}

pub fn explain(
    config: &Config,
    profile_path: &Path,
    scheme_id: &str,
    as_of: Option<NaiveDate>,
) -> CliResult<()> {
    let profile: Profile = read_json_file(profile_path)?;
    let corpus = open_corpus(config)?;
    let snapshot = corpus.current_snapshot();
    let scheme = snapshot
        .get(scheme_id)
        .ok_or_else(|| CliError::SchemeNotFound(scheme_id.to_string()))?;
    let as_of = as_of.unwrap_or_else(|| EvaluationContext::today().as_of);
    write_response(&explain_eligibility(&profile, scheme, as_of))
}

pub fn changes(config: &Config, since: u64) -> CliResult<()> {
    let corpus = open_corpus(config)?;
    let delta = corpus.get_since(CorpusVersion::new(since))?;
    write_response(&json!({
        "since": since,
        "version": corpus.version(),
        "ops": delta.ops,
    }))
}

pub fn status(config: &Config) -> CliResult<()> {
    write_response(&status_report(config)?)
}

/// Corpus health plus resumable sync progress and the next reminder tick.
pub fn status_report(config: &Config) -> CliResult<Value> {
    let corpus = open_corpus(config)?;
    let mut report = serde_json::to_value(corpus.status())?;

    let checkpointed = match config.checkpoint_path() {
        Some(path) => CheckpointFile::new(path)
            .load()
            .map_err(|e| CliError::Io(e.to_string()))?
            .len(),
        None => 0,
    };
    report["checkpointedRecords"] = json!(checkpointed);

    let next_reminder = config
        .notify
        .next_reminder_after(Utc::now())
        .map_err(|e| CliError::Config(e.to_string()))?;
    report["nextReminderAt"] = json!(next_reminder);
    Ok(report)
}

/// Opening the corpus replays and checksums the whole change log; a
/// corrupt log fails here with `CORPUS_LOG_CORRUPTION`.
pub fn verify(config: &Config) -> CliResult<()> {
    let corpus = open_corpus(config)?;
    let snapshot = corpus.current_snapshot();
    let quarantined: Vec<_> = snapshot
        .quarantined()
        .map(|(id, reason)| json!({"schemeId": id, "reason": reason}))
        .collect();
    write_response(&json!({
        "version": snapshot.version(),
        "schemeCount": snapshot.len(),
        "quarantined": quarantined,
    }))
}

fn corpus_dir(config: &Config) -> std::path::PathBuf {
    config.data_path().join("corpus")
}

fn open_corpus(config: &Config) -> CliResult<SchemeCorpus> {
    if !corpus_dir(config).exists() {
        return Err(CliError::NotInitialized);
    }
    Ok(SchemeCorpus::open(config.data_path(), config.history_retention)?)
}
