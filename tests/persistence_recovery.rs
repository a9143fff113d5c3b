//! Persisted Corpus Recovery Tests
//!
//! - Every acknowledged version survives reopen
//! - Log frames newer than the record table are replayed
//! - A torn trailing frame is discarded, a checksum failure is fatal
//! - A stored record whose hash no longer matches is quarantined

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde_json::Value;
use tempfile::TempDir;
use yojana::corpus::{CorpusErrorCode, CorpusVersion, Delta, SchemeCorpus};
use yojana::matching::{EvaluationContext, MatchingEngine};
use yojana::profile::Profile;
use yojana::scheme::{Scheme, SchemeContent, SchemeLevel};

// =============================================================================
// Test Utilities
// =============================================================================

fn scheme(id: &str) -> Scheme {
    Scheme::new(
        id,
        SchemeContent::new("health", SchemeLevel::Central).with_benefits("free checkup"),
    )
}

fn log_path(dir: &Path) -> PathBuf {
    dir.join("corpus").join("changes.log")
}

fn table_path(dir: &Path) -> PathBuf {
    dir.join("corpus").join("records.json")
}

fn open(dir: &Path) -> SchemeCorpus {
    SchemeCorpus::open(dir, 16).expect("open corpus")
}

// =============================================================================
// Durability
// =============================================================================

#[test]
fn test_fresh_directory_opens_empty() {
    let tmp = TempDir::new().expect("temp dir");
    let corpus = open(tmp.path());
    assert_eq!(corpus.version(), CorpusVersion::ZERO);
    assert!(corpus.current_snapshot().is_empty());
}

#[test]
fn test_applied_versions_survive_reopen() {
    let tmp = TempDir::new().expect("temp dir");
    {
        let corpus = open(tmp.path());
        corpus.apply_delta(&Delta::new().add(scheme("A")).add(scheme("B"))).expect("v1");
        corpus.apply_delta(&Delta::new().remove("A")).expect("v2");
        corpus.apply_delta(&Delta::new().add(scheme("C"))).expect("v3");
    }

    let reopened = open(tmp.path());
    let snapshot = reopened.current_snapshot();
    assert_eq!(snapshot.version(), CorpusVersion::new(3));
    assert_eq!(snapshot.ids().collect::<Vec<_>>(), vec!["B", "C"]);
    assert_eq!(snapshot.content_hash("B"), Some(scheme("B").content_hash()));

    // Versions keep counting from where they left off.
    let applied = reopened.apply_delta(&Delta::new().add(scheme("D"))).expect("v4");
    assert_eq!(applied.version, CorpusVersion::new(4));
}

#[test]
fn test_log_replayed_over_stale_table() {
    let tmp = TempDir::new().expect("temp dir");
    let saved_table = tmp.path().join("records-v1.json");
    {
        let corpus = open(tmp.path());
        corpus.apply_delta(&Delta::new().add(scheme("A"))).expect("v1");
        fs::copy(table_path(tmp.path()), &saved_table).expect("save v1 table");
        corpus.apply_delta(&Delta::new().add(scheme("B"))).expect("v2");
        corpus.apply_delta(&Delta::new().remove("A")).expect("v3");
    }
    // Simulate a crash between the log append and the table rewrite.
    fs::copy(&saved_table, table_path(tmp.path())).expect("restore v1 table");

    let reopened = open(tmp.path());
    let snapshot = reopened.current_snapshot();
    assert_eq!(snapshot.version(), CorpusVersion::new(3));
    assert_eq!(snapshot.ids().collect::<Vec<_>>(), vec!["B"]);

    let table: Value =
        serde_json::from_slice(&fs::read(table_path(tmp.path())).expect("read table"))
            .expect("table json");
    assert_eq!(table["version"], 3);
}

// =============================================================================
// Log damage
// =============================================================================

#[test]
fn test_torn_tail_is_discarded() {
    let tmp = TempDir::new().expect("temp dir");
    {
        let corpus = open(tmp.path());
        corpus.apply_delta(&Delta::new().add(scheme("A"))).expect("v1");
    }
    {
        // A frame header promising 200 bytes, cut off after three.
        let mut log = OpenOptions::new()
            .append(true)
            .open(log_path(tmp.path()))
            .expect("open log");
        log.write_all(&[200, 0, 0, 0, 1, 2, 3]).expect("write partial frame");
    }

    let reopened = open(tmp.path());
    assert_eq!(reopened.version(), CorpusVersion::new(1));
    reopened.apply_delta(&Delta::new().add(scheme("B"))).expect("v2");
    drop(reopened);

    let again = open(tmp.path());
    assert_eq!(again.version(), CorpusVersion::new(2));
    assert_eq!(again.current_snapshot().len(), 2);
}

#[test]
fn test_checksum_failure_is_corruption() {
    let tmp = TempDir::new().expect("temp dir");
    {
        let corpus = open(tmp.path());
        corpus.apply_delta(&Delta::new().add(scheme("A"))).expect("v1");
        corpus.apply_delta(&Delta::new().add(scheme("B"))).expect("v2");
    }
    let path = log_path(tmp.path());
    let mut bytes = fs::read(&path).expect("read log");
    // Inside the first frame's payload.
    bytes[20] ^= 0x01;
    fs::write(&path, bytes).expect("write log");

    let err = match SchemeCorpus::open(tmp.path(), 16) {
        Ok(_) => panic!("corrupted log must not open"),
        Err(e) => e,
    };
    assert_eq!(err.code(), CorpusErrorCode::LogCorruption);
    assert_eq!(err.code().code(), "CORPUS_LOG_CORRUPTION");
}

#[test]
fn test_damaged_length_before_acknowledged_frames_is_corruption() {
    let tmp = TempDir::new().expect("temp dir");
    {
        let corpus = open(tmp.path());
        corpus.apply_delta(&Delta::new().add(scheme("A"))).expect("v1");
        corpus.apply_delta(&Delta::new().add(scheme("B"))).expect("v2");
        corpus.apply_delta(&Delta::new().add(scheme("C"))).expect("v3");
    }
    fs::remove_file(table_path(tmp.path())).expect("remove table");

    let path = log_path(tmp.path());
    let mut bytes = fs::read(&path).expect("read log");
    let first_len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let second = 4 + first_len + 4;
    bytes[second..second + 4].copy_from_slice(&0x00FF_FFFFu32.to_le_bytes());
    fs::write(&path, &bytes).expect("write log");
    let len_before = bytes.len() as u64;

    let err = match SchemeCorpus::open(tmp.path(), 16) {
        Ok(corpus) => panic!("opened at {:?} with acknowledged versions lost", corpus.version()),
        Err(e) => e,
    };
    assert_eq!(err.code(), CorpusErrorCode::LogCorruption);
    // Nothing was truncated away.
    assert_eq!(fs::metadata(&path).expect("log metadata").len(), len_before);
}

// =============================================================================
// Quarantine
// =============================================================================

#[test]
fn test_tampered_stored_record_is_quarantined() {
    let tmp = TempDir::new().expect("temp dir");
    {
        let corpus = open(tmp.path());
        corpus
            .apply_delta(&Delta::new().add(scheme("GOOD")).add(scheme("EDITED")))
            .expect("v1");
    }

    // Edit the record without updating its stored hash.
    let path = table_path(tmp.path());
    let mut table: Value =
        serde_json::from_slice(&fs::read(&path).expect("read table")).expect("table json");
    table["records"]["EDITED"]["scheme"]["benefits"] = Value::from("edited by hand");
    fs::write(&path, serde_json::to_vec(&table).expect("encode")).expect("write table");

    let reopened = open(tmp.path());
    let snapshot = reopened.current_snapshot();
    assert!(snapshot.quarantine_reason("EDITED").is_some());
    assert!(snapshot.quarantine_reason("GOOD").is_none());
    assert_eq!(reopened.status().quarantined_count, 1);

    let eval = MatchingEngine::default().evaluate_with(
        &Profile::new("u1", 40, "Odisha"),
        &snapshot,
        &EvaluationContext::on(NaiveDate::from_ymd_opt(2025, 1, 1).expect("date")),
    );
    assert_eq!(eval.scheme_ids(), vec!["GOOD"]);
    assert_eq!(eval.skipped.len(), 1);
    assert_eq!(eval.skipped[0].scheme_id, "EDITED");
}
