//! Observable events
//!
//! Every log line carries an `event` field with one of these names, so logs
//! can be filtered by what happened rather than by message text.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    ConfigLoaded,
    CorpusOpened,
    ChangeLogTornTail,
    ChangeLogCorruption,
    ChangeLogRollback,

    // Corpus writes
    DeltaApplied,
    DeltaRejected,
    DeltaNoop,
    DeltaRebased,
    TableWriteFailed,
    IntegrityMismatch,

    // Matching
    RecordSkipped,
    EvaluationComplete,

    // Sync
    SyncStart,
    SyncComplete,
    SyncRetry,
    SyncStale,
    SyncCancelled,
    CheckpointSaved,

    // Notification
    NotificationEmitted,
    NotificationFailed,
    LedgerSeeded,
    ReminderScan,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::CorpusOpened => "CORPUS_OPENED",
            Event::ChangeLogTornTail => "CHANGELOG_TORN_TAIL",
            Event::ChangeLogCorruption => "CHANGELOG_CORRUPTION",
            Event::ChangeLogRollback => "CHANGELOG_ROLLBACK",
            Event::DeltaApplied => "DELTA_APPLIED",
            Event::DeltaRejected => "DELTA_REJECTED",
            Event::DeltaNoop => "DELTA_NOOP",
            Event::DeltaRebased => "DELTA_REBASED",
            Event::TableWriteFailed => "TABLE_WRITE_FAILED",
            Event::IntegrityMismatch => "INTEGRITY_MISMATCH",
            Event::RecordSkipped => "RECORD_SKIPPED",
            Event::EvaluationComplete => "EVALUATION_COMPLETE",
            Event::SyncStart => "SYNC_START",
            Event::SyncComplete => "SYNC_COMPLETE",
            Event::SyncRetry => "SYNC_RETRY",
            Event::SyncStale => "SYNC_STALE",
            Event::SyncCancelled => "SYNC_CANCELLED",
            Event::CheckpointSaved => "CHECKPOINT_SAVED",
            Event::NotificationEmitted => "NOTIFICATION_EMITTED",
            Event::NotificationFailed => "NOTIFICATION_FAILED",
            Event::LedgerSeeded => "LEDGER_SEEDED",
            Event::ReminderScan => "REMINDER_SCAN",
        }
    }

    /// Events after which the process cannot serve.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::ChangeLogCorruption)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_screaming_snake() {
        for event in [Event::DeltaApplied, Event::SyncStale, Event::RecordSkipped] {
            let name = event.as_str();
            assert!(name.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_only_corruption_is_fatal() {
        assert!(Event::ChangeLogCorruption.is_fatal());
        assert!(!Event::SyncStale.is_fatal());
    }
}
