//! Scheduled deadline reminders
//!
//! On each scheduled tick, every interested user of an active scheme whose
//! deadline falls within the threshold receives one `DeadlineReminder`.
//! A reminder is sent at most once per (user, scheme, deadline); moving the
//! deadline re-arms it. Keys for deadlines already passed are dropped.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use croner::Cron;
use tracing::{info, warn};

use super::collaborators::NotificationSink;
use super::config::{parse_schedule, NotifyConfig};
use super::errors::NotifyResult;
use super::interest::InterestRegistry;
use super::request::{NotificationReason, NotificationRequest};
use crate::corpus::{CorpusSnapshot, SchemeCorpus};
use crate::observability::Event;
use crate::sync::CancelSignal;

type SentKey = (String, String, NaiveDate);

pub struct ReminderScanner {
    schedule: Cron,
    threshold_days: u32,
    interests: Arc<InterestRegistry>,
    sink: Arc<dyn NotificationSink>,
    sent: Mutex<BTreeSet<SentKey>>,
}

impl ReminderScanner {
    pub fn new(
        config: &NotifyConfig,
        interests: Arc<InterestRegistry>,
        sink: Arc<dyn NotificationSink>,
    ) -> NotifyResult<Self> {
        Ok(Self {
            schedule: parse_schedule(&config.reminder_schedule)?,
            threshold_days: config.reminder_threshold_days,
            interests,
            sink,
            sent: Mutex::new(BTreeSet::new()),
        })
    }

    /// Next scheduled tick strictly after `now`.
    pub fn next_run_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.find_next_occurrence(&now, false).ok()
    }

    /// Sends reminders for deadlines in `[today, today + threshold]`.
    pub async fn scan(
        &self,
        snapshot: &CorpusSnapshot,
        today: NaiveDate,
    ) -> Vec<NotificationRequest> {
        self.sent().retain(|(_, _, deadline)| *deadline >= today);

        let horizon = today + Duration::days(i64::from(self.threshold_days));
        let mut due = Vec::new();
        for scheme in snapshot.iter() {
            if !scheme.is_active() || snapshot.quarantine_reason(scheme.id()).is_some() {
                continue;
            }
            let Some(deadline) = scheme.deadline() else {
                continue;
            };
            if deadline < today || deadline > horizon {
                continue;
            }
            for user_id in self.interests.users_for(scheme.id()) {
                due.push((user_id, scheme.id().to_string(), deadline));
            }
        }

        let mut emitted = Vec::new();
        for key in due {
            if self.sent().contains(&key) {
                continue;
            }
            let request = NotificationRequest::new(
                key.0.clone(),
                key.1.clone(),
                NotificationReason::DeadlineReminder,
            );
            match self.sink.send(&request).await {
                Ok(()) => {
                    self.sent().insert(key);
                    emitted.push(request);
                }
                Err(e) => warn!(
                    event = Event::NotificationFailed.as_str(),
                    user_id = %request.user_id,
                    scheme_id = %request.scheme_id,
                    error = %e,
                    "deadline reminder delivery failed"
                ),
            }
        }

        info!(
            event = Event::ReminderScan.as_str(),
            version = snapshot.version().value(),
            reminders = emitted.len(),
            %today,
            "deadline reminder scan complete"
        );
        emitted
    }

    /// Sleeps until each scheduled tick and scans the current snapshot,
    /// until `cancel` is set.
    pub async fn run(&self, corpus: &SchemeCorpus, cancel: &CancelSignal) {
        while !cancel.is_cancelled() {
            let now = Utc::now();
            let Some(next) = self.next_run_after(now) else {
                warn!("reminder schedule has no further occurrences");
                return;
            };
            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;
            if cancel.is_cancelled() {
                return;
            }
            let snapshot = corpus.current_snapshot();
            self.scan(&snapshot, next.date_naive()).await;
        }
    }

    fn sent(&self) -> std::sync::MutexGuard<'_, BTreeSet<SentKey>> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Delta;
    use crate::scheme::{Scheme, SchemeContent, SchemeLevel};
    use chrono::TimeZone;

    struct NullSink;

    #[async_trait::async_trait]
    impl NotificationSink for NullSink {
        async fn send(&self, _request: &NotificationRequest) -> NotifyResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_next_run_follows_schedule() {
        let scanner = ReminderScanner::new(
            &NotifyConfig::default(),
            Arc::new(InterestRegistry::new()),
            Arc::new(NullSink),
        )
        .unwrap();
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let next = scanner.next_run_after(now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 2, 9, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_passed_deadlines_are_forgotten() {
        let deadline = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        let corpus = SchemeCorpus::in_memory(4);
        corpus
            .apply_delta(&Delta::new().add(Scheme::new(
                "S1",
                SchemeContent::new("scholarship", SchemeLevel::Central).with_deadline(deadline),
            )))
            .unwrap();
        let interests = Arc::new(InterestRegistry::new());
        interests.record("u1", "S1");
        let scanner =
            ReminderScanner::new(&NotifyConfig::default(), interests, Arc::new(NullSink)).unwrap();

        let snapshot = corpus.current_snapshot();
        let sent = scanner.scan(&snapshot, deadline - Duration::days(2)).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(scanner.sent().len(), 1);

        let after = scanner.scan(&snapshot, deadline + Duration::days(1)).await;
        assert!(after.is_empty());
        assert!(scanner.sent().is_empty());
    }
}
