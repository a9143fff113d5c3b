//! Change-triggered re-evaluation
//!
//! - added/updated: re-run matching for users whose standing for the scheme
//!   or its category is known; false -> true emits `NewOpportunity`,
//!   true -> false emits `LostEligibility` only for interested users
//! - removed: interested users receive `SchemeWithdrawn`
//! - Users are processed in bounded batches with a yield between batches
//! - Events are handled strictly in the order received
//!
//! Delivery failures are logged and not retried here; the sink owns
//! durability. A failed profile lookup is logged for that user, whose ledger
//! entry is left as it was, and the rest of the event carries on.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{NaiveDate, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::collaborators::{NotificationSink, ProfileSource};
use super::config::NotifyConfig;
use super::interest::InterestRegistry;
use super::ledger::EligibilityLedger;
use super::request::{NotificationReason, NotificationRequest};
use crate::corpus::{ChangeEvent, ChangeKind, SchemeCorpus};
use crate::matching::{EvaluationContext, MatchingEngine};
use crate::observability::Event;

pub struct NotificationTrigger {
    corpus: Arc<SchemeCorpus>,
    engine: MatchingEngine,
    profiles: Arc<dyn ProfileSource>,
    sink: Arc<dyn NotificationSink>,
    interests: Arc<InterestRegistry>,
    ledger: Mutex<EligibilityLedger>,
    batch_size: usize,
    evaluation_date: Option<NaiveDate>,
}

impl NotificationTrigger {
    pub fn new(
        corpus: Arc<SchemeCorpus>,
        engine: MatchingEngine,
        profiles: Arc<dyn ProfileSource>,
        sink: Arc<dyn NotificationSink>,
        config: &NotifyConfig,
    ) -> Self {
        Self {
            corpus,
            engine,
            profiles,
            sink,
            interests: Arc::new(InterestRegistry::new()),
            ledger: Mutex::new(EligibilityLedger::new()),
            batch_size: config.batch_size.max(1),
            evaluation_date: None,
        }
    }

    /// Pins the evaluation date instead of using today's UTC date.
    pub fn with_evaluation_date(mut self, date: NaiveDate) -> Self {
        self.evaluation_date = Some(date);
        self
    }

    /// Shares an interest registry, e.g. with a `ReminderScanner`.
    pub fn with_interests(mut self, interests: Arc<InterestRegistry>) -> Self {
        self.interests = interests;
        self
    }

    pub fn interests(&self) -> &Arc<InterestRegistry> {
        &self.interests
    }

    pub fn record_interest(&self, user_id: &str, scheme_id: &str) {
        self.interests.record(user_id, scheme_id);
    }

    pub fn is_eligible(&self, user_id: &str, scheme_id: &str) -> bool {
        self.ledger().is_eligible(user_id, scheme_id)
    }

    fn as_of(&self) -> NaiveDate {
        self.evaluation_date
            .unwrap_or_else(|| Utc::now().date_naive())
    }

    fn ledger(&self) -> std::sync::MutexGuard<'_, EligibilityLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Evaluates every profile against the current snapshot to establish
    /// prior eligibility. Returns the number of profiles seen.
    pub async fn seed_from_profiles(&self) -> usize {
        let snapshot = self.corpus.current_snapshot();
        let ctx = EvaluationContext::on(self.as_of());
        let mut seen = 0;
        for profile in self.profiles.stream_profiles() {
            let evaluation = self.engine.evaluate_with(&profile, &snapshot, &ctx);
            self.ledger()
                .seed(&profile.user_id, evaluation.scheme_ids());
            seen += 1;
            if seen % self.batch_size == 0 {
                tokio::task::yield_now().await;
            }
        }
        info!(
            event = Event::LedgerSeeded.as_str(),
            profiles = seen,
            version = snapshot.version().value(),
            "eligibility ledger seeded"
        );
        seen
    }

    /// Consumes change events until the channel closes.
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<ChangeEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(&event).await;
        }
    }

    /// Handles one change event and returns the requests emitted for it.
    pub async fn handle_event(&self, event: &ChangeEvent) -> Vec<NotificationRequest> {
        match event.kind {
            ChangeKind::Removed => self.handle_removal(event).await,
            ChangeKind::Added | ChangeKind::Updated => self.handle_change(event).await,
        }
    }

    async fn handle_removal(&self, event: &ChangeEvent) -> Vec<NotificationRequest> {
        self.ledger().forget_scheme(&event.scheme_id);
        let mut emitted = Vec::new();
        for user_id in self.interests.take_scheme(&event.scheme_id) {
            let request = NotificationRequest::new(
                user_id,
                event.scheme_id.clone(),
                NotificationReason::SchemeWithdrawn,
            );
            self.emit(&request).await;
            emitted.push(request);
        }
        emitted
    }

    async fn handle_change(&self, event: &ChangeEvent) -> Vec<NotificationRequest> {
        let snapshot = self
            .corpus
            .snapshot_at(event.version)
            .unwrap_or_else(|| self.corpus.current_snapshot());
        let Some(scheme) = snapshot.get(&event.scheme_id).cloned() else {
            debug!(
                scheme_id = %event.scheme_id,
                version = event.version.value(),
                "scheme no longer present, skipping re-evaluation"
            );
            return Vec::new();
        };
        if snapshot.quarantine_reason(scheme.id()).is_some() {
            return Vec::new();
        }

        let as_of = self.as_of();
        let users = self.ledger().users_knowing(scheme.id(), scheme.category());
        let mut emitted = Vec::new();

        for chunk in users.chunks(self.batch_size) {
            for user_id in chunk {
                let profile = match self.profiles.get_profile(user_id).await {
                    Ok(Some(profile)) => profile,
                    Ok(None) => {
                        self.ledger().forget_user(user_id);
                        continue;
                    }
                    Err(e) => {
                        warn!(
                            event = Event::NotificationFailed.as_str(),
                            user_id = %user_id,
                            scheme_id = %event.scheme_id,
                            error = %e,
                            "profile lookup failed, user not re-evaluated"
                        );
                        continue;
                    }
                };
                let now = self.engine.evaluate_scheme(&profile, &scheme, as_of).eligible;
                let was = {
                    let mut ledger = self.ledger();
                    let was = ledger.is_eligible(user_id, scheme.id());
                    ledger.record(user_id, scheme.id(), scheme.category(), now);
                    was
                };

                let reason = match (was, now) {
                    (false, true) => Some(NotificationReason::NewOpportunity),
                    (true, false) if self.interests.is_interested(user_id, scheme.id()) => {
                        Some(NotificationReason::LostEligibility)
                    }
                    _ => None,
                };
                if let Some(reason) = reason {
                    let request = NotificationRequest::new(user_id.clone(), scheme.id(), reason);
                    self.emit(&request).await;
                    emitted.push(request);
                }
            }
            tokio::task::yield_now().await;
        }
        emitted
    }

    async fn emit(&self, request: &NotificationRequest) {
        match self.sink.send(request).await {
            Ok(()) => info!(
                event = Event::NotificationEmitted.as_str(),
                user_id = %request.user_id,
                scheme_id = %request.scheme_id,
                reason = request.reason.as_str(),
                "notification requested"
            ),
            Err(e) => warn!(
                event = Event::NotificationFailed.as_str(),
                user_id = %request.user_id,
                scheme_id = %request.scheme_id,
                error = %e,
                "notification delivery failed"
            ),
        }
    }
}
