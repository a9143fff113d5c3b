//! Notification requests handed to the delivery collaborator

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationReason {
    /// Eligibility flipped from false to true.
    NewOpportunity,
    /// Eligibility flipped from true to false for an interested user.
    LostEligibility,
    /// A scheme an interested user follows was removed.
    SchemeWithdrawn,
    /// A followed scheme's deadline is within the reminder threshold.
    DeadlineReminder,
}

impl NotificationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationReason::NewOpportunity => "new_opportunity",
            NotificationReason::LostEligibility => "lost_eligibility",
            NotificationReason::SchemeWithdrawn => "scheme_withdrawn",
            NotificationReason::DeadlineReminder => "deadline_reminder",
        }
    }
}

impl fmt::Display for NotificationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    /// Unique per request so the collaborator can de-duplicate retries.
    pub request_id: Uuid,
    pub user_id: String,
    pub scheme_id: String,
    pub reason: NotificationReason,
    pub created_at: DateTime<Utc>,
}

impl NotificationRequest {
    pub fn new(
        user_id: impl Into<String>,
        scheme_id: impl Into<String>,
        reason: NotificationReason,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user_id: user_id.into(),
            scheme_id: scheme_id.into(),
            reason,
            created_at: Utc::now(),
        }
    }
}
