//! Notification trigger
//!
//! - Subscribes to corpus change events and re-evaluates affected users
//! - Emits `NotificationRequest`s to a `NotificationSink`; delivery and
//!   channel choice belong to the sink
//! - Scheduled deadline reminders for interested users

mod collaborators;
mod config;
mod errors;
mod interest;
mod ledger;
mod reminder;
mod request;
mod trigger;

pub use collaborators::{NotificationSink, ProfileSource};
pub use config::NotifyConfig;
pub use errors::{NotifyError, NotifyResult};
pub use interest::InterestRegistry;
pub use ledger::EligibilityLedger;
pub use reminder::ReminderScanner;
pub use request::{NotificationReason, NotificationRequest};
pub use trigger::NotificationTrigger;
