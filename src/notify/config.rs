//! `notify` section of the config file

use chrono::{DateTime, Utc};
use croner::Cron;
use serde::{Deserialize, Serialize};

use super::errors::{NotifyError, NotifyResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Profiles re-evaluated before yielding to other tasks.
    pub batch_size: usize,
    /// Deadlines this many days out (or fewer) trigger reminders.
    pub reminder_threshold_days: u32,
    /// Cron expression for the reminder scan.
    pub reminder_schedule: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            reminder_threshold_days: 7,
            reminder_schedule: "0 9 * * *".to_string(),
        }
    }
}

impl NotifyConfig {
    pub fn validate(&self) -> NotifyResult<()> {
        if self.batch_size == 0 {
            return Err(NotifyError::Config(
                "notify.batch_size must be at least 1".to_string(),
            ));
        }
        parse_schedule(&self.reminder_schedule).map(|_| ())
    }

    /// Next reminder tick strictly after `now`.
    pub fn next_reminder_after(&self, now: DateTime<Utc>) -> NotifyResult<Option<DateTime<Utc>>> {
        let schedule = parse_schedule(&self.reminder_schedule)?;
        Ok(schedule.find_next_occurrence(&now, false).ok())
    }
}

pub(crate) fn parse_schedule(pattern: &str) -> NotifyResult<Cron> {
    Cron::new(pattern)
        .parse()
        .map_err(|e| NotifyError::InvalidSchedule {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(NotifyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_bad_schedule_rejected() {
        let config = NotifyConfig {
            reminder_schedule: "every morning".to_string(),
            ..NotifyConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(NotifyError::InvalidSchedule { .. })
        ));
    }

    #[test]
    fn test_zero_batch_rejected() {
        let config = NotifyConfig {
            batch_size: 0,
            ..NotifyConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
