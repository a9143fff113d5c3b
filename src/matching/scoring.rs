//! Relevance scoring
//!
//! `score = mandatory_match * mandatory criteria met
//!        + informative_match * informative criteria met
//!        + benefit_tier * tier(level)
//!        + freshness * freshness(deadline)`
//!
//! Tier values are central 3, state 2, district 1. Freshness is
//! `1 - days_left / freshness_horizon_days` clamped to `[0, 1]` for schemes
//! with an open deadline and 0 for schemes without one.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::scheme::SchemeLevel;

/// Named weight set for relevance scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub mandatory_match: f64,
    pub informative_match: f64,
    pub benefit_tier: f64,
    pub freshness: f64,
    pub freshness_horizon_days: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            mandatory_match: 10.0,
            informative_match: 2.0,
            benefit_tier: 1.0,
            freshness: 5.0,
            freshness_horizon_days: 90,
        }
    }
}

/// Counts that feed one score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInputs {
    pub mandatory_met: usize,
    pub informative_met: usize,
    pub level: SchemeLevel,
    pub deadline: Option<NaiveDate>,
    pub as_of: NaiveDate,
}

impl ScoringWeights {
    pub fn validate(&self) -> Result<(), String> {
        let weights = [
            ("mandatory_match", self.mandatory_match),
            ("informative_match", self.informative_match),
            ("benefit_tier", self.benefit_tier),
            ("freshness", self.freshness),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(format!(
                    "scoring.{} must be a finite, non-negative number (got {})",
                    name, value
                ));
            }
        }
        if self.freshness_horizon_days == 0 {
            return Err("scoring.freshness_horizon_days must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn tier_value(level: SchemeLevel) -> f64 {
        match level {
            SchemeLevel::Central => 3.0,
            SchemeLevel::State => 2.0,
            SchemeLevel::District => 1.0,
        }
    }

    /// Deadline proximity in `[0, 1]`; nearer open deadlines score higher.
    pub fn freshness_term(&self, deadline: Option<NaiveDate>, as_of: NaiveDate) -> f64 {
        let Some(deadline) = deadline else {
            return 0.0;
        };
        let days_left = (deadline - as_of).num_days();
        if days_left < 0 || self.freshness_horizon_days == 0 {
            return 0.0;
        }
        let horizon = f64::from(self.freshness_horizon_days);
        (1.0 - days_left as f64 / horizon).clamp(0.0, 1.0)
    }

    pub fn score(&self, inputs: &ScoreInputs) -> f64 {
        self.mandatory_match * inputs.mandatory_met as f64
            + self.informative_match * inputs.informative_met as f64
            + self.benefit_tier * Self::tier_value(inputs.level)
            + self.freshness * self.freshness_term(inputs.deadline, inputs.as_of)
    }
}
