//! # Fairness Policy
//!
//! Maps a user's track record to how long their holds last.
//!
//! ## Score → TTL
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Hold Duration by Trust                             │
//! │                                                                         │
//! │  score = successful_completions / total_attempts   (1.0 if no attempts)│
//! │                                                                         │
//! │   0.0            0.4                0.7                 1.0             │
//! │    ├──────────────┼──────────────────┼───────────────────┤              │
//! │    │   60s        │      180s        │       300s        │              │
//! │    │  low trust   │   medium trust   │    high trust     │              │
//! │                                                                         │
//! │  Users who abandon holds get short ones, so stock they sit on           │
//! │  returns to the pool sooner.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The policy is a pure function of the stats passed in. The engine
//! recomputes it on every reservation because stats change between calls.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::types::UserFairnessStats;

/// Thresholds and hold durations for the three trust tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairnessPolicy {
    /// Scores at or above this get the high-trust TTL.
    #[serde(default = "default_high_threshold")]
    pub high_trust_threshold: f64,

    /// Scores at or above this (and below high) get the medium-trust TTL.
    #[serde(default = "default_medium_threshold")]
    pub medium_trust_threshold: f64,

    #[serde(default = "default_high_ttl")]
    pub high_trust_ttl_secs: u64,

    #[serde(default = "default_medium_ttl")]
    pub medium_trust_ttl_secs: u64,

    #[serde(default = "default_low_ttl")]
    pub low_trust_ttl_secs: u64,
}

fn default_high_threshold() -> f64 {
    0.7
}

fn default_medium_threshold() -> f64 {
    0.4
}

fn default_high_ttl() -> u64 {
    300 // 5 minutes
}

fn default_medium_ttl() -> u64 {
    180 // 3 minutes
}

fn default_low_ttl() -> u64 {
    60 // 1 minute
}

impl Default for FairnessPolicy {
    fn default() -> Self {
        FairnessPolicy {
            high_trust_threshold: default_high_threshold(),
            medium_trust_threshold: default_medium_threshold(),
            high_trust_ttl_secs: default_high_ttl(),
            medium_trust_ttl_secs: default_medium_ttl(),
            low_trust_ttl_secs: default_low_ttl(),
        }
    }
}

impl FairnessPolicy {
    /// Hold duration in seconds for a raw score.
    pub fn ttl_secs_for_score(&self, score: f64) -> u64 {
        if score >= self.high_trust_threshold {
            self.high_trust_ttl_secs
        } else if score >= self.medium_trust_threshold {
            self.medium_trust_ttl_secs
        } else {
            self.low_trust_ttl_secs
        }
    }

    /// Hold duration in seconds for a user's current stats.
    pub fn ttl_secs(&self, stats: &UserFairnessStats) -> u64 {
        self.ttl_secs_for_score(stats.score())
    }

    /// Hold duration as a `chrono::Duration`, ready to add to a timestamp.
    pub fn ttl(&self, stats: &UserFairnessStats) -> Duration {
        // TTLs are validated to be small positive values; saturate anyway
        let secs = i64::try_from(self.ttl_secs(stats)).unwrap_or(i64::MAX);
        Duration::seconds(secs)
    }
}
