//! # Fairness Tracker
//!
//! Per-user attempt/confirmation counters and the TTL they imply.
//!
//! The tracker is the only writer of [`UserFairnessStats`]. Its own lock
//! makes each counter update atomic, independent of any SKU lock, since one
//! user's reservations span many SKUs.

use std::collections::HashMap;

use chrono::Duration;
use stockhold_core::{FairnessPolicy, UserFairnessStats};
use tokio::sync::RwLock;

/// Tracks per-user fairness stats and applies a [`FairnessPolicy`].
#[derive(Debug, Default)]
pub struct FairnessTracker {
    policy: FairnessPolicy,
    stats: RwLock<HashMap<String, UserFairnessStats>>,
}

impl FairnessTracker {
    /// Creates a tracker with the given policy.
    pub fn new(policy: FairnessPolicy) -> Self {
        FairnessTracker {
            policy,
            stats: RwLock::new(HashMap::new()),
        }
    }

    /// The policy used to size holds.
    pub fn policy(&self) -> &FairnessPolicy {
        &self.policy
    }

    /// Counts one reservation attempt.
    ///
    /// Returns the stats as they were *before* this attempt, which is what
    /// the hold for this attempt is sized from. A first-time user therefore
    /// gets the full-trust TTL.
    pub async fn record_attempt(&self, user_id: &str) -> UserFairnessStats {
        let mut stats = self.stats.write().await;
        let entry = stats.entry(user_id.to_string()).or_default();
        let prior = *entry;
        entry.total_attempts += 1;
        prior
    }

    /// Counts one confirmed reservation.
    pub async fn record_success(&self, user_id: &str) {
        self.stats
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .successful_completions += 1;
    }

    /// Current stats (zeroes for an unknown user).
    pub async fn stats(&self, user_id: &str) -> UserFairnessStats {
        self.stats
            .read()
            .await
            .get(user_id)
            .copied()
            .unwrap_or_default()
    }

    /// Hold duration in seconds from the user's current stats.
    pub async fn ttl_secs(&self, user_id: &str) -> u64 {
        self.policy.ttl_secs(&self.stats(user_id).await)
    }

    /// Hold duration from the user's current stats.
    pub async fn ttl(&self, user_id: &str) -> Duration {
        self.policy.ttl(&self.stats(user_id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_user_has_full_trust() {
        let tracker = FairnessTracker::default();
        assert_eq!(tracker.stats("new").await.score(), 1.0);
        assert_eq!(tracker.ttl_secs("new").await, 300);
    }

    #[tokio::test]
    async fn test_record_attempt_returns_prior_stats() {
        let tracker = FairnessTracker::default();

        let prior = tracker.record_attempt("u").await;
        assert_eq!(prior.total_attempts, 0);

        let prior = tracker.record_attempt("u").await;
        assert_eq!(prior.total_attempts, 1);
        assert_eq!(tracker.stats("u").await.total_attempts, 2);
    }

    #[tokio::test]
    async fn test_abandoning_user_gets_short_holds() {
        let tracker = FairnessTracker::default();
        for _ in 0..3 {
            tracker.record_attempt("flaky").await;
        }
        assert_eq!(tracker.ttl_secs("flaky").await, 60);
        assert_eq!(tracker.ttl("flaky").await, Duration::seconds(60));
    }

    #[tokio::test]
    async fn test_reliable_user_keeps_full_holds() {
        let tracker = FairnessTracker::default();
        for _ in 0..10 {
            tracker.record_attempt("steady").await;
        }
        for _ in 0..8 {
            tracker.record_success("steady").await;
        }
        assert!((tracker.stats("steady").await.score() - 0.8).abs() < f64::EPSILON);
        assert_eq!(tracker.ttl_secs("steady").await, 300);
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let tracker = FairnessTracker::default();
        tracker.record_attempt("a").await;
        tracker.record_success("b").await;

        assert_eq!(
            tracker.stats("a").await,
            UserFairnessStats {
                total_attempts: 1,
                successful_completions: 0
            }
        );
        assert_eq!(tracker.stats("b").await.successful_completions, 1);
    }
}
