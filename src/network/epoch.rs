//! Epoch tracking.
//!
//! Right after an epoch transition not every node has applied the new epoch,
//! so for a short grace window requests are addressed to the previous one.
//! The window length and the lowest epoch it applies to are tuning knobs,
//! not protocol rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default grace window after an epoch transition.
pub const DEFAULT_PROPAGATION_DELAY_SECS: u64 = 45;

/// Lowest epoch number that has completed key generation in every environment.
pub const DEFAULT_READY_THRESHOLD: u64 = 3;

/// Last known epoch number and the time it started.
///
/// Both fields are always replaced together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochCache {
    pub current_number: Option<u64>,
    /// Unix seconds.
    pub start_time: Option<u64>,
}

impl EpochCache {
    pub fn new(current_number: u64, start_time: Option<u64>) -> Self {
        Self {
            current_number: Some(current_number),
            start_time,
        }
    }

    pub fn is_known(&self) -> bool {
        self.current_number.is_some()
    }
}

/// Grace window tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochPolicy {
    pub propagation_delay_secs: u64,
    pub ready_threshold: u64,
}

impl Default for EpochPolicy {
    fn default() -> Self {
        Self {
            propagation_delay_secs: DEFAULT_PROPAGATION_DELAY_SECS,
            ready_threshold: DEFAULT_READY_THRESHOLD,
        }
    }
}

/// Computes the epoch requests should be addressed to.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpochTracker {
    policy: EpochPolicy,
}

impl EpochTracker {
    pub fn new(policy: EpochPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> EpochPolicy {
        self.policy
    }

    /// Effective epoch as of now.
    pub fn effective_epoch(&self, cache: &EpochCache) -> Option<u64> {
        self.effective_epoch_at(cache, Utc::now())
    }

    /// Effective epoch as of `now`.
    pub fn effective_epoch_at(&self, cache: &EpochCache, now: DateTime<Utc>) -> Option<u64> {
        let current = cache.current_number?;
        let Some(start_time) = cache.start_time else {
            return Some(current);
        };

        // A start time in the future counts as inside the window
        let elapsed = now.timestamp() - i64::try_from(start_time).unwrap_or(i64::MAX);
        let window = i64::try_from(self.policy.propagation_delay_secs).unwrap_or(i64::MAX);

        if elapsed < window && current >= self.policy.ready_threshold {
            Some(current.saturating_sub(1))
        } else {
            Some(current)
        }
    }
}
