//! Engine tuning knobs.

use serde::Deserialize;
use std::time::Duration;

/// What reference instant the next cron occurrence is computed from after a
/// successful dispatch.
///
/// Skipping to the current instant prevents a long-paused poller from firing
/// a burst of catch-up triggers after an outage; catching up preserves every
/// scheduled occurrence instead. Both are defensible, so the choice is a
/// named option rather than an incidental behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatchUpPolicy {
    /// Compute the next occurrence from the current instant.
    #[default]
    SkipToCurrent,
    /// Compute the next occurrence from the stale `next_run`, replaying
    /// missed occurrences one poll cycle at a time.
    CatchUp,
}

/// Configuration for the scheduling engine.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Seconds between poll cycles.
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,

    /// Rows per due-selection page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Lease TTL in seconds. Bounds how long a crashed holder can block
    /// other replicas.
    #[serde(default = "default_lease_ttl_seconds")]
    pub lease_ttl_seconds: u64,

    /// Safety cap on pages per cycle. A capped cycle picks up the
    /// remainder next cycle, since due ordering is preserved.
    #[serde(default = "default_max_pages_per_cycle")]
    pub max_pages_per_cycle: u32,

    /// Margin subtracted from the lease TTL to form the cycle's wall-clock
    /// budget, so the loop never holds the lease past its TTL.
    #[serde(default = "default_cycle_safety_margin_seconds")]
    pub cycle_safety_margin_seconds: u64,

    /// Reference-instant policy for recurring schedules.
    #[serde(default)]
    pub catch_up_policy: CatchUpPolicy,
}

fn default_poll_interval_seconds() -> u64 {
    30
}

fn default_page_size() -> u32 {
    50
}

fn default_lease_ttl_seconds() -> u64 {
    120
}

fn default_max_pages_per_cycle() -> u32 {
    20
}

fn default_cycle_safety_margin_seconds() -> u64 {
    5
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval_seconds(),
            page_size: default_page_size(),
            lease_ttl_seconds: default_lease_ttl_seconds(),
            max_pages_per_cycle: default_max_pages_per_cycle(),
            cycle_safety_margin_seconds: default_cycle_safety_margin_seconds(),
            catch_up_policy: CatchUpPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// The interval between poll cycles.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    /// The lease TTL.
    #[must_use]
    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease_ttl_seconds)
    }

    /// Wall-clock budget for one cycle: lease TTL minus the safety margin.
    #[must_use]
    pub fn cycle_budget(&self) -> Duration {
        Duration::from_secs(
            self.lease_ttl_seconds
                .saturating_sub(self.cycle_safety_margin_seconds),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_has_correct_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.poll_interval_seconds, 30);
        assert_eq!(config.page_size, 50);
        assert_eq!(config.lease_ttl_seconds, 120);
        assert_eq!(config.max_pages_per_cycle, 20);
        assert_eq!(config.catch_up_policy, CatchUpPolicy::SkipToCurrent);
    }

    #[test]
    fn cycle_budget_subtracts_margin() {
        let config = EngineConfig {
            lease_ttl_seconds: 120,
            cycle_safety_margin_seconds: 5,
            ..EngineConfig::default()
        };
        assert_eq!(config.cycle_budget(), Duration::from_secs(115));
    }

    #[test]
    fn cycle_budget_saturates_at_zero() {
        let config = EngineConfig {
            lease_ttl_seconds: 3,
            cycle_safety_margin_seconds: 10,
            ..EngineConfig::default()
        };
        assert_eq!(config.cycle_budget(), Duration::ZERO);
    }

    #[test]
    fn catch_up_policy_deserializes_snake_case() {
        let policy: CatchUpPolicy =
            serde_json::from_value(serde_json::json!("catch_up")).expect("deserialize");
        assert_eq!(policy, CatchUpPolicy::CatchUp);
    }
}
