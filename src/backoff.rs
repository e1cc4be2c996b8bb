//! Adaptive backoff for the state-determining probe.
//!
//! Independent of the cache's TTLs, the scheduler decides whether the probe
//! itself is worth issuing this cycle. Repeated empty probes stretch the
//! interval through a step function; any sign of activity snaps it back to
//! the short active cadence.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

/// Empty-probe counts at which the interval steps up.
const RELAXED_AFTER: u32 = 2;
const DORMANT_AFTER: u32 = 5;
const HIBERNATE_AFTER: u32 = 10;

/// Interval configuration for the probe scheduler.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Interval while activity was seen, and for the first empty probes
    /// (default: 2 minutes). Activity is never left unobserved longer
    /// than this.
    pub base_interval: Duration,
    /// Interval after 2-4 consecutive empty probes (default: 5 minutes).
    pub relaxed_interval: Duration,
    /// Interval after 5-9 consecutive empty probes (default: 15 minutes).
    pub dormant_interval: Duration,
    /// Interval after 10+ consecutive empty probes (default: 30 minutes).
    pub hibernate_interval: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::minutes(2),
            relaxed_interval: Duration::minutes(5),
            dormant_interval: Duration::minutes(15),
            hibernate_interval: Duration::minutes(30),
        }
    }
}

/// Probe scheduler state.
///
/// Created once per process and mutated only through
/// [`ProbeScheduler::record_probe`].
#[derive(Debug)]
pub struct ProbeScheduler {
    config: BackoffConfig,
    consecutive_empty: u32,
    last_probe_at: Option<DateTime<Utc>>,
    last_active_count: usize,
}

impl ProbeScheduler {
    /// Create a scheduler that will never skip its first probe.
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            consecutive_empty: 0,
            last_probe_at: None,
            last_active_count: 0,
        }
    }

    /// Consecutive probes that found nothing active.
    pub fn consecutive_empty(&self) -> u32 {
        self.consecutive_empty
    }

    /// Active-item count seen by the last probe.
    pub fn last_active_count(&self) -> usize {
        self.last_active_count
    }

    /// The minimum wait between probes given current state.
    pub fn current_interval(&self) -> Duration {
        if self.last_active_count > 0 {
            return self.config.base_interval;
        }
        match self.consecutive_empty {
            n if n >= HIBERNATE_AFTER => self.config.hibernate_interval,
            n if n >= DORMANT_AFTER => self.config.dormant_interval,
            n if n >= RELAXED_AFTER => self.config.relaxed_interval,
            _ => self.config.base_interval,
        }
    }

    /// Whether this cycle's probe can be skipped.
    ///
    /// The very first probe is never skipped; after that, the probe is
    /// skipped iff less than [`ProbeScheduler::current_interval`] has
    /// elapsed since the last one.
    pub fn should_skip(&self, now: DateTime<Utc>) -> bool {
        let Some(last) = self.last_probe_at else {
            return false;
        };
        let skip = now - last < self.current_interval();
        if skip {
            debug!(
                since_last_secs = (now - last).num_seconds(),
                interval_secs = self.current_interval().num_seconds(),
                consecutive_empty = self.consecutive_empty,
                "probe skipped"
            );
        }
        skip
    }

    /// Record the outcome of an actual (non-skipped) probe.
    pub fn record_probe(&mut self, now: DateTime<Utc>, active_count: usize) {
        self.last_probe_at = Some(now);
        if active_count != self.last_active_count {
            info!(
                previous = self.last_active_count,
                current = active_count,
                "active engagement count changed"
            );
        }
        if active_count == 0 {
            self.consecutive_empty += 1;
        } else {
            self.consecutive_empty = 0;
        }
        self.last_active_count = active_count;
    }

    /// Rough number of calls a period of this cadence would cost.
    ///
    /// One probe per interval, two extra calls per active engagement per
    /// probe, plus one for the initial state read. Capacity planning only.
    pub fn estimate_calls_for(&self, period: Duration) -> u64 {
        let interval_secs = self.current_interval().num_seconds().max(1);
        let period_secs = period.num_seconds().max(0);
        let probes = (period_secs + interval_secs - 1) / interval_secs;
        let probes = probes as u64;
        probes + self.last_active_count as u64 * probes * 2 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        "2026-08-20T12:00:00Z".parse().unwrap()
    }

    fn scheduler() -> ProbeScheduler {
        ProbeScheduler::new(BackoffConfig::default())
    }

    #[test]
    fn never_skips_the_first_probe() {
        let s = scheduler();
        assert!(!s.should_skip(t0()));
    }

    #[test]
    fn interval_steps_up_with_consecutive_empty_probes() {
        let mut s = scheduler();
        let mut now = t0();

        for expected_minutes in [2, 5, 5, 5, 15, 15, 15, 15, 15, 30, 30, 30] {
            s.record_probe(now, 0);
            assert_eq!(
                s.current_interval(),
                Duration::minutes(expected_minutes),
                "after {} empty probes",
                s.consecutive_empty()
            );
            now += s.current_interval();
        }
        assert_eq!(s.consecutive_empty(), 12);
    }

    #[test]
    fn ten_empty_probes_reach_the_half_hour_interval() {
        let mut s = scheduler();
        for i in 0..10 {
            s.record_probe(t0() + Duration::minutes(i * 30), 0);
        }
        assert_eq!(s.current_interval(), Duration::minutes(30));

        // Within 30 minutes: skip. After: probe.
        let last = t0() + Duration::minutes(9 * 30);
        assert!(s.should_skip(last + Duration::minutes(29)));
        assert!(!s.should_skip(last + Duration::minutes(30)));
    }

    #[test]
    fn activity_resets_the_empty_counter_and_the_interval() {
        let mut s = scheduler();
        for i in 0..10 {
            s.record_probe(t0() + Duration::minutes(i * 30), 0);
        }
        assert_eq!(s.current_interval(), Duration::minutes(30));

        let seen = t0() + Duration::minutes(300);
        s.record_probe(seen, 2);
        assert_eq!(s.consecutive_empty(), 0);
        assert_eq!(s.current_interval(), Duration::minutes(2));
        assert!(s.should_skip(seen + Duration::minutes(1)));
        assert!(!s.should_skip(seen + Duration::minutes(2)));
    }

    #[test]
    fn active_count_caps_the_interval_even_mid_backoff() {
        let mut s = scheduler();
        s.record_probe(t0(), 1);

        // As long as something is active, the cadence stays at 2 minutes.
        s.record_probe(t0() + Duration::minutes(2), 3);
        assert_eq!(s.current_interval(), Duration::minutes(2));
        assert_eq!(s.consecutive_empty(), 0);
    }

    #[test]
    fn estimates_scale_with_interval_and_active_count() {
        let mut s = scheduler();

        // Fresh scheduler, nothing active: hourly period at 2min cadence.
        assert_eq!(s.estimate_calls_for(Duration::hours(1)), 31);

        s.record_probe(t0(), 2);
        // 30 probes + 2 active * 30 probes * 2 + 1.
        assert_eq!(s.estimate_calls_for(Duration::hours(1)), 151);
    }
}
