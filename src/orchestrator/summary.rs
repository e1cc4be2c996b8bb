//! Observability summary emitted at the end of each processed cycle.

use chrono::Duration;

use crate::lifecycle::ActivityPhase;

/// Merged snapshot of the optimization layer, for logging and reports.
#[derive(Debug, Clone)]
pub struct OptimizationSummary {
    /// Chargeable calls this session.
    pub session_calls: u64,
    /// Session call rate.
    pub calls_per_minute: f64,
    /// Cache entries still within their TTL.
    pub cache_valid: usize,
    /// Cache entries present but stale.
    pub cache_expired: usize,
    /// Current lifecycle phase.
    pub phase: ActivityPhase,
    /// Consecutive probes that found nothing active.
    pub consecutive_empty: u32,
    /// Current probe interval.
    pub next_check_in: Duration,
}

impl std::fmt::Display for OptimizationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) | {} calls this session ({:.2}/min) | cache {}+{} | {} empty probes | next check in {}s",
            self.phase,
            self.phase.display_status(),
            self.session_calls,
            self.calls_per_minute,
            self.cache_valid,
            self.cache_expired,
            self.consecutive_empty,
            self.next_check_in.num_seconds(),
        )
    }
}
