//! Call accounting for the rate-limited remote API.
//!
//! Every chargeable remote call in the system is attributed to exactly one
//! [`Endpoint`] through a shared [`CallTracker`]. The tracker distinguishes
//! session counters (reset on demand, e.g. per reporting run) from lifetime
//! counters (monotonic for the life of the process), and offers a simple
//! linear predictor used for capacity planning.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

/// Logical endpoint of the remote API.
///
/// A fixed tag set instead of free-form endpoint strings, so per-endpoint
/// accounting cannot drift as call sites are added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Candidate engagement listing (the state probe).
    Engagements,
    /// The locked-during-activity resource.
    Locked,
    /// Per-identity basic data.
    Profile,
    /// High-churn event feed.
    Feed,
}

impl Endpoint {
    /// All endpoints, in reporting order.
    pub const ALL: [Endpoint; 4] = [
        Endpoint::Engagements,
        Endpoint::Locked,
        Endpoint::Profile,
        Endpoint::Feed,
    ];

    /// Stable name for logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Engagements => "engagements",
            Endpoint::Locked => "locked",
            Endpoint::Profile => "profile",
            Endpoint::Feed => "feed",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of call statistics.
#[derive(Debug, Clone)]
pub struct CallStats {
    /// Calls recorded since the session started (or was last reset).
    pub session_calls: u64,
    /// Calls recorded since the tracker was created.
    pub lifetime_calls: u64,
    /// Lifetime calls broken down by endpoint.
    pub per_endpoint: HashMap<Endpoint, u64>,
    /// When the current session started.
    pub session_started_at: DateTime<Utc>,
    /// Session call rate; 0.0 when no time has elapsed.
    pub calls_per_minute: f64,
}

#[derive(Debug)]
struct TrackerInner {
    session_calls: u64,
    lifetime_calls: u64,
    per_endpoint: HashMap<Endpoint, u64>,
    session_started_at: DateTime<Utc>,
}

/// Thread-safe call counter shared across the cache and scheduler.
///
/// Recording a call has no failure mode; counters are monotonically
/// non-decreasing except for an explicit [`CallTracker::reset_session`],
/// which zeroes session-scoped state only.
#[derive(Debug)]
pub struct CallTracker {
    inner: Mutex<TrackerInner>,
}

impl CallTracker {
    /// Create a tracker whose session starts now.
    pub fn new() -> Self {
        Self::started_at(Utc::now())
    }

    /// Create a tracker with an explicit session start, for deterministic tests.
    pub fn started_at(now: DateTime<Utc>) -> Self {
        Self {
            inner: Mutex::new(TrackerInner {
                session_calls: 0,
                lifetime_calls: 0,
                per_endpoint: HashMap::new(),
                session_started_at: now,
            }),
        }
    }

    /// Record one chargeable call against an endpoint.
    pub fn record_call(&self, endpoint: Endpoint) {
        let mut inner = self.inner.lock().unwrap();
        inner.session_calls += 1;
        inner.lifetime_calls += 1;
        *inner.per_endpoint.entry(endpoint).or_insert(0) += 1;
        tracing::trace!(
            endpoint = endpoint.as_str(),
            session = inner.session_calls,
            lifetime = inner.lifetime_calls,
            "remote call recorded"
        );
    }

    /// Snapshot current statistics.
    pub fn session_stats(&self, now: DateTime<Utc>) -> CallStats {
        let inner = self.inner.lock().unwrap();
        let elapsed_minutes = (now - inner.session_started_at).num_seconds() as f64 / 60.0;
        let calls_per_minute = if elapsed_minutes > 0.0 {
            inner.session_calls as f64 / elapsed_minutes
        } else {
            0.0
        };
        CallStats {
            session_calls: inner.session_calls,
            lifetime_calls: inner.lifetime_calls,
            per_endpoint: inner.per_endpoint.clone(),
            session_started_at: inner.session_started_at,
            calls_per_minute,
        }
    }

    /// Zero session counters and restart the session clock.
    ///
    /// Lifetime and per-endpoint counters are preserved for historical
    /// reporting.
    pub fn reset_session(&self, now: DateTime<Utc>) {
        let mut inner = self.inner.lock().unwrap();
        tracing::debug!(
            session_calls = inner.session_calls,
            "session counters reset"
        );
        inner.session_calls = 0;
        inner.session_started_at = now;
    }

    /// Predict the number of calls the next cycle will need.
    ///
    /// One state probe plus an average of two calls per active engagement.
    /// A planning heuristic, not a correctness bound.
    pub fn predict_next_cycle(&self, active_count: u64) -> u64 {
        1 + active_count * 2
    }
}

impl Default for CallTracker {
    fn default() -> Self {
        Self::new()
    }
}
