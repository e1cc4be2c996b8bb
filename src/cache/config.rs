//! Cache configuration.

use chrono::Duration;

/// TTL configuration for the adaptive cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for the candidate engagement listing (default: 60 seconds).
    ///
    /// Kept short: this is the state probe, and the backoff scheduler is the
    /// layer responsible for stretching its cadence, not the cache.
    pub engagements_ttl: Duration,
    /// Base TTL for the locked resource while the domain is quiet
    /// (default: 10 minutes).
    pub locked_ttl: Duration,
    /// TTL for per-identity profile data (default: 5 minutes).
    pub profile_ttl: Duration,
    /// Extra lifetime granted to the locked resource past a known engagement
    /// end while locked (default: 1 hour).
    pub locked_buffer: Duration,
    /// Lifetime ceiling for the locked resource while locked with no known
    /// end time (default: 4 hours).
    pub locked_ceiling: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            engagements_ttl: Duration::seconds(60),
            locked_ttl: Duration::minutes(10),
            profile_ttl: Duration::minutes(5),
            locked_buffer: Duration::hours(1),
            locked_ceiling: Duration::hours(4),
        }
    }
}
