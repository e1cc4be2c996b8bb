//! Read-through cache over a [`RemoteSource`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, trace};

use crate::lifecycle::Engagement;
use crate::source::{EntityId, RemoteSource};
use crate::tracker::{CallTracker, Endpoint};

use super::config::CacheConfig;

/// One cached payload with its storage timestamp.
///
/// Entries are overwritten, never merged, and expire lazily: nothing evicts
/// them, they simply stop being returned.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    payload: T,
    stored_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    fn new(payload: T, now: DateTime<Utc>) -> Self {
        Self {
            payload,
            stored_at: now,
        }
    }

    fn is_valid(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.stored_at < ttl
    }
}

/// What the lifecycle currently says about the locked resource.
///
/// Derived by the caller from the lifecycle model; the cache itself has no
/// opinion about domain state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockHint {
    /// Domain is quiet; the base TTL applies.
    Unlocked,
    /// An engagement is active or imminent; the resource cannot change
    /// until it ends (plus a buffer), or for a fixed ceiling if the end
    /// is unknown.
    Locked {
        /// End time of the selected engagement, if known.
        until: Option<DateTime<Utc>>,
    },
}

/// Diagnostic snapshot of cache occupancy.
///
/// Computed by re-testing every stored entry's validity at call time;
/// expired entries are counted, not evicted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheSnapshot {
    /// Entries still within their effective TTL.
    pub valid: usize,
    /// Entries present but stale.
    pub expired: usize,
}

struct CacheState<S: RemoteSource> {
    engagements: Option<CacheEntry<Vec<Engagement>>>,
    locked: Option<CacheEntry<S::Locked>>,
    profiles: HashMap<EntityId, CacheEntry<S::Profile>>,
}

impl<S: RemoteSource> CacheState<S> {
    fn empty() -> Self {
        Self {
            engagements: None,
            locked: None,
            profiles: HashMap::new(),
        }
    }
}

/// Read-through cache wrapping the raw remote source.
///
/// Every miss calls through, records exactly one call against the shared
/// [`CallTracker`], and overwrites the entry. Transport errors propagate
/// verbatim and leave both the entry and the counters untouched; there is
/// no fallback to expired data.
pub struct CachedReader<S: RemoteSource> {
    source: S,
    tracker: Arc<CallTracker>,
    config: CacheConfig,
    state: RwLock<CacheState<S>>,
}

impl<S: RemoteSource> std::fmt::Debug for CachedReader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedReader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: RemoteSource> CachedReader<S> {
    /// Create a reader over `source`, attributing calls to `tracker`.
    pub fn new(source: S, tracker: Arc<CallTracker>, config: CacheConfig) -> Self {
        Self {
            source,
            tracker,
            config,
            state: RwLock::new(CacheState::empty()),
        }
    }

    /// Current candidate engagements, cached for [`CacheConfig::engagements_ttl`].
    pub fn engagements(&self, now: DateTime<Utc>) -> Result<Vec<Engagement>, S::Error> {
        {
            let state = self.state.read().unwrap();
            if let Some(entry) = &state.engagements {
                if entry.is_valid(now, self.config.engagements_ttl) {
                    trace!("engagement probe served from cache");
                    return Ok(entry.payload.clone());
                }
            }
        }

        let fresh = self.source.fetch_engagements()?;
        self.tracker.record_call(Endpoint::Engagements);
        self.state.write().unwrap().engagements = Some(CacheEntry::new(fresh.clone(), now));
        Ok(fresh)
    }

    /// The locked resource, with a TTL stretched per `hint`.
    pub fn locked(&self, now: DateTime<Utc>, hint: LockHint) -> Result<S::Locked, S::Error> {
        {
            let state = self.state.read().unwrap();
            if let Some(entry) = &state.locked {
                if self.locked_entry_valid(entry, now, hint) {
                    trace!(?hint, "locked resource served from cache");
                    return Ok(entry.payload.clone());
                }
            }
        }

        let fresh = self.source.fetch_locked()?;
        self.tracker.record_call(Endpoint::Locked);
        self.state.write().unwrap().locked = Some(CacheEntry::new(fresh.clone(), now));
        debug!(?hint, "locked resource refreshed");
        Ok(fresh)
    }

    /// Per-identity profile data, cached per [`EntityId`].
    pub fn profile(&self, now: DateTime<Utc>, id: EntityId) -> Result<S::Profile, S::Error> {
        {
            let state = self.state.read().unwrap();
            if let Some(entry) = state.profiles.get(&id) {
                if entry.is_valid(now, self.config.profile_ttl) {
                    trace!(%id, "profile served from cache");
                    return Ok(entry.payload.clone());
                }
            }
        }

        let fresh = self.source.fetch_profile(id)?;
        self.tracker.record_call(Endpoint::Profile);
        self.state
            .write()
            .unwrap()
            .profiles
            .insert(id, CacheEntry::new(fresh.clone(), now));
        Ok(fresh)
    }

    /// The dynamic event feed. Never cached: every request is a recorded
    /// call-through.
    pub fn feed(&self) -> Result<Vec<S::FeedEvent>, S::Error> {
        let events = self.source.fetch_feed()?;
        self.tracker.record_call(Endpoint::Feed);
        Ok(events)
    }

    /// Drop every stored entry. Manual cache-busting, not scheduled.
    pub fn invalidate_all(&self) {
        let mut state = self.state.write().unwrap();
        *state = CacheState::empty();
        debug!("cache invalidated");
    }

    /// Snapshot valid/expired entry counts under the given lock hint.
    pub fn stats(&self, now: DateTime<Utc>, hint: LockHint) -> CacheSnapshot {
        let state = self.state.read().unwrap();
        let mut snapshot = CacheSnapshot::default();

        if let Some(entry) = &state.engagements {
            snapshot.tally(entry.is_valid(now, self.config.engagements_ttl));
        }
        if let Some(entry) = &state.locked {
            snapshot.tally(self.locked_entry_valid(entry, now, hint));
        }
        for entry in state.profiles.values() {
            snapshot.tally(entry.is_valid(now, self.config.profile_ttl));
        }
        snapshot
    }

    fn locked_entry_valid(
        &self,
        entry: &CacheEntry<S::Locked>,
        now: DateTime<Utc>,
        hint: LockHint,
    ) -> bool {
        match hint {
            LockHint::Unlocked => entry.is_valid(now, self.config.locked_ttl),
            // Locked with a known end: the value cannot change before the
            // engagement ends, so the entry lives until end + buffer no
            // matter when it was stored.
            LockHint::Locked { until: Some(end) } => now < end + self.config.locked_buffer,
            LockHint::Locked { until: None } => entry.is_valid(now, self.config.locked_ceiling),
        }
    }
}

impl CacheSnapshot {
    fn tally(&mut self, valid: bool) {
        if valid {
            self.valid += 1;
        } else {
            self.expired += 1;
        }
    }
}
