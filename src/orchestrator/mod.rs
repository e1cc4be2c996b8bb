//! Per-cycle decision loop.
//!
//! The orchestrator turns one timer tick into one of three outcomes: do
//! nothing, probe-and-observe, or probe-and-fully-process. It consumes the
//! lifecycle model and the backoff scheduler, drives the adaptive cache,
//! and reports every chargeable call through the shared tracker.

mod summary;

pub use summary::OptimizationSummary;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, trace, warn};

use crate::backoff::{BackoffConfig, ProbeScheduler};
use crate::cache::{CacheConfig, CachedReader, LockHint};
use crate::lifecycle::{
    ActivityPhase, Engagement, EngagementId, LifecycleConfig, LifecycleModel,
};
use crate::source::{EntityId, RemoteSource};
use crate::tracker::CallTracker;

/// Downstream full-processing collaborator.
///
/// Invoked only while the lifecycle is `Imminent` or `Active`. Failures are
/// the collaborator's responsibility: the orchestrator logs them and moves
/// on to the next cycle rather than aborting.
pub trait Processor {
    /// Processing error, logged but not propagated.
    type Error: std::fmt::Display;

    /// Fully process the selected engagement.
    fn process(&mut self, engagement: &Engagement) -> Result<(), Self::Error>;
}

/// Combined configuration for one orchestrator instance.
#[derive(Debug, Clone, Default)]
pub struct MonitorConfig {
    /// Lifecycle model configuration.
    pub lifecycle: LifecycleConfig,
    /// Cache TTL configuration.
    pub cache: CacheConfig,
    /// Backoff interval configuration.
    pub backoff: BackoffConfig,
}

/// Tolerance applied to the model's recommended next-check time, so a timer
/// firing slightly early does not push the whole cycle to the next tick.
const CHECK_TOLERANCE_SECS: i64 = 30;

/// Outcome of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Before the model's recommended next-check time; nothing was done.
    Idle,
    /// The backoff scheduler skipped the state probe.
    Skipped,
    /// Probed; the domain is quiet, no downstream work.
    Quiet,
    /// Probed and fully processed the selected engagement.
    Processed(EngagementId),
    /// Probed; full processing failed and was logged.
    ProcessFailed(EngagementId),
}

/// Per-cycle decision loop over one monitored identity.
///
/// Create one instance per monitored identity; instances may share a
/// [`CallTracker`] so every chargeable call is attributed exactly once
/// across the process.
pub struct Orchestrator<S: RemoteSource, P: Processor> {
    reader: CachedReader<S>,
    model: LifecycleModel,
    scheduler: ProbeScheduler,
    tracker: Arc<CallTracker>,
    processor: P,
    next_check_at: Option<DateTime<Utc>>,
}

impl<S: RemoteSource, P: Processor> Orchestrator<S, P> {
    /// Create an orchestrator with its own call tracker.
    pub fn new(source: S, processor: P, config: MonitorConfig) -> Self {
        Self::with_shared_tracker(source, processor, config, Arc::new(CallTracker::new()))
    }

    /// Create an orchestrator attributing calls to a shared tracker.
    pub fn with_shared_tracker(
        source: S,
        processor: P,
        config: MonitorConfig,
        tracker: Arc<CallTracker>,
    ) -> Self {
        Self::started_at(source, processor, config, tracker, Utc::now())
    }

    /// Create an orchestrator with an explicit start time, for tests.
    pub fn started_at(
        source: S,
        processor: P,
        config: MonitorConfig,
        tracker: Arc<CallTracker>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            reader: CachedReader::new(source, Arc::clone(&tracker), config.cache),
            model: LifecycleModel::new(config.lifecycle, now),
            scheduler: ProbeScheduler::new(config.backoff),
            tracker,
            processor,
            next_check_at: None,
        }
    }

    /// Run one cycle as of now.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome, S::Error> {
        self.run_cycle_at(Utc::now())
    }

    /// Run one cycle as of an explicit `now`.
    ///
    /// Transport errors from the probe propagate verbatim; retrying is the
    /// caller's concern. Downstream processing failures do not: they are
    /// logged and reported as [`CycleOutcome::ProcessFailed`].
    pub fn run_cycle_at(&mut self, now: DateTime<Utc>) -> Result<CycleOutcome, S::Error> {
        if let Some(next) = self.next_check_at {
            if now < next - Duration::seconds(CHECK_TOLERANCE_SECS) {
                trace!(next_check = %next, "before recommended check time");
                return Ok(CycleOutcome::Idle);
            }
        }

        if self.scheduler.should_skip(now) {
            return Ok(CycleOutcome::Skipped);
        }

        let candidates = self.reader.engagements(now)?;
        let active_count = candidates.iter().filter(|e| e.is_active_at(now)).count();
        self.scheduler.record_probe(now, active_count);

        let update = self.model.observe(&candidates, now);
        self.next_check_at = Some(self.model.next_check_at(now));

        let outcome = match self.model.phase() {
            ActivityPhase::Quiescent | ActivityPhase::Recovering => {
                debug!(
                    phase = %self.model.phase(),
                    candidates = candidates.len(),
                    "nothing to process"
                );
                CycleOutcome::Quiet
            }
            ActivityPhase::Imminent | ActivityPhase::Active => {
                // Selection is guaranteed by classification for these phases,
                // but a blocked transition may have frozen an older pick.
                match self.model.selected().cloned() {
                    Some(engagement) => match self.processor.process(&engagement) {
                        Ok(()) => CycleOutcome::Processed(engagement.id),
                        Err(err) => {
                            warn!(
                                engagement = engagement.id.0,
                                error = %err,
                                "full processing failed; continuing"
                            );
                            CycleOutcome::ProcessFailed(engagement.id)
                        }
                    },
                    None => CycleOutcome::Quiet,
                }
            }
        };

        let summary = self.summary(now);
        info!(
            outcome = ?outcome,
            phase_changed = update.changed,
            phase_blocked = update.blocked,
            session_calls = summary.session_calls,
            calls_per_minute = format!("{:.2}", summary.calls_per_minute),
            cache_valid = summary.cache_valid,
            cache_expired = summary.cache_expired,
            phase = %summary.phase,
            consecutive_empty = summary.consecutive_empty,
            next_check_in_secs = summary.next_check_in.num_seconds(),
            "cycle complete"
        );
        Ok(outcome)
    }

    /// The lock hint implied by the current lifecycle state.
    pub fn lock_hint(&self) -> LockHint {
        match self.model.phase() {
            ActivityPhase::Active | ActivityPhase::Imminent => LockHint::Locked {
                until: self.model.selected().and_then(|e| e.end),
            },
            ActivityPhase::Quiescent | ActivityPhase::Recovering => LockHint::Unlocked,
        }
    }

    /// Fetch the locked resource through the cache with the current hint.
    pub fn locked(&self, now: DateTime<Utc>) -> Result<S::Locked, S::Error> {
        self.reader.locked(now, self.lock_hint())
    }

    /// Fetch per-identity profile data through the cache.
    pub fn profile(&self, now: DateTime<Utc>, id: EntityId) -> Result<S::Profile, S::Error> {
        self.reader.profile(now, id)
    }

    /// Fetch the dynamic feed (never cached).
    pub fn feed(&self) -> Result<Vec<S::FeedEvent>, S::Error> {
        self.reader.feed()
    }

    /// Observability snapshot merging tracker, cache, and scheduler state.
    pub fn summary(&self, now: DateTime<Utc>) -> OptimizationSummary {
        let stats = self.tracker.session_stats(now);
        let cache = self.reader.stats(now, self.lock_hint());
        OptimizationSummary {
            session_calls: stats.session_calls,
            calls_per_minute: stats.calls_per_minute,
            cache_valid: cache.valid,
            cache_expired: cache.expired,
            phase: self.model.phase(),
            consecutive_empty: self.scheduler.consecutive_empty(),
            next_check_in: self.scheduler.current_interval(),
        }
    }

    /// The lifecycle model (read-only).
    pub fn model(&self) -> &LifecycleModel {
        &self.model
    }

    /// The probe scheduler (read-only).
    pub fn scheduler(&self) -> &ProbeScheduler {
        &self.scheduler
    }

    /// The shared call tracker.
    pub fn tracker(&self) -> &Arc<CallTracker> {
        &self.tracker
    }

    /// The adaptive cache.
    pub fn reader(&self) -> &CachedReader<S> {
        &self.reader
    }
}
