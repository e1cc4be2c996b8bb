//! Lifecycle model: phase determination and validated transitions.

use chrono::{DateTime, Duration, NaiveTime, Utc, Weekday};
use tracing::{debug, info};

use super::phase::ActivityPhase;
use super::schedule::RecurringAnchor;

/// Opaque identity of an engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngagementId(pub u64);

impl std::fmt::Display for EngagementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A candidate item from the state probe.
///
/// The model holds at most one selected engagement at a time; callers get a
/// read-only reference that is valid until the next accepted update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Engagement {
    /// Opaque identity.
    pub id: EngagementId,
    /// When the engagement started (or is scheduled to start).
    pub start: DateTime<Utc>,
    /// When it ended, if it has.
    pub end: Option<DateTime<Utc>>,
}

impl Engagement {
    /// Create an engagement with no end time.
    pub fn open_ended(id: EngagementId, start: DateTime<Utc>) -> Self {
        Self {
            id,
            start,
            end: None,
        }
    }

    /// Create an engagement with a known end time.
    pub fn bounded(id: EngagementId, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id,
            start,
            end: Some(end),
        }
    }

    /// Whether the engagement is in progress at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && self.end.map_or(true, |end| end > now)
    }
}

/// Configuration for the lifecycle model.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// How far ahead a scheduled start counts as imminent (default: 7 days).
    pub lookahead: Duration,
    /// How long after an end the domain counts as recovering (default: 1 hour).
    pub grace: Duration,
    /// Minimum time in a transient phase before dwell-guarded transitions
    /// out of it are accepted (default: 30 seconds).
    pub dwell: Duration,
    /// Probe interval while active (default: 1 minute).
    pub active_interval: Duration,
    /// Probe interval while imminent (default: 5 minutes).
    pub imminent_interval: Duration,
    /// Weekly schedule point probing anchors to while quiet
    /// (default: Tuesday 18:00 UTC, the usual matchmaking window).
    pub quiet_anchor: RecurringAnchor,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            lookahead: Duration::days(7),
            grace: Duration::hours(1),
            dwell: Duration::seconds(30),
            active_interval: Duration::minutes(1),
            imminent_interval: Duration::minutes(5),
            quiet_anchor: RecurringAnchor::new(
                Weekday::Tue,
                NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            ),
        }
    }
}

/// Result of feeding one probe into the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseUpdate {
    /// Phase before the update.
    pub previous: ActivityPhase,
    /// Phase after the update.
    pub phase: ActivityPhase,
    /// True if the phase changed.
    pub changed: bool,
    /// True if a proposed transition was rejected by the adjacency table
    /// or the dwell guard (phase and selection left untouched).
    pub blocked: bool,
}

/// Finite-state model over probe results.
///
/// Created once per monitored identity and mutated only through
/// [`LifecycleModel::observe`].
#[derive(Debug)]
pub struct LifecycleModel {
    config: LifecycleConfig,
    phase: ActivityPhase,
    entered_at: DateTime<Utc>,
    selected: Option<Engagement>,
    blocked_transitions: u64,
}

impl LifecycleModel {
    /// Create a model starting in `Quiescent` as of `now`.
    pub fn new(config: LifecycleConfig, now: DateTime<Utc>) -> Self {
        Self {
            config,
            phase: ActivityPhase::Quiescent,
            entered_at: now,
            selected: None,
            blocked_transitions: 0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> ActivityPhase {
        self.phase
    }

    /// The engagement currently selected as most relevant, if any.
    ///
    /// The reference is valid until the next accepted update.
    pub fn selected(&self) -> Option<&Engagement> {
        self.selected.as_ref()
    }

    /// When the current phase was entered.
    pub fn entered_at(&self) -> DateTime<Utc> {
        self.entered_at
    }

    /// Number of transitions rejected so far. Diagnostic only.
    pub fn blocked_transitions(&self) -> u64 {
        self.blocked_transitions
    }

    /// Feed one probe result into the model.
    ///
    /// Classifies `candidates` relative to `now`, selects the single most
    /// relevant engagement, and applies the resulting phase through the
    /// validated transition table. A rejected transition leaves phase and
    /// selection unchanged and is reported via [`PhaseUpdate::blocked`].
    pub fn observe(&mut self, candidates: &[Engagement], now: DateTime<Utc>) -> PhaseUpdate {
        let (proposed, selection) = self.classify(candidates, now);
        let previous = self.phase;

        if proposed == self.phase {
            // Same phase: refresh the selection (the relevant engagement may
            // have changed) without touching the entry timestamp.
            self.selected = selection;
            return PhaseUpdate {
                previous,
                phase: self.phase,
                changed: false,
                blocked: false,
            };
        }

        let dwell_satisfied = !self.phase.transition_needs_dwell(proposed)
            || now - self.entered_at >= self.config.dwell;

        if self.phase.allows_transition(proposed) && dwell_satisfied {
            info!(
                from = %previous,
                to = %proposed,
                engagement = selection.as_ref().map(|e| e.id.0),
                "lifecycle phase changed"
            );
            self.phase = proposed;
            self.entered_at = now;
            self.selected = selection;
            PhaseUpdate {
                previous,
                phase: proposed,
                changed: true,
                blocked: false,
            }
        } else {
            self.blocked_transitions += 1;
            debug!(
                from = %previous,
                to = %proposed,
                dwell_satisfied,
                "lifecycle phase transition blocked"
            );
            PhaseUpdate {
                previous,
                phase: self.phase,
                changed: false,
                blocked: true,
            }
        }
    }

    /// Recommended time of the next state probe, per the current phase.
    ///
    /// Active and imminent phases use fixed short intervals; quiet phases
    /// anchor to the next weekly schedule point.
    pub fn next_check_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.phase {
            ActivityPhase::Active => now + self.config.active_interval,
            ActivityPhase::Imminent => now + self.config.imminent_interval,
            ActivityPhase::Quiescent | ActivityPhase::Recovering => {
                self.config.quiet_anchor.next_occurrence(now)
            }
        }
    }

    /// Partition candidates into buckets and select from the highest-priority
    /// non-empty one: active > imminent > recovering > none.
    fn classify(
        &self,
        candidates: &[Engagement],
        now: DateTime<Utc>,
    ) -> (ActivityPhase, Option<Engagement>) {
        // Most recent start wins among concurrent active engagements.
        let active = candidates
            .iter()
            .filter(|e| e.is_active_at(now))
            .max_by_key(|e| e.start);
        if let Some(engagement) = active {
            return (ActivityPhase::Active, Some(engagement.clone()));
        }

        // Soonest start wins among upcoming engagements.
        let imminent = candidates
            .iter()
            .filter(|e| e.start > now && e.start - now <= self.config.lookahead)
            .min_by_key(|e| e.start);
        if let Some(engagement) = imminent {
            return (ActivityPhase::Imminent, Some(engagement.clone()));
        }

        // Most recent end wins among engagements inside the grace window.
        let recovering = candidates
            .iter()
            .filter(|e| {
                e.end
                    .map_or(false, |end| end <= now && now - end <= self.config.grace)
            })
            .max_by_key(|e| e.end);
        if let Some(engagement) = recovering {
            return (ActivityPhase::Recovering, Some(engagement.clone()));
        }

        (ActivityPhase::Quiescent, None)
    }
}
