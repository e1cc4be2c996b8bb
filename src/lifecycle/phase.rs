//! Activity phases and the transition adjacency table.

/// Phase of the monitored domain's lifecycle.
///
/// Exactly one phase is current at any time.
///
/// ```text
/// Quiescent --> any
/// Imminent  --> Active | Quiescent* | Recovering*
/// Active    --> Recovering | Imminent          (never directly Quiescent)
/// Recovering--> Quiescent* | Imminent*         (never directly Active)
///
/// * dwell-guarded: rejected within 30s of entering the current phase
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityPhase {
    /// Nothing relevant happening.
    Quiescent,
    /// Something relevant is scheduled to start within the look-ahead window.
    Imminent,
    /// Something relevant is in progress.
    Active,
    /// Something relevant ended within the grace window.
    Recovering,
}

impl ActivityPhase {
    /// Whether the adjacency table permits a transition to `to`.
    ///
    /// Self-transitions are not transitions; callers treat `from == to` as a
    /// refresh of the current phase and never consult this table for it.
    pub fn allows_transition(self, to: ActivityPhase) -> bool {
        match (self, to) {
            (ActivityPhase::Quiescent, _) => true,
            (ActivityPhase::Imminent, _) => true,
            (ActivityPhase::Active, ActivityPhase::Recovering)
            | (ActivityPhase::Active, ActivityPhase::Imminent) => true,
            (ActivityPhase::Active, _) => false,
            (ActivityPhase::Recovering, ActivityPhase::Quiescent)
            | (ActivityPhase::Recovering, ActivityPhase::Imminent) => true,
            (ActivityPhase::Recovering, _) => false,
        }
    }

    /// Whether a transition to `to` is subject to the minimum dwell time.
    ///
    /// The dwell guard prevents oscillation out of transient phases: leaving
    /// `Imminent` or `Recovering` for a quieter phase requires the model to
    /// have sat in the current phase for the configured minimum first.
    pub fn transition_needs_dwell(self, to: ActivityPhase) -> bool {
        matches!(
            (self, to),
            (ActivityPhase::Imminent, ActivityPhase::Quiescent)
                | (ActivityPhase::Imminent, ActivityPhase::Recovering)
                | (ActivityPhase::Recovering, ActivityPhase::Quiescent)
                | (ActivityPhase::Recovering, ActivityPhase::Imminent)
        )
    }

    /// Human-readable status for reports and logs.
    pub fn display_status(&self) -> &'static str {
        match self {
            ActivityPhase::Quiescent => "quiet",
            ActivityPhase::Imminent => "starting soon",
            ActivityPhase::Active => "active",
            ActivityPhase::Recovering => "winding down",
        }
    }
}

impl std::fmt::Display for ActivityPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ActivityPhase::Quiescent => "quiescent",
            ActivityPhase::Imminent => "imminent",
            ActivityPhase::Active => "active",
            ActivityPhase::Recovering => "recovering",
        };
        f.write_str(name)
    }
}
