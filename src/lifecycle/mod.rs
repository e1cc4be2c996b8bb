//! Finite-state model of the monitored domain's activity.
//!
//! The lifecycle model turns a raw probe result (a set of candidate
//! engagements) into a single [`ActivityPhase`] plus the one engagement most
//! worth attention right now. Phase transitions are validated against an
//! explicit adjacency table with anti-oscillation dwell guards; a rejected
//! transition freezes the model and is observable only as a debug event.
//!
//! The model also owns the per-phase probe cadence, including the recurring
//! weekly anchor used while nothing is happening (see [`RecurringAnchor`]).

mod model;
mod phase;
mod schedule;

pub use model::{Engagement, EngagementId, LifecycleConfig, LifecycleModel, PhaseUpdate};
pub use phase::ActivityPhase;
pub use schedule::{RecurringAnchor, ScheduleError};
