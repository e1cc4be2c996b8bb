//! Pollwise - call optimization for rate-limited read APIs
//!
//! This library decides *whether* a remote read is necessary before it is
//! issued, so a reporting pipeline can poll a rate-limited API without
//! burning its call budget on data that cannot have changed.
//!
//! # Components
//!
//! - [`tracker`] - per-endpoint call accounting and a simple capacity predictor
//! - [`lifecycle`] - a finite-state model of the monitored domain's activity
//! - [`cache`] - TTL cache whose effective lifetime adapts to the lifecycle phase
//! - [`backoff`] - adaptive scheduler that skips redundant state probes
//! - [`orchestrator`] - per-cycle decision loop wiring the above together
//!
//! # High-Level API
//!
//! For most use cases, construct an [`orchestrator::Orchestrator`] around a
//! [`source::RemoteSource`] implementation and drive it on a timer:
//!
//! ```ignore
//! use pollwise::orchestrator::{Orchestrator, MonitorConfig};
//!
//! let mut orchestrator = Orchestrator::new(source, processor, MonitorConfig::default());
//!
//! loop {
//!     let outcome = orchestrator.run_cycle()?;
//!     std::thread::sleep(std::time::Duration::from_secs(30));
//! }
//! ```
//!
//! The library performs no I/O of its own: all remote reads go through the
//! caller-supplied [`source::RemoteSource`], and all time-dependent decisions
//! accept an explicit `now` so behavior is deterministic under test.

pub mod backoff;
pub mod cache;
pub mod lifecycle;
pub mod orchestrator;
pub mod source;
pub mod tracker;
