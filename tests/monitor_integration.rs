//! Integration tests for the full optimization cycle.
//!
//! These tests drive an `Orchestrator` end to end with a scripted remote
//! source and verify:
//! - the skip / probe / full-process branching
//! - call accounting across cache, scheduler, and tracker
//! - lifecycle transitions observed through cycle outcomes
//!
//! Run with: `cargo test --test monitor_integration`

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use pollwise::lifecycle::{ActivityPhase, Engagement, EngagementId};
use pollwise::orchestrator::{CycleOutcome, MonitorConfig, Orchestrator, Processor};
use pollwise::source::{EntityId, RemoteSource};
use pollwise::tracker::{CallTracker, Endpoint};

// ============================================================================
// Mock Implementations
// ============================================================================

#[derive(Debug, thiserror::Error)]
#[error("simulated transport failure")]
struct TransportDown;

/// Scripted remote source. Engagement responses are set by the test;
/// every fetch is counted.
#[derive(Clone, Default)]
struct ScriptedSource {
    engagements: Arc<Mutex<Vec<Engagement>>>,
    engagement_fetches: Arc<AtomicUsize>,
    locked_fetches: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

impl ScriptedSource {
    fn set_engagements(&self, engagements: Vec<Engagement>) {
        *self.engagements.lock().unwrap() = engagements;
    }

    fn engagement_fetches(&self) -> usize {
        self.engagement_fetches.load(Ordering::SeqCst)
    }
}

impl RemoteSource for ScriptedSource {
    type Locked = String;
    type Profile = String;
    type FeedEvent = u64;
    type Error = TransportDown;

    fn fetch_engagements(&self) -> Result<Vec<Engagement>, TransportDown> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportDown);
        }
        self.engagement_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.engagements.lock().unwrap().clone())
    }

    fn fetch_locked(&self) -> Result<String, TransportDown> {
        self.locked_fetches.fetch_add(1, Ordering::SeqCst);
        Ok("roster".into())
    }

    fn fetch_profile(&self, id: EntityId) -> Result<String, TransportDown> {
        Ok(format!("profile-{id}"))
    }

    fn fetch_feed(&self) -> Result<Vec<u64>, TransportDown> {
        Ok(Vec::new())
    }
}

/// Processor recording every engagement it is handed; can be told to fail.
#[derive(Clone, Default)]
struct RecordingProcessor {
    processed: Arc<Mutex<Vec<EngagementId>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingProcessor {
    fn processed(&self) -> Vec<EngagementId> {
        self.processed.lock().unwrap().clone()
    }
}

impl Processor for RecordingProcessor {
    type Error = String;

    fn process(&mut self, engagement: &Engagement) -> Result<(), String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("report writer offline".into());
        }
        self.processed.lock().unwrap().push(engagement.id);
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn t0() -> DateTime<Utc> {
    // A Thursday, well away from the default Tuesday 18:00 anchor.
    "2026-08-20T12:00:00Z".parse().unwrap()
}

fn harness() -> (
    Orchestrator<ScriptedSource, RecordingProcessor>,
    ScriptedSource,
    RecordingProcessor,
) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let source = ScriptedSource::default();
    let processor = RecordingProcessor::default();
    let orchestrator = Orchestrator::started_at(
        source.clone(),
        processor.clone(),
        MonitorConfig::default(),
        Arc::new(CallTracker::started_at(t0())),
        t0(),
    );
    (orchestrator, source, processor)
}

fn active_engagement(id: u64) -> Engagement {
    Engagement::open_ended(EngagementId(id), t0() - Duration::minutes(10))
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn quiet_domain_probes_once_then_sleeps_until_the_anchor() {
    let (mut orchestrator, source, processor) = harness();

    assert_eq!(orchestrator.run_cycle_at(t0()).unwrap(), CycleOutcome::Quiet);
    assert_eq!(source.engagement_fetches(), 1);
    assert_eq!(orchestrator.model().phase(), ActivityPhase::Quiescent);

    // Quiescent anchors the next check to the weekly schedule point, so
    // even hours later the cycle is a no-op with zero remote calls.
    for hours in [1, 6, 24] {
        let outcome = orchestrator
            .run_cycle_at(t0() + Duration::hours(hours))
            .unwrap();
        assert_eq!(outcome, CycleOutcome::Idle);
    }
    assert_eq!(source.engagement_fetches(), 1);
    assert!(processor.processed().is_empty());
}

#[test]
fn active_engagement_is_probed_and_fully_processed() {
    let (mut orchestrator, source, processor) = harness();
    source.set_engagements(vec![active_engagement(42)]);

    let outcome = orchestrator.run_cycle_at(t0()).unwrap();
    assert_eq!(outcome, CycleOutcome::Processed(EngagementId(42)));
    assert_eq!(orchestrator.model().phase(), ActivityPhase::Active);
    assert_eq!(processor.processed(), vec![EngagementId(42)]);
}

#[test]
fn active_cadence_skips_between_probes() {
    let (mut orchestrator, source, _) = harness();
    source.set_engagements(vec![active_engagement(1)]);

    orchestrator.run_cycle_at(t0()).unwrap();

    // 20s later: before next-check minus tolerance.
    assert_eq!(
        orchestrator.run_cycle_at(t0() + Duration::seconds(20)).unwrap(),
        CycleOutcome::Idle
    );
    // 40s later: inside the tolerance window, but the backoff scheduler
    // still holds the probe (2-minute active interval).
    assert_eq!(
        orchestrator.run_cycle_at(t0() + Duration::seconds(40)).unwrap(),
        CycleOutcome::Skipped
    );
    assert_eq!(source.engagement_fetches(), 1);

    // Past the active interval: probed again.
    let outcome = orchestrator
        .run_cycle_at(t0() + Duration::minutes(2))
        .unwrap();
    assert_eq!(outcome, CycleOutcome::Processed(EngagementId(1)));
    assert_eq!(source.engagement_fetches(), 2);
}

#[test]
fn vanished_engagement_keeps_the_model_active() {
    // Active -> Quiescent is not a legal transition; the orchestrator keeps
    // treating the frozen selection as active until recovery is observed.
    let (mut orchestrator, source, _) = harness();
    source.set_engagements(vec![active_engagement(7)]);
    orchestrator.run_cycle_at(t0()).unwrap();

    source.set_engagements(Vec::new());
    let outcome = orchestrator
        .run_cycle_at(t0() + Duration::minutes(2))
        .unwrap();
    assert_eq!(outcome, CycleOutcome::Processed(EngagementId(7)));
    assert_eq!(orchestrator.model().phase(), ActivityPhase::Active);
    assert_eq!(orchestrator.model().blocked_transitions(), 1);
}

#[test]
fn ended_engagement_winds_down_through_recovering() {
    let (mut orchestrator, source, processor) = harness();
    let end = t0() + Duration::minutes(10);
    let engagement = Engagement::bounded(EngagementId(3), t0() - Duration::hours(1), end);
    source.set_engagements(vec![engagement]);

    assert_eq!(
        orchestrator.run_cycle_at(t0()).unwrap(),
        CycleOutcome::Processed(EngagementId(3))
    );

    // After the end, inside the grace window: recovering, no processing.
    let outcome = orchestrator
        .run_cycle_at(end + Duration::minutes(5))
        .unwrap();
    assert_eq!(outcome, CycleOutcome::Quiet);
    assert_eq!(orchestrator.model().phase(), ActivityPhase::Recovering);

    // Recovering anchors the next check to the weekly schedule point;
    // probing again before it is a no-op.
    assert_eq!(
        orchestrator
            .run_cycle_at(end + Duration::minutes(90))
            .unwrap(),
        CycleOutcome::Idle
    );

    // At the anchor (the Tuesday after t0), the grace window is long past:
    // quiescent.
    let anchor: DateTime<Utc> = "2026-08-25T18:00:00Z".parse().unwrap();
    orchestrator.run_cycle_at(anchor).unwrap();
    assert_eq!(orchestrator.model().phase(), ActivityPhase::Quiescent);
    assert_eq!(processor.processed(), vec![EngagementId(3)]);
}

#[test]
fn processing_failure_is_logged_and_does_not_poison_the_next_cycle() {
    let (mut orchestrator, source, processor) = harness();
    source.set_engagements(vec![active_engagement(5)]);
    processor.fail.store(true, Ordering::SeqCst);

    assert_eq!(
        orchestrator.run_cycle_at(t0()).unwrap(),
        CycleOutcome::ProcessFailed(EngagementId(5))
    );

    processor.fail.store(false, Ordering::SeqCst);
    let outcome = orchestrator
        .run_cycle_at(t0() + Duration::minutes(2))
        .unwrap();
    assert_eq!(outcome, CycleOutcome::Processed(EngagementId(5)));
}

#[test]
fn transport_failure_propagates_and_records_nothing() {
    let (mut orchestrator, source, _) = harness();
    source.fail.store(true, Ordering::SeqCst);

    assert!(orchestrator.run_cycle_at(t0()).is_err());
    assert_eq!(orchestrator.tracker().session_stats(t0()).session_calls, 0);

    source.fail.store(false, Ordering::SeqCst);
    assert_eq!(orchestrator.run_cycle_at(t0()).unwrap(), CycleOutcome::Quiet);
}

#[test]
fn locked_resource_rides_out_an_active_engagement() {
    let (mut orchestrator, source, _) = harness();
    let end = t0() + Duration::hours(2);
    source.set_engagements(vec![Engagement::bounded(
        EngagementId(9),
        t0() - Duration::minutes(5),
        end,
    )]);
    orchestrator.run_cycle_at(t0()).unwrap();

    // One fetch, then cache hits for the whole engagement plus the buffer.
    orchestrator.locked(t0()).unwrap();
    for offset in [30, 90, 150] {
        orchestrator.locked(t0() + Duration::minutes(offset)).unwrap();
    }
    assert_eq!(source.locked_fetches.load(Ordering::SeqCst), 1);

    // After end + 1h buffer: refreshed exactly once.
    orchestrator
        .locked(end + Duration::hours(1) + Duration::seconds(1))
        .unwrap();
    assert_eq!(source.locked_fetches.load(Ordering::SeqCst), 2);
}

#[test]
fn shared_tracker_attributes_calls_across_orchestrators() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let tracker = Arc::new(CallTracker::started_at(t0()));

    let source_a = ScriptedSource::default();
    let source_b = ScriptedSource::default();
    let mut a = Orchestrator::started_at(
        source_a,
        RecordingProcessor::default(),
        MonitorConfig::default(),
        Arc::clone(&tracker),
        t0(),
    );
    let mut b = Orchestrator::started_at(
        source_b,
        RecordingProcessor::default(),
        MonitorConfig::default(),
        Arc::clone(&tracker),
        t0(),
    );

    a.run_cycle_at(t0()).unwrap();
    b.run_cycle_at(t0()).unwrap();

    let stats = tracker.session_stats(t0());
    assert_eq!(stats.session_calls, 2);
    assert_eq!(stats.per_endpoint[&Endpoint::Engagements], 2);
}

#[test]
fn summary_reflects_the_current_cycle() {
    let (mut orchestrator, source, _) = harness();
    source.set_engagements(vec![active_engagement(11)]);
    orchestrator.run_cycle_at(t0()).unwrap();

    let summary = orchestrator.summary(t0() + Duration::minutes(1));
    assert_eq!(summary.phase, ActivityPhase::Active);
    assert_eq!(summary.session_calls, 1);
    assert_eq!(summary.consecutive_empty, 0);
    assert_eq!(summary.next_check_in, Duration::minutes(2));
    assert_eq!(summary.cache_valid + summary.cache_expired, 1);

    // Display form stays usable for plain-text reports.
    let line = summary.to_string();
    assert!(line.contains("active"));
    assert!(line.contains("1 calls this session"));
}
