//! Remote source trait for dependency injection.
//!
//! The optimization layer never talks to the network itself; it wraps a
//! caller-supplied [`RemoteSource`] and decides when each of its methods is
//! actually worth calling. Implementations are expected to be synchronous
//! and may block on network I/O; deadlines and cancellation belong to the
//! transport, not to this layer.

use crate::lifecycle::Engagement;

/// Identity of a monitored entity (e.g. an opposing party in an engagement).
///
/// A dedicated newtype rather than a bare integer so that "no identity yet"
/// is expressed as `Option<EntityId>` instead of a zero sentinel that could
/// collide with a legitimate identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read-only remote API consumed by the optimization layer.
///
/// Four logical endpoints, one per resource kind the layer reasons about:
///
/// - **engagements** - candidate items used to determine the lifecycle phase
/// - **locked** - a resource that cannot change while an engagement is locked
///   in (cached with a dynamically extended TTL)
/// - **profile** - per-identity basic data (cached per [`EntityId`])
/// - **feed** - high-churn event data (never cached)
///
/// Transport failures are returned verbatim through [`RemoteSource::Error`];
/// the optimization layer neither retries nor wraps them.
pub trait RemoteSource: Send + Sync {
    /// Payload of the locked resource.
    type Locked: Clone;
    /// Payload of the per-identity profile resource.
    type Profile: Clone;
    /// A single event from the dynamic feed.
    type FeedEvent;
    /// Transport error type, propagated unmodified to callers.
    type Error: std::error::Error;

    /// Fetch the current candidate engagements.
    fn fetch_engagements(&self) -> Result<Vec<Engagement>, Self::Error>;

    /// Fetch the locked resource.
    fn fetch_locked(&self) -> Result<Self::Locked, Self::Error>;

    /// Fetch basic data for one entity.
    fn fetch_profile(&self, id: EntityId) -> Result<Self::Profile, Self::Error>;

    /// Fetch the dynamic event feed.
    fn fetch_feed(&self) -> Result<Vec<Self::FeedEvent>, Self::Error>;
}
