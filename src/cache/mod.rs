//! Adaptive TTL cache over the remote source.
//!
//! The cache trades staleness for calls: each resource kind carries a base
//! TTL, and the locked-during-activity resource additionally gets its TTL
//! stretched while the lifecycle says its real-world value cannot change.
//! The high-churn feed is never cached.
//!
//! # Thread Safety
//!
//! One coarse reader/writer lock guards all entries. A concurrent miss may
//! cause two callers to both call through; that costs at most one extra
//! remote call and is accepted rather than serialized.

mod config;
mod reader;

pub use config::CacheConfig;
pub use reader::{CacheSnapshot, CachedReader, LockHint};
