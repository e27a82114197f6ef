//! GPU resources owned by the probe subsystem.

pub mod ping_pong;
pub mod pool;
pub mod version_tracker;

pub use ping_pong::PingPong;
pub use pool::{CaptureTargets, PoolChanges, ProbeResourcePool};
pub use version_tracker::VersionObserver;
