//! Timer scheduling driven by the host tick.
//!
//! The host environment only provides a coarse per-frame tick, so every
//! delay in the crate (heartbeat, receive-timeout, reconnect back-off) is a
//! timer registered here and fired from [`TimerScheduler::update`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `queue` | Indexed min-heap ordered by `(expire_at, order)` |
//! | `scheduler` | Timer lifecycle: start, stop, pause, resume, update |

// ============================================================================
// Submodules
// ============================================================================

mod queue;

/// Timer lifecycle and the tick loop.
pub mod scheduler;

// ============================================================================
// Re-exports
// ============================================================================

pub use scheduler::{MAX_ORDER_INDEX, Repeat, TimerCallback, TimerScheduler};
