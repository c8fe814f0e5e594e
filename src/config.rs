//! # Global card configuration.
//!
//! Provides [`CardConfig`] centralized settings for a live card: refresh
//! throttling, render deadlines, the finalization grace period, event bus
//! capacity, and the artifact reload policy.
//!
//! Config is used in two ways:
//! 1. **Card creation**: `LiveCard::builder(config)`
//! 2. **Scheduler wiring**: the refresh interval drives the ticker worker
//!
//! ## Sentinel values
//! - `render_timeout = 0s` → no per-render deadline
//! - `refresh_interval` is clamped to a minimum of 1ms by the scheduler

use std::time::Duration;

use crate::reload::ReloadPolicy;

/// Global configuration for one live card.
///
/// Defines:
/// - **Refresh throttling**: minimum interval between renders
/// - **Render deadlines**: per-render timeout for slow sinks
/// - **Finalization behavior**: grace period for draining in-flight renders
/// - **Event system**: bus capacity for event delivery
/// - **Reload policy**: how consumers decide to reuse stored artifacts
///
/// ## Field semantics
/// - `refresh_interval`: throttle window; at most one render per window
/// - `render_timeout`: deadline for one render incl. the sink store (`0s` = none)
/// - `grace`: maximum wait for in-flight runtime renders at finalization
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `reload`: default reload policy attached to the card
#[derive(Clone, Debug)]
pub struct CardConfig {
    /// Minimum interval between two renders of the same card.
    ///
    /// Refresh calls arriving faster than this are coalesced: the `pending`
    /// flag is set and the ticker worker performs exactly one render on the
    /// next interval boundary.
    pub refresh_interval: Duration,

    /// Deadline for a single render, including the artifact sink hand-off.
    ///
    /// - `Duration::ZERO` = no deadline
    /// - `> 0` = the render is abandoned after this long and the generation
    ///   is discarded (the next render supersedes it)
    pub render_timeout: Duration,

    /// Maximum time finalization waits for in-flight runtime renders.
    ///
    /// When `finalize()` is called:
    /// - no new runtime renders are admitted
    /// - the barrier waits up to `grace` for started renders to complete
    /// - stragglers are cancelled cooperatively and their output discarded
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages
    /// will observe `Lagged` and skip older items. Minimum value is 1
    /// (enforced by Bus).
    pub bus_capacity: usize,

    /// Reload policy governing artifact reuse by polling consumers.
    pub reload: ReloadPolicy,
}

impl CardConfig {
    /// Returns the per-render deadline as an `Option`.
    ///
    /// - `None` → no deadline
    /// - `Some(d)` → render abandoned after `d`
    #[inline]
    pub fn render_timeout_opt(&self) -> Option<Duration> {
        if self.render_timeout == Duration::ZERO {
            None
        } else {
            Some(self.render_timeout)
        }
    }

    /// Returns the refresh interval clamped to a minimum of 1ms.
    ///
    /// The scheduler uses this value so a zero interval cannot busy-spin
    /// the ticker worker.
    #[inline]
    pub fn refresh_interval_clamped(&self) -> Duration {
        self.refresh_interval.max(Duration::from_millis(1))
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    ///
    /// The `Bus` should use this value to avoid constructing an invalid channel.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for CardConfig {
    /// Default configuration:
    ///
    /// - `refresh_interval = 1s` (one render per second at most)
    /// - `render_timeout = 30s` (slow sinks abandoned after half a minute)
    /// - `grace = 10s` (finalization drain window)
    /// - `bus_capacity = 1024` (good baseline)
    /// - `reload = ReloadPolicy::OnChange` (reuse artifacts with equal tokens)
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(1),
            render_timeout: Duration::from_secs(30),
            grace: Duration::from_secs(10),
            bus_capacity: 1024,
            reload: ReloadPolicy::OnChange,
        }
    }
}
