//! # Refresh throttling: bound render rate, bound staleness.
//!
//! [`RefreshScheduler`] holds the throttle state shared between the owning
//! task's `refresh` calls and the ticker worker.
//!
//! ## Algorithm
//! ```text
//! refresh() ──► request():
//!     window open AND no render in flight  → RenderNow  (caller renders inline)
//!     otherwise                            → Coalesced  (pending = true)
//!
//! ticker, every refresh_interval ──► take_tick():
//!     pending AND no render in flight      → claim it, render exactly once
//! ```
//!
//! This guarantees:
//! (a) at most one render per interval window,
//! (b) after a burst of refresh calls the last state is rendered exactly
//!     once more within one window,
//! (c) the `in_flight` flag plus the card's render lock keep renders for one
//!     document from ever overlapping.
//!
//! ## Rules
//! - Coalesced calls never queue; bursts collapse into one pending flag.
//! - The window is measured start-to-start (`last_render_at` is set when a
//!   render is claimed, not when it completes).
//! - Uses `tokio::time::Instant`, so paused-clock tests drive the window.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Outcome of a refresh request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RefreshDecision {
    /// The caller should render now (inline, blocking until stored).
    RenderNow,
    /// The call was coalesced; the ticker will render within one window.
    Coalesced,
}

struct ThrottleState {
    last_render_at: Option<Instant>,
    pending: bool,
    in_flight: bool,
}

/// Throttle state for one card's renders.
pub(crate) struct RefreshScheduler {
    min_interval: Duration,
    state: Mutex<ThrottleState>,
}

impl RefreshScheduler {
    pub(crate) fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            state: Mutex::new(ThrottleState {
                last_render_at: None,
                pending: false,
                in_flight: false,
            }),
        }
    }

    /// Returns the throttle window.
    pub(crate) fn interval(&self) -> Duration {
        self.min_interval
    }

    /// Decides whether a refresh call renders inline or is coalesced.
    ///
    /// On `RenderNow` the in-flight flag is claimed and `last_render_at`
    /// advances; the caller must invoke [`complete`](Self::complete) when the
    /// render finishes, success or not.
    pub(crate) fn request(&self) -> RefreshDecision {
        let mut state = self.lock();
        let now = Instant::now();
        let window_open = state
            .last_render_at
            .map_or(true, |t| now.duration_since(t) >= self.min_interval);

        if window_open && !state.in_flight {
            state.in_flight = true;
            state.last_render_at = Some(now);
            RefreshDecision::RenderNow
        } else {
            state.pending = true;
            RefreshDecision::Coalesced
        }
    }

    /// Marks coalesced work pending (used when the feed delivered updates
    /// outside any refresh call).
    pub(crate) fn note_pending(&self) {
        self.lock().pending = true;
    }

    /// Claims the pending render on a ticker fire.
    ///
    /// Returns true if the ticker should render now; the pending flag is
    /// cleared and the in-flight flag claimed. The caller must invoke
    /// [`complete`](Self::complete) afterwards.
    pub(crate) fn take_tick(&self) -> bool {
        let mut state = self.lock();
        if state.pending && !state.in_flight {
            state.pending = false;
            state.in_flight = true;
            state.last_render_at = Some(Instant::now());
            true
        } else {
            false
        }
    }

    /// Releases the in-flight claim after a render finishes.
    pub(crate) fn complete(&self) {
        self.lock().in_flight = false;
    }

    /// Returns true if a coalesced render is waiting for the next tick.
    pub(crate) fn is_pending(&self) -> bool {
        self.lock().pending
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ThrottleState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_request_renders_immediately() {
        let sched = RefreshScheduler::new(Duration::from_secs(1));
        assert_eq!(sched.request(), RefreshDecision::RenderNow);
        sched.complete();
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_inside_window_coalesces_to_one_pending() {
        let sched = RefreshScheduler::new(Duration::from_secs(1));
        assert_eq!(sched.request(), RefreshDecision::RenderNow);
        sched.complete();

        for _ in 0..10 {
            assert_eq!(sched.request(), RefreshDecision::Coalesced);
        }
        assert!(sched.is_pending());

        // One window later the ticker claims exactly one render.
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(sched.take_tick());
        sched.complete();
        assert!(!sched.take_tick());
        assert!(!sched.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_reopens_after_interval() {
        let sched = RefreshScheduler::new(Duration::from_secs(1));
        assert_eq!(sched.request(), RefreshDecision::RenderNow);
        sched.complete();

        assert_eq!(sched.request(), RefreshDecision::Coalesced);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(sched.request(), RefreshDecision::RenderNow);
        sched.complete();
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_render_coalesces_even_with_open_window() {
        let sched = RefreshScheduler::new(Duration::from_millis(10));
        assert_eq!(sched.request(), RefreshDecision::RenderNow);

        // Window reopens but the first render has not completed yet.
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(sched.request(), RefreshDecision::Coalesced);

        sched.complete();
        assert!(sched.take_tick());
        sched.complete();
    }
}
