//! # Finalization barrier: the runtime/final render reconciliation protocol.
//!
//! A document is rendered from two execution contexts: the runtime path
//! (periodic, possibly slow, interruptible) and the final path (exactly once,
//! at task completion). The [`FinalizeBarrier`] owns the phase state machine
//! and the in-flight render bookkeeping that reconciles them.
//!
//! ## State machine
//! ```text
//! Running ──► Finalizing ──► Finalized        (no transition back)
//!
//! Running:     runtime renders admitted, each with a fresh generation
//! Finalizing:  new runtime renders rejected; started ones drain (or are
//!              cancelled after the grace period)
//! Finalized:   terminal; update/refresh are output no-ops
//! ```
//!
//! ## Rules
//! - Generations increase monotonically; the final render's generation is
//!   allocated at the `Running → Finalizing` transition, so it is greater
//!   than every runtime generation that was ever admitted.
//! - `drain` waits for every tracked render that had already started; the
//!   grace period bounds the wait.
//! - Stragglers past the grace period are cancelled cooperatively; their
//!   eventual output is discarded by the artifact gate, never by luck.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Finalization phase of a live card.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// The owning task is executing; runtime renders are admitted.
    Running,
    /// Completion signalled; in-flight renders drain, new ones are rejected.
    Finalizing,
    /// The final render happened (or was attempted); terminal.
    Finalized,
}

const RUNNING: u8 = 0;
const FINALIZING: u8 = 1;
const FINALIZED: u8 = 2;

/// Phase state machine plus in-flight render tracking.
pub(crate) struct FinalizeBarrier {
    phase: AtomicU8,
    generations: AtomicU64,
    tracker: TaskTracker,
    stragglers: CancellationToken,
}

impl FinalizeBarrier {
    pub(crate) fn new() -> Self {
        Self {
            phase: AtomicU8::new(RUNNING),
            generations: AtomicU64::new(1),
            tracker: TaskTracker::new(),
            stragglers: CancellationToken::new(),
        }
    }

    /// Returns the current phase.
    pub(crate) fn phase(&self) -> Phase {
        match self.phase.load(Ordering::Acquire) {
            RUNNING => Phase::Running,
            FINALIZING => Phase::Finalizing,
            _ => Phase::Finalized,
        }
    }

    /// Returns true while runtime renders are admitted.
    pub(crate) fn is_running(&self) -> bool {
        self.phase.load(Ordering::Acquire) == RUNNING
    }

    /// Allocates the next runtime render generation.
    ///
    /// Returns `None` once finalization has begun: new runtime renders are
    /// rejected from that instant. The phase check and the counter bump are
    /// not one atomic step; a render that slips through the window is still
    /// harmless because its generation is below the final one and the
    /// artifact gate orders all stores.
    pub(crate) fn next_generation(&self) -> Option<u64> {
        if !self.is_running() {
            return None;
        }
        Some(self.generations.fetch_add(1, Ordering::AcqRel))
    }

    /// Tracks an in-flight render so `drain` can wait for it.
    pub(crate) fn track<F>(&self, future: F) -> impl std::future::Future<Output = F::Output>
    where
        F: std::future::Future,
    {
        self.tracker.track_future(future)
    }

    /// Transitions `Running → Finalizing` and allocates the final render
    /// generation.
    ///
    /// Returns `None` if finalization has already begun (idempotent callers
    /// treat that as a no-op). The in-flight tracker is closed here, so
    /// `drain` completes once the already-started renders finish.
    pub(crate) fn begin_finalizing(&self) -> Option<u64> {
        self.phase
            .compare_exchange(RUNNING, FINALIZING, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.tracker.close();
        Some(self.generations.fetch_add(1, Ordering::AcqRel))
    }

    /// Waits until every tracked render has finished, bounded by `grace`.
    ///
    /// Returns true if everything drained in time, false on timeout.
    pub(crate) async fn drain(&self, grace: Duration) -> bool {
        tokio::time::timeout(grace, self.tracker.wait())
            .await
            .is_ok()
    }

    /// Cancels straggling runtime renders cooperatively.
    pub(crate) fn abandon_stragglers(&self) {
        self.stragglers.cancel();
    }

    /// Token observed by runtime renders during their sink hand-off.
    pub(crate) fn straggler_token(&self) -> CancellationToken {
        self.stragglers.clone()
    }

    /// Transitions to the terminal phase.
    pub(crate) fn mark_finalized(&self) {
        self.phase.store(FINALIZED, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_phase_transitions_are_one_way() {
        let barrier = FinalizeBarrier::new();
        assert_eq!(barrier.phase(), Phase::Running);

        let final_gen = barrier.begin_finalizing().expect("first transition");
        assert_eq!(barrier.phase(), Phase::Finalizing);
        assert!(barrier.begin_finalizing().is_none());

        barrier.mark_finalized();
        assert_eq!(barrier.phase(), Phase::Finalized);
        assert!(barrier.begin_finalizing().is_none());
        assert!(final_gen >= 1);
    }

    #[tokio::test]
    async fn test_generations_rejected_after_finalizing() {
        let barrier = FinalizeBarrier::new();
        let g1 = barrier.next_generation().unwrap();
        let g2 = barrier.next_generation().unwrap();
        assert!(g2 > g1);

        let final_gen = barrier.begin_finalizing().unwrap();
        assert!(final_gen > g2);
        assert!(barrier.next_generation().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_waits_for_tracked_renders() {
        let barrier = std::sync::Arc::new(FinalizeBarrier::new());

        let tracked = barrier.track(async {
            tokio::time::sleep(Duration::from_secs(2)).await;
        });
        let handle = tokio::spawn(tracked);

        barrier.begin_finalizing().unwrap();
        assert!(barrier.drain(Duration::from_secs(5)).await);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_times_out_on_stuck_render() {
        let barrier = std::sync::Arc::new(FinalizeBarrier::new());
        let stuck = barrier.straggler_token();

        let tracked = barrier.track(async move {
            stuck.cancelled().await;
        });
        let handle = tokio::spawn(tracked);

        barrier.begin_finalizing().unwrap();
        assert!(!barrier.drain(Duration::from_secs(1)).await);

        barrier.abandon_stragglers();
        handle.await.unwrap();
    }
}
