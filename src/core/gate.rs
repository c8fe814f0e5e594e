//! # Artifact gate: generation watermark with last-writer-wins ordering.
//!
//! Every artifact commit flows through the [`ArtifactGate`] before the sink
//! is touched. The gate keeps the highest generation whose store has begun
//! and a sealed flag set by the final render, so stale and abandoned renders
//! are detected and their writes dropped.
//!
//! ## Rules
//! - A commit whose generation is **below the watermark** is stale: a newer
//!   runtime render has already begun storing. Dropped.
//! - Once **sealed** by the final render, every non-final commit is dropped,
//!   regardless of when it was started. This is what stops a slow runtime
//!   render from clobbering the authoritative final artifact.
//! - Admission raises the watermark, so ordering is decided at store-begin
//!   time; the render lock makes admission + store atomic per render.
//!
//! ```text
//! try_begin(5, Runtime)  → Admit      watermark=5
//! try_begin(7, Runtime)  → Admit      watermark=7
//! try_begin(6, Runtime)  → Stale      (7 already began)
//! try_begin(8, Final)    → Admit      watermark=8, sealed
//! try_begin(4, Runtime)  → Sealed     (abandoned straggler, dropped)
//! ```

use std::sync::Mutex;

use crate::artifact::{ContentToken, RenderStatus};

/// Outcome of asking the gate to admit a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum GateDecision {
    /// The store may proceed.
    Admit,
    /// A newer generation already began storing; drop this write.
    Stale,
    /// The final artifact is in place (or in flight); drop this write.
    Sealed,
}

#[derive(Default)]
struct GateState {
    watermark: u64,
    sealed: bool,
    final_generation: Option<u64>,
    last_token: Option<ContentToken>,
}

/// Generation watermark guarding the artifact sink.
#[derive(Default)]
pub(crate) struct ArtifactGate {
    state: Mutex<GateState>,
}

impl ArtifactGate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Decides whether a render of `generation`/`status` may store its
    /// artifact, raising the watermark (and sealing, for the final render)
    /// on admission.
    pub(crate) fn try_begin(&self, generation: u64, status: RenderStatus) -> GateDecision {
        let mut state = self.lock();
        match status {
            RenderStatus::Final => {
                state.sealed = true;
                state.final_generation = Some(generation);
                state.watermark = generation;
                GateDecision::Admit
            }
            RenderStatus::Runtime => {
                if state.sealed {
                    GateDecision::Sealed
                } else if generation < state.watermark {
                    GateDecision::Stale
                } else {
                    state.watermark = generation;
                    GateDecision::Admit
                }
            }
        }
    }

    /// Records the token of a successfully stored artifact.
    pub(crate) fn record_token(&self, token: ContentToken) {
        self.lock().last_token = Some(token);
    }

    /// Returns the token of the last successfully stored artifact.
    pub(crate) fn last_token(&self) -> Option<ContentToken> {
        self.lock().last_token.clone()
    }

    /// Returns true once the final render has been admitted.
    pub(crate) fn is_sealed(&self) -> bool {
        self.lock().sealed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GateState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watermark_orders_runtime_generations() {
        let gate = ArtifactGate::new();
        assert_eq!(gate.try_begin(5, RenderStatus::Runtime), GateDecision::Admit);
        assert_eq!(gate.try_begin(7, RenderStatus::Runtime), GateDecision::Admit);
        assert_eq!(gate.try_begin(6, RenderStatus::Runtime), GateDecision::Stale);
    }

    #[test]
    fn test_seal_drops_straggling_runtime_writes() {
        let gate = ArtifactGate::new();
        assert_eq!(gate.try_begin(3, RenderStatus::Runtime), GateDecision::Admit);
        assert_eq!(gate.try_begin(9, RenderStatus::Final), GateDecision::Admit);
        assert!(gate.is_sealed());

        // A straggler that started before finalization must not land now.
        assert_eq!(gate.try_begin(4, RenderStatus::Runtime), GateDecision::Sealed);
        assert_eq!(gate.try_begin(10, RenderStatus::Runtime), GateDecision::Sealed);
    }

    #[test]
    fn test_last_token_tracks_stores() {
        let gate = ArtifactGate::new();
        assert!(gate.last_token().is_none());

        gate.record_token(ContentToken::runtime(1));
        assert_eq!(gate.last_token(), Some(ContentToken::runtime(1)));

        gate.record_token(ContentToken::final_token());
        assert_eq!(gate.last_token(), Some(ContentToken::final_token()));
    }
}
