//! # Execute a single render pass.
//!
//! Produces one artifact from a point-in-time document snapshot, hands it to
//! the sink with an optional deadline, and publishes lifecycle events to the
//! [`Bus`].
//!
//! ## Event flow
//! ```text
//! admitted:
//!   gate.try_begin → Admit → publish RenderStarting → snapshot → store
//!        └─ Ok   → publish RenderStored
//!        └─ Err  → publish RenderFailed (sink error)
//!        └─ deadline exceeded → publish RenderTimeout, generation abandoned
//!        └─ cancelled during finalization → publish RenderDiscarded
//!
//! dropped:
//!   gate.try_begin → Stale/Sealed → publish RenderDiscarded, no store
//! ```
//!
//! ## Rules
//! - The caller holds the card's render lock: admission + store are atomic
//!   per render, so no two renders for one document ever overlap.
//! - The snapshot happens after admission and is consistent: concurrent
//!   updates are either fully visible or not at all.
//! - A dropped or abandoned render is **not** an error to the protocol; only
//!   sink failures and timeouts surface to the caller.

use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::artifact::{Artifact, ContentToken, RenderStatus};
use crate::core::gate::{ArtifactGate, GateDecision};
use crate::document::Document;
use crate::error::RenderError;
use crate::events::{Bus, Event, EventKind};
use crate::sink::ArtifactSink;

/// Executes a single render of `document`, publishing lifecycle events to `bus`.
///
/// ### Flow
/// 1. Ask the gate to admit this generation (stale/sealed writes are dropped)
/// 2. Snapshot the document (consistent, in document order)
/// 3. Hand the artifact to the sink, bounded by `timeout`
/// 4. Publish the terminal event and record the content token
///
/// ### Cancellation semantics
/// Runtime renders race their sink hand-off against `cancel` (the barrier's
/// straggler token): once finalization gives up on a render, its store is
/// abandoned mid-flight and its output never lands. The final render ignores
/// the token — it must complete.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn render_once(
    document: &Document,
    gate: &ArtifactGate,
    sink: &dyn ArtifactSink,
    bus: &Bus,
    card: &str,
    generation: u64,
    status: RenderStatus,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<(), RenderError> {
    match gate.try_begin(generation, status) {
        GateDecision::Admit => {}
        GateDecision::Stale => {
            publish_discarded(bus, card, generation, "stale");
            return Ok(());
        }
        GateDecision::Sealed => {
            publish_discarded(bus, card, generation, "sealed");
            return Ok(());
        }
    }

    bus.publish(
        Event::now(EventKind::RenderStarting)
            .with_card(card)
            .with_generation(generation),
    );

    let token = match status {
        RenderStatus::Final => ContentToken::final_token(),
        RenderStatus::Runtime => ContentToken::runtime(generation),
    };
    let artifact = Artifact {
        card: card.to_string(),
        status,
        generation,
        token: token.clone(),
        records: document.snapshot(),
    };

    let store = store_with_deadline(sink, &artifact, timeout, generation, bus, card);
    let res = match status {
        RenderStatus::Runtime => {
            tokio::select! {
                r = store => r,
                _ = cancel.cancelled() => {
                    publish_discarded(bus, card, generation, "abandoned");
                    Err(RenderError::Canceled)
                }
            }
        }
        RenderStatus::Final => store.await,
    };

    match res {
        Ok(()) => {
            gate.record_token(token.clone());
            bus.publish(
                Event::now(EventKind::RenderStored)
                    .with_card(card)
                    .with_generation(generation)
                    .with_token(token.as_str().to_string()),
            );
            Ok(())
        }
        Err(RenderError::Sink(e)) => {
            bus.publish(
                Event::now(EventKind::RenderFailed)
                    .with_card(card)
                    .with_generation(generation)
                    .with_reason(e.to_string()),
            );
            Err(RenderError::Sink(e))
        }
        Err(e) => Err(e),
    }
}

/// Runs the sink hand-off, bounded by the configured deadline.
async fn store_with_deadline(
    sink: &dyn ArtifactSink,
    artifact: &Artifact,
    timeout: Option<Duration>,
    generation: u64,
    bus: &Bus,
    card: &str,
) -> Result<(), RenderError> {
    match timeout {
        Some(dur) => match time::timeout(dur, sink.store(artifact)).await {
            Ok(r) => r.map_err(RenderError::from),
            Err(_elapsed) => {
                bus.publish(
                    Event::now(EventKind::RenderTimeout)
                        .with_card(card)
                        .with_generation(generation)
                        .with_timeout(dur),
                );
                Err(RenderError::Timeout {
                    timeout: dur,
                    generation,
                })
            }
        },
        None => sink.store(artifact).await.map_err(RenderError::from),
    }
}

/// Publishes `RenderDiscarded` for a dropped or abandoned write.
fn publish_discarded(bus: &Bus, card: &str, generation: u64, reason: &'static str) {
    bus.publish(
        Event::now(EventKind::RenderDiscarded)
            .with_card(card)
            .with_generation(generation)
            .with_reason(reason),
    );
}
