//! # Render lifecycle events emitted by the card runtime.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Render events**: the flow of one render pass (starting, stored, failed,
//!   timed out, discarded)
//! - **Refresh events**: throttling decisions (coalesced bursts)
//! - **Finalization events**: the barrier protocol (requested, drained,
//!   grace exceeded, finalized)
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! card name, render generations, reasons, and tokens.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order. Render generations are a separate counter scoped
//! to one card; `seq` orders events, generations order artifacts.
//!
//! ## Example
//! ```rust
//! use livecard::{Event, EventKind};
//!
//! let ev = Event::now(EventKind::RenderFailed)
//!     .with_card("training")
//!     .with_generation(4)
//!     .with_reason("sink unreachable");
//!
//! assert_eq!(ev.kind, EventKind::RenderFailed);
//! assert_eq!(ev.card.as_deref(), Some("training"));
//! assert_eq!(ev.generation, Some(4));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of render lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `card`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `card`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Refresh events ===
    /// A refresh call arrived inside the throttle window and was coalesced.
    ///
    /// Sets:
    /// - `card`: card name
    RefreshCoalesced,

    // === Render events ===
    /// A render pass is starting.
    ///
    /// Sets:
    /// - `card`: card name
    /// - `generation`: render generation
    RenderStarting,

    /// A render pass completed and its artifact was stored.
    ///
    /// Sets:
    /// - `card`: card name
    /// - `generation`: render generation
    /// - `token`: the artifact's content token
    RenderStored,

    /// A render pass failed (sink error); the document is unaffected.
    ///
    /// Sets:
    /// - `card`: card name
    /// - `generation`: render generation
    /// - `reason`: failure message
    RenderFailed,

    /// A render exceeded its deadline and its generation was abandoned.
    ///
    /// Sets:
    /// - `card`: card name
    /// - `generation`: abandoned generation
    /// - `timeout_ms`: the deadline (ms)
    RenderTimeout,

    /// A stale or abandoned render's output was dropped by the artifact gate.
    ///
    /// Sets:
    /// - `card`: card name
    /// - `generation`: discarded generation
    /// - `reason`: why the write was dropped (e.g., "stale", "sealed")
    RenderDiscarded,

    // === Finalization events ===
    /// Finalization was requested; no new runtime renders are admitted.
    ///
    /// Sets:
    /// - `card`: card name
    /// - `generation`: the reserved final generation
    FinalizeRequested,

    /// All in-flight runtime renders drained within the grace period.
    ///
    /// Sets:
    /// - `card`: card name
    FinalizeDrained,

    /// Grace period exceeded; straggling renders were cancelled and their
    /// output will be discarded. A warning, never fatal.
    ///
    /// Sets:
    /// - `card`: card name
    /// - `timeout_ms`: the grace period (ms)
    FinalizeGraceExceeded,

    /// The final render completed and the card reached its terminal state.
    ///
    /// Sets:
    /// - `card`: card name
    /// - `generation`: the final generation
    /// - `token`: the final content token
    Finalized,
}

/// Render lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Card (or subscriber) name, if applicable.
    pub card: Option<Arc<str>>,
    /// Render generation, if applicable.
    pub generation: Option<u64>,
    /// Content token attached to a stored artifact.
    pub token: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Deadline or grace period in milliseconds (compact).
    pub timeout_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next
    /// sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            card: None,
            generation: None,
            token: None,
            reason: None,
            timeout_ms: None,
        }
    }

    /// Attaches a card (or subscriber) name.
    #[inline]
    pub fn with_card(mut self, card: impl Into<Arc<str>>) -> Self {
        self.card = Some(card.into());
        self
    }

    /// Attaches a render generation.
    #[inline]
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Attaches a content token.
    #[inline]
    pub fn with_token(mut self, token: impl Into<Arc<str>>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a deadline or grace period (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::now(EventKind::SubscriberOverflow)
            .with_card(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::now(EventKind::SubscriberPanicked)
            .with_card(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::now(EventKind::RenderStarting);
        let b = Event::now(EventKind::RenderStored);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builders_set_fields() {
        let ev = Event::now(EventKind::RenderTimeout)
            .with_card("demo")
            .with_generation(9)
            .with_timeout(Duration::from_secs(2));
        assert_eq!(ev.card.as_deref(), Some("demo"));
        assert_eq!(ev.generation, Some(9));
        assert_eq!(ev.timeout_ms, Some(2_000));
    }
}
