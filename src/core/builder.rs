//! # Builder for constructing a live card.
//!
//! Wires the bus, subscriber workers, sink, and ticker worker together.
//! `build()` spawns tasks and therefore requires a tokio runtime context.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::CardConfig;
use crate::core::barrier::FinalizeBarrier;
use crate::core::card::{spawn_ticker, CardInner, LiveCard, UpdateBatch};
use crate::core::gate::ArtifactGate;
use crate::core::scheduler::RefreshScheduler;
use crate::document::Document;
use crate::events::Bus;
use crate::sink::{ArtifactSink, MemorySink};
use crate::slot::LatestSlot;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for constructing a [`LiveCard`] with optional collaborators.
pub struct LiveCardBuilder {
    name: String,
    cfg: CardConfig,
    sink: Option<Arc<dyn ArtifactSink>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    feed: Option<Arc<LatestSlot<UpdateBatch>>>,
}

impl LiveCardBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: CardConfig) -> Self {
        Self {
            name: "card".to_string(),
            cfg,
            sink: None,
            subscribers: Vec::new(),
            feed: None,
        }
    }

    /// Sets the card name (used in events and sink paths).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the artifact sink. Defaults to an in-memory sink.
    pub fn with_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive render lifecycle events through dedicated workers
    /// with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Attaches a sidecar feed slot.
    ///
    /// An independent producer publishes update batches into the slot; the
    /// ticker worker applies the latest batch before each scheduled render.
    pub fn with_feed(mut self, feed: Arc<LatestSlot<UpdateBatch>>) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Builds the card and spawns its runtime workers.
    ///
    /// This consumes the builder and initializes:
    /// - the event bus and the subscriber listener
    /// - subscriber workers (one per subscriber, bounded queues)
    /// - the ticker worker driving coalesced renders
    pub fn build(self) -> LiveCard {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        spawn_subscriber_listener(&bus, Arc::downgrade(&subs));

        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(MemorySink::new()) as Arc<dyn ArtifactSink>);

        let inner = Arc::new(CardInner {
            name: Arc::from(self.name.as_str()),
            scheduler: RefreshScheduler::new(self.cfg.refresh_interval_clamped()),
            cfg: self.cfg,
            document: Document::new(),
            barrier: FinalizeBarrier::new(),
            gate: ArtifactGate::new(),
            bus,
            subs,
            sink,
            feed: self.feed,
            render_lock: tokio::sync::Mutex::new(()),
            worker_token: CancellationToken::new(),
        });
        spawn_ticker(&inner);
        LiveCard::from_inner(inner)
    }
}

/// Subscribes to the bus and forwards events to the subscriber set
/// (fire-and-forget).
///
/// Holds only a weak reference to the set, so dropping the card tears the
/// listener and the subscriber workers down with it.
fn spawn_subscriber_listener(bus: &Bus, set: std::sync::Weak<SubscriberSet>) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => {
                    let Some(set) = set.upgrade() else { break };
                    set.emit(&ev);
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
