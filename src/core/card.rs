//! # LiveCard: orchestrates the document, scheduler, barrier, and sink.
//!
//! The [`LiveCard`] owns the event bus, a [`SubscriberSet`], the component
//! [`Document`], and the render machinery. It spawns the ticker worker,
//! serializes every render path behind one lock, and runs the finalization
//! protocol when the owning task completes.
//!
//! ## High-level architecture
//! ```text
//! owning task:                         ticker worker (spawned):
//!   update("id", ..) ─► Document         every refresh_interval:
//!   refresh() ─► RefreshScheduler          ├─ drain feed slot → apply updates
//!       ├─ RenderNow  → render inline      └─ pending? → render exactly once
//!       └─ Coalesced  → pending flag
//!
//! every render (runtime or final):
//!   FinalizeBarrier.next_generation() → render_lock → render_once()
//!        └─ gate.try_begin → snapshot → sink.store → events
//!
//! finalize():
//!   begin_finalizing (CAS, allocates final generation)
//!     ├─ stop ticker
//!     ├─ drain in-flight renders (grace timeout, then cancel stragglers)
//!     ├─ exactly one final render (token "final", gate sealed)
//!     └─ phase → Finalized
//! ```
//!
//! ## Rules
//! - Renders observe updates in program order: an update issued before a
//!   refresh in the same context is visible to that refresh's render.
//! - At most one render executes at a time for one card (render lock).
//! - After `Finalized`, `update`/`refresh`/`finalize` are output no-ops.

use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::artifact::{ContentToken, RenderStatus};
use crate::components::{Component, Update};
use crate::config::CardConfig;
use crate::core::barrier::{FinalizeBarrier, Phase};
use crate::core::gate::ArtifactGate;
use crate::core::renderer::render_once;
use crate::core::scheduler::{RefreshDecision, RefreshScheduler};
use crate::document::Document;
use crate::error::{DocumentError, RenderError};
use crate::events::{Bus, Event, EventKind};
use crate::reload::ReloadDecision;
use crate::sink::ArtifactSink;
use crate::slot::LatestSlot;
use crate::subscribers::SubscriberSet;

/// A batch of component updates delivered through a sidecar feed slot.
pub type UpdateBatch = Vec<(String, Update)>;

pub(crate) struct CardInner {
    pub(crate) name: Arc<str>,
    pub(crate) cfg: CardConfig,
    pub(crate) document: Document,
    pub(crate) scheduler: RefreshScheduler,
    pub(crate) barrier: FinalizeBarrier,
    pub(crate) gate: ArtifactGate,
    pub(crate) bus: Bus,
    #[allow(dead_code)]
    pub(crate) subs: Arc<SubscriberSet>,
    pub(crate) sink: Arc<dyn ArtifactSink>,
    pub(crate) feed: Option<Arc<LatestSlot<UpdateBatch>>>,
    pub(crate) render_lock: tokio::sync::Mutex<()>,
    pub(crate) worker_token: CancellationToken,
}

impl Drop for CardInner {
    fn drop(&mut self) {
        self.worker_token.cancel();
    }
}

/// A live, incrementally updatable card document.
///
/// Cheap to clone (internally `Arc`-backed); all clones observe the same
/// document and protocol state.
#[derive(Clone)]
pub struct LiveCard {
    inner: Arc<CardInner>,
}

impl LiveCard {
    /// Starts building a card with the given configuration.
    pub fn builder(cfg: CardConfig) -> crate::core::builder::LiveCardBuilder {
        crate::core::builder::LiveCardBuilder::new(cfg)
    }

    pub(crate) fn from_inner(inner: Arc<CardInner>) -> Self {
        Self { inner }
    }

    /// Returns the card name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the component document.
    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    /// Returns the current finalization phase.
    pub fn phase(&self) -> Phase {
        self.inner.barrier.phase()
    }

    /// Subscribes to the card's event stream.
    ///
    /// Useful for monitors and tests observing the render protocol.
    pub fn events(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }

    /// Appends a component (see [`Document::append`]).
    pub fn append(&self, component: Component) -> Result<(), DocumentError> {
        self.inner.document.append(component)
    }

    /// Appends a component under an id (see [`Document::append_with_id`]).
    pub fn append_with_id(
        &self,
        component: Component,
        id: impl Into<String>,
    ) -> Result<(), DocumentError> {
        self.inner.document.append_with_id(component, id)
    }

    /// Appends multiple components preserving order (see [`Document::extend`]).
    pub fn extend(
        &self,
        components: impl IntoIterator<Item = Component>,
    ) -> Result<(), DocumentError> {
        self.inner.document.extend(components)
    }

    /// Returns a snapshot of the component under `id` (see [`Document::lookup`]).
    pub fn lookup(&self, id: &str) -> Result<Component, DocumentError> {
        self.inner.document.lookup(id)
    }

    /// Applies a tolerant update to the component registered under `id`.
    pub fn update(&self, id: &str, update: Update) -> bool {
        self.inner.document.update(id, update)
    }

    /// Requests a render through the refresh scheduler.
    ///
    /// Inside the throttle window the call is coalesced and returns
    /// immediately; the ticker worker performs the trailing render. When the
    /// window is open the render runs inline and this call blocks until the
    /// artifact is stored, surfacing sink errors to the caller.
    ///
    /// After finalization has begun this is an output no-op.
    pub async fn refresh(&self) -> Result<(), RenderError> {
        let inner = &self.inner;
        if !inner.barrier.is_running() {
            return Ok(());
        }
        match inner.scheduler.request() {
            RefreshDecision::Coalesced => {
                inner.bus.publish(
                    Event::now(EventKind::RefreshCoalesced).with_card(inner.name.clone()),
                );
                Ok(())
            }
            RefreshDecision::RenderNow => {
                let res = match inner.barrier.next_generation() {
                    Some(generation) => {
                        let render = render_locked(inner, generation, RenderStatus::Runtime);
                        inner.barrier.track(render).await
                    }
                    None => Ok(()),
                };
                inner.scheduler.complete();
                res
            }
        }
    }

    /// Performs a runtime render immediately, bypassing the refresh throttle.
    ///
    /// The monitor-side entry point: still generation-tracked, serialized
    /// against every other render, and rejected once finalization has begun.
    pub async fn render_runtime(&self) -> Result<(), RenderError> {
        let inner = &self.inner;
        let Some(generation) = inner.barrier.next_generation() else {
            return Ok(());
        };
        let render = render_locked(inner, generation, RenderStatus::Runtime);
        inner.barrier.track(render).await
    }

    /// Runs the finalization protocol: drain, then exactly one final render.
    ///
    /// 1. `Running → Finalizing`; new runtime renders are rejected
    /// 2. the ticker worker is stopped
    /// 3. in-flight renders drain, bounded by the configured grace period;
    ///    stragglers are cancelled and their output discarded (a warning,
    ///    never fatal)
    /// 4. the final render executes with the `final` token
    /// 5. the card transitions to `Finalized` — even if the final render's
    ///    sink hand-off failed, so a card is never left dead
    ///
    /// Subsequent calls are no-ops returning `Ok(())`.
    pub async fn finalize(&self) -> Result<(), RenderError> {
        let inner = &self.inner;
        let Some(final_generation) = inner.barrier.begin_finalizing() else {
            return Ok(());
        };
        inner.worker_token.cancel();
        inner.bus.publish(
            Event::now(EventKind::FinalizeRequested)
                .with_card(inner.name.clone())
                .with_generation(final_generation),
        );

        if inner.barrier.drain(inner.cfg.grace).await {
            inner
                .bus
                .publish(Event::now(EventKind::FinalizeDrained).with_card(inner.name.clone()));
        } else {
            inner.bus.publish(
                Event::now(EventKind::FinalizeGraceExceeded)
                    .with_card(inner.name.clone())
                    .with_timeout(inner.cfg.grace),
            );
            inner.barrier.abandon_stragglers();
        }

        let res = render_locked(inner, final_generation, RenderStatus::Final).await;
        inner.barrier.mark_finalized();
        inner.bus.publish(
            Event::now(EventKind::Finalized)
                .with_card(inner.name.clone())
                .with_generation(final_generation)
                .with_token(ContentToken::final_token().as_str().to_string()),
        );
        res
    }

    /// Finalizes the card when an external completion signal fires.
    ///
    /// Subscribes the card to the owning task's lifecycle: when `completion`
    /// is cancelled, the finalization protocol runs. Failures of the final
    /// render surface through the event stream.
    pub fn finalize_on(&self, completion: CancellationToken) {
        let card = self.clone();
        tokio::spawn(async move {
            completion.cancelled().await;
            let _ = card.finalize().await;
        });
    }

    /// Returns the content token of the last stored artifact.
    pub fn content_token(&self) -> Option<ContentToken> {
        self.inner.gate.last_token()
    }

    /// Decides whether a consumer holding `previous` may reuse its artifact,
    /// under this card's reload policy.
    ///
    /// Recomputes when nothing has been stored yet.
    pub fn reload_decision(&self, previous: Option<&ContentToken>) -> ReloadDecision {
        match self.inner.gate.last_token() {
            Some(current) => self.inner.cfg.reload.decide(&current, previous),
            None => ReloadDecision::Recompute,
        }
    }
}

/// Renders under the card's render lock: at most one render at a time.
async fn render_locked(
    inner: &CardInner,
    generation: u64,
    status: RenderStatus,
) -> Result<(), RenderError> {
    let _guard = inner.render_lock.lock().await;
    let cancel = inner.barrier.straggler_token();
    render_once(
        &inner.document,
        &inner.gate,
        inner.sink.as_ref(),
        &inner.bus,
        &inner.name,
        generation,
        status,
        inner.cfg.render_timeout_opt(),
        &cancel,
    )
    .await
}

/// Spawns the ticker worker for a card.
///
/// The worker fires every refresh interval, drains the sidecar feed slot,
/// and performs the coalesced trailing render when one is pending. It exits
/// when the card's worker token is cancelled (finalization) or every card
/// handle has been dropped (it holds only a weak reference).
pub(crate) fn spawn_ticker(inner: &Arc<CardInner>) {
    let token = inner.worker_token.clone();
    let interval_dur = inner.cfg.refresh_interval_clamped();
    let weak = Arc::downgrade(inner);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval_dur);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    let Some(inner) = weak.upgrade() else { break };
                    if apply_feed(&inner) {
                        inner.scheduler.note_pending();
                    }
                    if inner.scheduler.take_tick() {
                        if let Some(generation) = inner.barrier.next_generation() {
                            let render = render_locked(&inner, generation, RenderStatus::Runtime);
                            let _ = inner.barrier.track(render).await;
                        }
                        inner.scheduler.complete();
                    }
                }
            }
        }
    });
}

/// Drains the feed slot and applies the latest update batch.
///
/// Returns true if any update changed component state.
fn apply_feed(inner: &CardInner) -> bool {
    let Some(feed) = &inner.feed else {
        return false;
    };
    let Some(batch) = feed.take() else {
        return false;
    };
    let mut changed = false;
    for (id, update) in batch {
        changed |= inner.document.update(&id, update);
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::artifact::Artifact;
    use crate::components::{LineChart, Table};
    use crate::error::SinkError;
    use crate::sink::MemorySink;

    fn config(interval_ms: u64, grace_ms: u64) -> CardConfig {
        CardConfig {
            refresh_interval: Duration::from_millis(interval_ms),
            render_timeout: Duration::ZERO,
            grace: Duration::from_millis(grace_ms),
            ..CardConfig::default()
        }
    }

    /// Sink that sleeps on runtime stores (final stores land immediately).
    struct SlowSink {
        inner: MemorySink,
        delay: Duration,
    }

    #[async_trait]
    impl ArtifactSink for SlowSink {
        async fn store(&self, artifact: &Artifact) -> Result<(), SinkError> {
            if artifact.status == RenderStatus::Runtime {
                tokio::time::sleep(self.delay).await;
            }
            self.inner.store(artifact).await
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    /// Sink that fails the first `fail_remaining` stores.
    struct FlakySink {
        inner: MemorySink,
        fail_remaining: Mutex<u32>,
    }

    #[async_trait]
    impl ArtifactSink for FlakySink {
        async fn store(&self, artifact: &Artifact) -> Result<(), SinkError> {
            {
                let mut remaining = self.fail_remaining.lock().unwrap();
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(SinkError::Io {
                        reason: "sink unreachable".to_string(),
                    });
                }
            }
            self.inner.store(artifact).await
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    fn drain_kinds(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<EventKind> {
        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        kinds
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_reflects_updates_in_program_order() {
        let sink = Arc::new(MemorySink::new());
        let card = LiveCard::builder(config(1_000, 1_000))
            .with_name("demo")
            .with_sink(sink.clone())
            .build();

        card.append_with_id(Component::markdown(""), "a").unwrap();
        card.append_with_id(Component::from(Table::empty()), "b")
            .unwrap();

        card.update("a", Update::Text("v1".to_string()));
        card.refresh().await.unwrap();

        tokio::time::sleep(Duration::from_millis(1_010)).await;
        card.update("a", Update::Text("v2".to_string()));
        card.refresh().await.unwrap();

        let stored = sink.stored();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].records[0].id.as_deref(), Some("a"));
        assert_eq!(stored[0].records[0].payload, json!("v1"));
        assert_eq!(stored[0].records[1].id.as_deref(), Some("b"));
        assert_eq!(stored[0].records[1].payload, json!([]));
        assert_eq!(stored[1].records[0].payload, json!("v2"));
        assert_eq!(stored[0].token, ContentToken::runtime(stored[0].generation));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_into_one_trailing_render() {
        let sink = Arc::new(MemorySink::new());
        let card = LiveCard::builder(config(1_000, 1_000))
            .with_name("demo")
            .with_sink(sink.clone())
            .build();

        card.append_with_id(Component::markdown("0"), "counter")
            .unwrap();
        card.refresh().await.unwrap();
        assert_eq!(sink.stored().len(), 1);

        // A burst inside the window: no extra renders yet.
        for i in 1..=5 {
            card.update("counter", Update::Text(i.to_string()));
            card.refresh().await.unwrap();
        }
        assert_eq!(sink.stored().len(), 1);

        // One window later the ticker renders exactly once, with the last state.
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        let stored = sink.stored();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].records[0].payload, json!("5"));

        // No pending work left: another window passes without a render.
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(sink.stored().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finalize_waits_for_slow_runtime_render() {
        let sink = Arc::new(SlowSink {
            inner: MemorySink::new(),
            delay: Duration::from_secs(2),
        });
        let card = LiveCard::builder(config(10, 5_000))
            .with_name("demo")
            .with_sink(sink.clone())
            .build();
        card.append_with_id(Component::markdown("x"), "a").unwrap();

        // Runtime render enters its slow sink hand-off.
        let monitor = card.clone();
        let handle = tokio::spawn(async move { monitor.render_runtime().await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Completes within grace: the barrier waits, then the final render
        // is the last write.
        card.finalize().await.unwrap();
        handle.await.unwrap().unwrap();

        let stored = sink.inner.stored();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].status, RenderStatus::Runtime);
        assert_eq!(stored[1].status, RenderStatus::Final);
        assert!(stored[1].generation > stored[0].generation);
        assert_eq!(stored[1].token, ContentToken::final_token());
        assert_eq!(card.phase(), Phase::Finalized);

        // Finalize is exactly-once: a second call changes nothing.
        card.finalize().await.unwrap();
        assert_eq!(sink.inner.stored().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_generation_never_lands() {
        let sink = Arc::new(SlowSink {
            inner: MemorySink::new(),
            delay: Duration::from_secs(60),
        });
        let card = LiveCard::builder(config(10, 1_000))
            .with_name("demo")
            .with_sink(sink.clone())
            .build();
        card.append_with_id(Component::markdown("x"), "a").unwrap();
        let mut rx = card.events();

        let monitor = card.clone();
        let handle = tokio::spawn(async move { monitor.render_runtime().await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Grace (1s) elapses long before the 60s store: the straggler is
        // cancelled and the final render proceeds without it.
        card.finalize().await.unwrap();
        let res = handle.await.unwrap();
        assert!(matches!(res, Err(RenderError::Canceled)));

        let stored = sink.inner.stored();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, RenderStatus::Final);
        assert_eq!(card.phase(), Phase::Finalized);

        let kinds = drain_kinds(&mut rx);
        assert!(kinds.contains(&EventKind::FinalizeGraceExceeded));
        assert!(kinds.contains(&EventKind::RenderDiscarded));
        assert!(kinds.contains(&EventKind::Finalized));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_after_finalized_is_output_noop() {
        let sink = Arc::new(MemorySink::new());
        let card = LiveCard::builder(config(10, 1_000))
            .with_name("demo")
            .with_sink(sink.clone())
            .build();
        card.append_with_id(Component::markdown("x"), "a").unwrap();
        card.finalize().await.unwrap();

        let before = sink.stored().len();
        card.update("a", Update::Text("late".to_string()));
        card.refresh().await.unwrap();
        card.render_runtime().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(sink.stored().len(), before);
        assert_eq!(
            sink.final_artifact().unwrap().records[0].payload,
            json!("x")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_error_surfaces_and_refresh_retries() {
        let sink = Arc::new(FlakySink {
            inner: MemorySink::new(),
            fail_remaining: Mutex::new(1),
        });
        let card = LiveCard::builder(config(1_000, 1_000))
            .with_name("demo")
            .with_sink(sink.clone())
            .build();
        card.append_with_id(Component::markdown("kept"), "a").unwrap();

        let err = card.refresh().await.unwrap_err();
        assert!(matches!(err, RenderError::Sink(_)));
        assert!(err.is_retryable());

        // Document state is uncorrupted; the next window's refresh succeeds.
        tokio::time::sleep(Duration::from_millis(1_010)).await;
        card.refresh().await.unwrap();
        assert_eq!(sink.inner.stored().len(), 1);
        assert_eq!(sink.inner.stored()[0].records[0].payload, json!("kept"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_timeout_abandons_generation() {
        let sink = Arc::new(SlowSink {
            inner: MemorySink::new(),
            delay: Duration::from_secs(60),
        });
        let mut cfg = config(10, 1_000);
        cfg.render_timeout = Duration::from_secs(1);
        let card = LiveCard::builder(cfg)
            .with_name("demo")
            .with_sink(sink.clone())
            .build();
        card.append_with_id(Component::markdown("x"), "a").unwrap();

        let err = card.render_runtime().await.unwrap_err();
        assert!(matches!(err, RenderError::Timeout { .. }));
        assert!(sink.inner.stored().is_empty());

        // Never fatal: the card still finalizes normally.
        card.finalize().await.unwrap();
        assert_eq!(sink.inner.stored().len(), 1);
        assert_eq!(sink.inner.stored()[0].status, RenderStatus::Final);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_decision_tracks_stored_tokens() {
        let sink = Arc::new(MemorySink::new());
        let card = LiveCard::builder(config(1_000, 1_000))
            .with_name("demo")
            .with_sink(sink.clone())
            .build();
        card.append_with_id(Component::markdown("x"), "a").unwrap();

        // Nothing stored yet: a poller must recompute.
        assert_eq!(card.reload_decision(None), ReloadDecision::Recompute);

        card.refresh().await.unwrap();
        let runtime_token = card.content_token().unwrap();
        assert_eq!(
            card.reload_decision(Some(&runtime_token)),
            ReloadDecision::Reuse
        );

        card.finalize().await.unwrap();
        assert_eq!(
            card.reload_decision(Some(&runtime_token)),
            ReloadDecision::Recompute
        );
        assert_eq!(
            card.reload_decision(Some(&ContentToken::final_token())),
            ReloadDecision::Reuse
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_feed_batch_applied_on_tick() {
        let sink = Arc::new(MemorySink::new());
        let feed = Arc::new(LatestSlot::<UpdateBatch>::new());
        let card = LiveCard::builder(config(1_000, 1_000))
            .with_name("profiler")
            .with_sink(sink.clone())
            .with_feed(feed.clone())
            .build();
        card.append_with_id(
            Component::from(LineChart::new().with_max_size(10)),
            "cpu",
        )
        .unwrap();

        // Sidecar publishes twice before the tick: only the latest batch lands.
        feed.publish(vec![(
            "cpu".to_string(),
            Update::Point {
                label: json!("t0"),
                value: 10.0,
            },
        )]);
        feed.publish(vec![(
            "cpu".to_string(),
            Update::Point {
                label: json!("t1"),
                value: 55.0,
            },
        )]);

        tokio::time::sleep(Duration::from_millis(1_100)).await;

        let stored = sink.stored();
        assert_eq!(stored.len(), 1);
        let payload = &stored[0].records[0].payload;
        assert_eq!(payload["data"], json!([55.0]));
        assert_eq!(payload["labels"], json!(["t1"]));
        assert!(feed.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_finalize_on_completion_signal() {
        let sink = Arc::new(MemorySink::new());
        let card = LiveCard::builder(config(10, 1_000))
            .with_name("demo")
            .with_sink(sink.clone())
            .build();
        card.append_with_id(Component::markdown("done"), "a").unwrap();

        let completion = CancellationToken::new();
        card.finalize_on(completion.clone());
        completion.cancel();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(card.phase(), Phase::Finalized);
        assert!(sink.final_artifact().is_some());
    }
}
