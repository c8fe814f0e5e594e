//! # livecard
//!
//! **Livecard** is a live component-document rendering engine for Rust.
//!
//! It maintains a tree of user-mutable visual components (text blocks,
//! tables, charts, progress bars, images) attached to a long-running unit of
//! work, lets that work mutate component state incrementally while running,
//! and produces a rendered artifact on demand. The crate is designed as a
//! building block for card surfaces, dashboards, and task monitors.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Component   │   │  Component   │   │  Component   │
//!     │ (markdown)   │   │ (chart)      │   │ (table)      │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  LiveCard (runtime orchestrator)                                  │
//! │  - Document (ordered sequence + identity index)                   │
//! │  - RefreshScheduler (throttle + coalescing)                       │
//! │  - FinalizeBarrier (Running → Finalizing → Finalized)             │
//! │  - ArtifactGate (generation watermark, stale-write discard)       │
//! │  - Bus (broadcast events) + SubscriberSet (fan-out)               │
//! └──────┬───────────────────────┬───────────────────────┬────────────┘
//!        ▼                       ▼                       ▼
//!  refresh() inline        ticker worker           finalize()
//!  (window open)           (coalesced renders)     (drain + final render)
//!        │                       │                       │
//!        └───────────┬───────────┘───────────────────────┘
//!                    ▼
//!            render_once(generation, status)
//!                    │  gate admission → snapshot → sink hand-off
//!                    ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                 ArtifactSink (memory / filesystem / custom)       │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### The update/render concurrency protocol
//! ```text
//! while the task runs:
//!   update(id, ..) ──► Document            (atomic per update)
//!   refresh() ──► RefreshScheduler
//!     ├─ window open  → render inline (blocking), generation N
//!     └─ coalesced    → pending flag; ticker renders once per window
//!
//! at task completion:
//!   finalize()
//!     ├─ Running → Finalizing      (new runtime renders rejected)
//!     ├─ drain in-flight renders   (bounded by grace; stragglers cancelled)
//!     ├─ final render              (generation > all runtime, token "final")
//!     └─ Finalized                 (update/refresh become output no-ops)
//!
//! ordering: the ArtifactGate drops any write whose generation is stale or
//! that arrives after the final render sealed the card — the authoritative
//! artifact is always logically last.
//! ```
//!
//! ## Features
//! | Area              | Description                                                            | Key types / traits                        |
//! |-------------------|------------------------------------------------------------------------|-------------------------------------------|
//! | **Components**    | Built-in kinds plus a registry for custom type tags.                   | [`Component`], [`Update`], [`RenderRegistry`] |
//! | **Documents**     | Ordered, identity-indexed component trees with consistent snapshots.   | [`Document`]                              |
//! | **Scheduling**    | Rate-limited, coalescing refresh with bounded staleness.               | [`CardConfig`], [`LiveCard::refresh`]     |
//! | **Finalization**  | Exactly-once authoritative render, stale-write discard.                | [`LiveCard::finalize`], [`Phase`]         |
//! | **Reload policy** | Token-based artifact reuse for polling consumers.                      | [`ReloadPolicy`], [`ContentToken`]        |
//! | **Sinks**         | Artifact hand-off to memory, filesystem, or custom stores.             | [`ArtifactSink`], [`MemorySink`], [`FsSink`] |
//! | **Subscribers**   | Hook into render lifecycle events (logging, metrics, custom).          | [`Subscribe`], [`Event`], [`EventKind`]   |
//!
//! ## Optional features
//! - `logging` *(default)*: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use livecard::{CardConfig, Component, LiveCard, MemorySink, ProgressBar, Update};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sink = Arc::new(MemorySink::new());
//!     let card = LiveCard::builder(CardConfig::default())
//!         .with_name("training")
//!         .with_sink(sink.clone())
//!         .build();
//!
//!     card.append_with_id(Component::markdown("## starting"), "status")?;
//!     card.append_with_id(Component::from(ProgressBar::new(100.0)), "epoch")?;
//!
//!     for i in 0..3u32 {
//!         card.update(
//!             "epoch",
//!             Update::Progress { value: f64::from(i), metadata: None },
//!         );
//!         card.refresh().await?;
//!     }
//!
//!     // Task complete: exactly one authoritative render.
//!     card.finalize().await?;
//!     assert!(sink.final_artifact().is_some());
//!     Ok(())
//! }
//! ```

mod artifact;
mod components;
mod config;
mod core;
mod document;
mod error;
mod events;
mod reload;
mod sink;
mod slot;
mod subscribers;

// ---- Public re-exports ----

pub use artifact::{Artifact, ComponentPayload, ContentToken, RenderStatus};
pub use components::{
    Component, ComponentStatus, Image, LineChart, Markdown, ProgressBar, RenderFn, RenderRegistry,
    Table, Update,
};
pub use config::CardConfig;
pub use core::{CardSet, LiveCard, LiveCardBuilder, Phase, UpdateBatch};
pub use document::Document;
pub use error::{DocumentError, RenderError, SinkError};
pub use events::{Bus, Event, EventKind};
pub use reload::{ReloadDecision, ReloadPolicy};
pub use sink::{ArtifactSink, FsSink, MemorySink};
pub use slot::LatestSlot;
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Disable with: `--no-default-features`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
