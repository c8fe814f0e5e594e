//! # Event subscribers for the card runtime.
//!
//! This module provides the [`Subscribe`] trait and built-in implementations
//! for handling events broadcast through the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   render path ── publish(Event) ──► Bus ──► subscriber listener
//!                                               │
//!                                               ▼
//!                                        SubscriberSet::emit(&Event)
//!                                     ┌────────┴────────┬──────────┐
//!                                     ▼                 ▼          ▼
//!                                  LogWriter         Metrics    Custom ...
//! ```
//!
//! ## Subscriber types
//! - **Passive subscribers** - observe and react to events (logging, metrics, alerts)
//! - **Stateful subscribers** - accumulate state from events (test probes)
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use livecard::{Subscribe, Event, EventKind};
//! use async_trait::async_trait;
//!
//! struct Metrics;
//!
//! #[async_trait]
//! impl Subscribe for Metrics {
//!     async fn on_event(&self, event: &Event) {
//!         if matches!(event.kind, EventKind::RenderFailed) {
//!             // increment a failure counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "metrics" }
//! }
//! ```

mod set;
mod subscriber;

#[cfg(feature = "logging")]
mod log;

pub use set::SubscriberSet;
pub use subscriber::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
