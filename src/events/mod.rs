//! Render lifecycle events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the refresh scheduler, the render
//! path, the finalization barrier and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `LiveCard`, the ticker worker, the render path, the
//!   finalization barrier, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the card's subscriber listener (fans out to
//!   `SubscriberSet`) and any test observing the protocol.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
