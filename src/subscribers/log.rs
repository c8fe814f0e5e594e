//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//! This is primarily useful for development, debugging, and examples.
//!
//! ## Output format
//! ```text
//! [render-starting] card=training generation=4
//! [render-stored] card=training generation=4 token="runtime-4"
//! [render-failed] card=training generation=5 reason="sink unreachable"
//! [render-timeout] card=training generation=6 timeout=30000ms
//! [finalize-requested] card=training
//! [finalized] card=training token="final"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Prints human-readable event
/// descriptions to stdout for debugging and demonstration purposes.
///
/// Not intended for production use - implement a custom [`Subscribe`] for
/// structured logging or metrics collection.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::RefreshCoalesced => {
                println!("[refresh-coalesced] card={:?}", e.card);
            }
            EventKind::RenderStarting => {
                println!(
                    "[render-starting] card={:?} generation={:?}",
                    e.card, e.generation
                );
            }
            EventKind::RenderStored => {
                println!(
                    "[render-stored] card={:?} generation={:?} token={:?}",
                    e.card, e.generation, e.token
                );
            }
            EventKind::RenderFailed => {
                println!(
                    "[render-failed] card={:?} generation={:?} reason={:?}",
                    e.card, e.generation, e.reason
                );
            }
            EventKind::RenderTimeout => {
                println!(
                    "[render-timeout] card={:?} generation={:?} timeout={:?}ms",
                    e.card, e.generation, e.timeout_ms
                );
            }
            EventKind::RenderDiscarded => {
                println!(
                    "[render-discarded] card={:?} generation={:?} reason={:?}",
                    e.card, e.generation, e.reason
                );
            }
            EventKind::FinalizeRequested => {
                println!("[finalize-requested] card={:?}", e.card);
            }
            EventKind::FinalizeDrained => {
                println!("[finalize-drained] card={:?}", e.card);
            }
            EventKind::FinalizeGraceExceeded => {
                println!(
                    "[finalize-grace-exceeded] card={:?} grace={:?}ms",
                    e.card, e.timeout_ms
                );
            }
            EventKind::Finalized => {
                println!("[finalized] card={:?} token={:?}", e.card, e.token);
            }
            EventKind::SubscriberOverflow => {
                println!(
                    "[subscriber-overflow] subscriber={:?} reason={:?}",
                    e.card, e.reason
                );
            }
            EventKind::SubscriberPanicked => {
                println!(
                    "[subscriber-panicked] subscriber={:?} reason={:?}",
                    e.card, e.reason
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
