//! Error types used by the livecard engine and artifact sinks.
//!
//! This module defines three error types:
//!
//! - [`DocumentError`] — errors raised by document structure operations.
//! - [`RenderError`] — errors raised while producing or storing a render.
//! - [`SinkError`] — errors raised by an [`ArtifactSink`](crate::ArtifactSink).
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//!
//! ## Rules
//! - `update` on an unknown id is **not** an error: it degrades to a no-op
//!   (tolerant-update policy). Only explicit `lookup` propagates `NotFound`.
//! - A render timeout abandons that generation only; it is never fatal.
//! - A sink failure is surfaced to the caller but leaves the in-memory
//!   document untouched; the caller may simply refresh again.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by document structure operations.
///
/// These represent misuse of the identity index: appending a component under
/// an id that is already taken, or looking up an id that does not exist.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DocumentError {
    /// `append` was called with an id already present in the index.
    ///
    /// The append is aborted and the document is left unchanged.
    #[error("component id {id:?} is already registered")]
    DuplicateId {
        /// The id that collided.
        id: String,
    },

    /// `lookup` was called with an id not present in the index.
    #[error("no component registered under id {id:?}")]
    NotFound {
        /// The id that was requested.
        id: String,
    },
}

impl DocumentError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use livecard::DocumentError;
    ///
    /// let err = DocumentError::DuplicateId { id: "chart".into() };
    /// assert_eq!(err.as_label(), "document_duplicate_id");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DocumentError::DuplicateId { .. } => "document_duplicate_id",
            DocumentError::NotFound { .. } => "document_not_found",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            DocumentError::DuplicateId { id } => format!("duplicate id: {id}"),
            DocumentError::NotFound { id } => format!("not found: {id}"),
        }
    }
}

/// # Errors produced while rendering a document.
///
/// A render is a pure function of document state, so these errors cover the
/// surrounding protocol: exceeding the render deadline, the artifact sink
/// rejecting the payload, or a runtime render being abandoned during
/// finalization.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RenderError {
    /// The render (including the sink hand-off) exceeded its deadline.
    ///
    /// The generation is abandoned; the next scheduled or final render
    /// supersedes it.
    #[error("render generation {generation} timed out after {timeout:?}")]
    Timeout {
        /// The deadline that was exceeded.
        timeout: Duration,
        /// The abandoned render generation.
        generation: u64,
    },

    /// The artifact sink failed to store the rendered payload.
    ///
    /// In-memory document state is unaffected; the caller may refresh again.
    #[error("artifact sink failed: {0}")]
    Sink(#[from] SinkError),

    /// The render was abandoned because finalization cancelled it.
    #[error("render cancelled during finalization")]
    Canceled,
}

impl RenderError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use livecard::RenderError;
    /// use std::time::Duration;
    ///
    /// let err = RenderError::Timeout { timeout: Duration::from_secs(5), generation: 3 };
    /// assert_eq!(err.as_label(), "render_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RenderError::Timeout { .. } => "render_timeout",
            RenderError::Sink(_) => "render_sink_failed",
            RenderError::Canceled => "render_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RenderError::Timeout {
                timeout,
                generation,
            } => {
                format!("timeout after {timeout:?} (generation {generation})")
            }
            RenderError::Sink(e) => format!("sink: {e}"),
            RenderError::Canceled => "cancelled during finalization".to_string(),
        }
    }

    /// Indicates whether the failed render may simply be retried by the
    /// caller with another `refresh`.
    ///
    /// Returns `true` for [`RenderError::Sink`] and [`RenderError::Timeout`];
    /// a cancelled render belongs to a finalizing card and must not retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RenderError::Sink(_) | RenderError::Timeout { .. })
    }
}

/// # Errors produced by artifact sinks.
///
/// The sink owns its own retry policy; the engine reports these but never
/// retries a store on its own (renders are idempotent, the next render
/// supersedes a dropped one).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SinkError {
    /// The artifact could not be serialized into bytes.
    #[error("failed to serialize artifact: {reason}")]
    Serialize {
        /// The underlying error message.
        reason: String,
    },

    /// The sink failed to write the serialized artifact.
    #[error("failed to write artifact: {reason}")]
    Io {
        /// The underlying error message.
        reason: String,
    },
}

impl SinkError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SinkError::Serialize { .. } => "sink_serialize",
            SinkError::Io { .. } => "sink_io",
        }
    }
}
