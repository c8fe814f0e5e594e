//! # Artifact sinks: where rendered payloads are handed off.
//!
//! The engine produces [`Artifact`]s; an [`ArtifactSink`] owns their
//! persistence. The engine reports sink failures but never retries — renders
//! are idempotent pure functions of state, so the next scheduled or final
//! render simply supersedes a dropped one.
//!
//! ## Rules
//! - A sink never mutates components; it only reads rendered payloads.
//! - `store` receives runtime and final artifacts through the same call; the
//!   artifact's status flag distinguishes them.
//! - Sinks own their own retry policy.
//!
//! ## Built-ins
//! - [`MemorySink`]: keeps the latest artifact and a store history; the
//!   default sink, used by tests and demos.
//! - [`FsSink`]: writes JSON files under a root directory, runtime and final
//!   artifacts in separate subdirectories (the layout a polling viewer
//!   expects).

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::artifact::{Artifact, RenderStatus};
use crate::error::SinkError;

/// # Asynchronous artifact store.
///
/// Implementors receive the full artifact and decide the byte layout
/// themselves ([`Artifact::to_bytes`] gives the canonical JSON form).
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use livecard::{Artifact, ArtifactSink, SinkError};
///
/// struct Discard;
///
/// #[async_trait]
/// impl ArtifactSink for Discard {
///     async fn store(&self, _artifact: &Artifact) -> Result<(), SinkError> {
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str { "discard" }
/// }
/// ```
#[async_trait]
pub trait ArtifactSink: Send + Sync + 'static {
    /// Stores one rendered artifact.
    ///
    /// Failures are surfaced to the refresh/finalize caller; in-memory
    /// document state is unaffected and the caller may refresh again.
    async fn store(&self, artifact: &Artifact) -> Result<(), SinkError>;

    /// Returns a stable, human-readable sink name for logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

#[derive(Default)]
struct MemorySinkState {
    latest: Option<Artifact>,
    stored: Vec<Artifact>,
}

/// In-memory sink keeping the latest artifact and the full store history.
///
/// The default sink when none is configured. The history preserves store
/// order, which makes last-writer assertions in tests straightforward.
#[derive(Default)]
pub struct MemorySink {
    state: Mutex<MemorySinkState>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the most recently stored artifact.
    pub fn latest(&self) -> Option<Artifact> {
        self.lock().latest.clone()
    }

    /// Returns every stored artifact in store order.
    pub fn stored(&self) -> Vec<Artifact> {
        self.lock().stored.clone()
    }

    /// Returns the stored final artifact, if one has landed.
    pub fn final_artifact(&self) -> Option<Artifact> {
        self.lock()
            .stored
            .iter()
            .find(|a| a.status == RenderStatus::Final)
            .cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemorySinkState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ArtifactSink for MemorySink {
    async fn store(&self, artifact: &Artifact) -> Result<(), SinkError> {
        let mut state = self.lock();
        state.latest = Some(artifact.clone());
        state.stored.push(artifact.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Filesystem sink writing JSON artifacts under a root directory.
///
/// Layout:
/// ```text
/// <root>/runtime/<card>.data.json     (overwritten per runtime render)
/// <root>/cards/<card>.data.json       (the final artifact)
/// ```
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    /// Creates a sink rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the path an artifact of this card/status is written to.
    pub fn path_for(&self, card: &str, status: RenderStatus) -> PathBuf {
        let dir = match status {
            RenderStatus::Runtime => "runtime",
            RenderStatus::Final => "cards",
        };
        self.root.join(dir).join(format!("{card}.data.json"))
    }
}

#[async_trait]
impl ArtifactSink for FsSink {
    async fn store(&self, artifact: &Artifact) -> Result<(), SinkError> {
        let bytes = artifact.to_bytes()?;
        let path = self.path_for(&artifact.card, artifact.status);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SinkError::Io {
                    reason: e.to_string(),
                })?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| SinkError::Io {
                reason: e.to_string(),
            })
    }

    fn name(&self) -> &'static str {
        "fs"
    }
}
