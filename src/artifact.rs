//! # Rendered artifacts and content tokens.
//!
//! An [`Artifact`] is the output of one render pass: the per-component
//! payload records in document order, a [`ContentToken`] for reload
//! decisions, a [`RenderStatus`] flag, and the render generation.
//!
//! ## Persisted layout (logical)
//! ```text
//! {
//!   "card": "training",
//!   "status": "runtime",                      // or "final"
//!   "generation": 17,
//!   "token": "runtime-17",                    // opaque; equality only
//!   "records": [
//!     { "id": "epoch", "type": "progressBar", "payload": { ... } },
//!     {                "type": "markdown",    "payload": "## training" }
//!   ]
//! }
//! ```
//!
//! ## Rules
//! - Record order equals document insertion order.
//! - Tokens are compared for equality only, never interpreted.
//! - Serialization is deterministic: an unmutated document renders to
//!   byte-identical artifacts.

use serde::Serialize;

use crate::error::SinkError;

/// Opaque comparison key used for artifact reload decisions.
///
/// Produced by the render path, consumed by
/// [`ReloadPolicy::decide`](crate::ReloadPolicy::decide). The value is never
/// interpreted; two tokens are either equal or not.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ContentToken(String);

impl ContentToken {
    /// Token for the single authoritative final render.
    pub fn final_token() -> Self {
        ContentToken("final".to_string())
    }

    /// Token for a runtime render of the given generation.
    ///
    /// Generations increase monotonically, so successive runtime renders
    /// always produce distinct tokens.
    pub fn runtime(generation: u64) -> Self {
        ContentToken(format!("runtime-{generation}"))
    }

    /// Returns the token as a string slice (for logging only).
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Whether an artifact was produced while the owning task was still running
/// or by the authoritative final render.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStatus {
    /// Produced while the task runs, potentially from partially updated state.
    Runtime,
    /// The single authoritative render at task completion.
    Final,
}

/// One rendered component entry.
///
/// `id` is present only for id-bearing components; `kind` is the component
/// type tag; `payload` is the kind-specific rendered value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComponentPayload {
    /// Component id, if one was assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Component type tag (e.g. `markdown`, `table`, `progressBar`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Kind-specific rendered payload.
    pub payload: serde_json::Value,
}

/// A fully rendered document, ready for the artifact sink.
#[derive(Clone, Debug, Serialize)]
pub struct Artifact {
    /// Name of the card that produced this artifact.
    pub card: String,
    /// Runtime or final render.
    pub status: RenderStatus,
    /// Monotonic render generation.
    pub generation: u64,
    /// Opaque reload token.
    pub token: ContentToken,
    /// Per-component records in document order.
    pub records: Vec<ComponentPayload>,
}

impl Artifact {
    /// Serializes the artifact into a JSON byte payload for sinks.
    ///
    /// Serialization is deterministic for a given artifact, so repeated
    /// renders of an unmutated document produce byte-identical output.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SinkError> {
        serde_json::to_vec(self).map_err(|e| SinkError::Serialize {
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_equality_is_exact() {
        assert_eq!(ContentToken::final_token(), ContentToken::final_token());
        assert_eq!(ContentToken::runtime(5), ContentToken::runtime(5));
        assert_ne!(ContentToken::runtime(5), ContentToken::runtime(6));
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let artifact = Artifact {
            card: "demo".to_string(),
            status: RenderStatus::Runtime,
            generation: 2,
            token: ContentToken::runtime(2),
            records: vec![ComponentPayload {
                id: Some("a".to_string()),
                kind: "markdown".to_string(),
                payload: serde_json::json!("hello"),
            }],
        };
        assert_eq!(artifact.to_bytes().unwrap(), artifact.to_bytes().unwrap());
    }

    #[test]
    fn test_anonymous_records_omit_id() {
        let record = ComponentPayload {
            id: None,
            kind: "markdown".to_string(),
            payload: serde_json::json!("x"),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("\"id\""));
        assert!(json.contains("\"type\":\"markdown\""));
    }
}
