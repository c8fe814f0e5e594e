//! # Reload policy for stored artifacts.
//!
//! [`ReloadPolicy`] decides whether a consumer polling a stored artifact may
//! reuse it instead of fetching a recomputed one, based on an opaque
//! [`ContentToken`](crate::ContentToken) comparison.
//!
//! - [`ReloadPolicy::Never`] the artifact is always recomputed; tokens are ignored.
//! - [`ReloadPolicy::OnChange`] the artifact is reused iff the current token
//!   equals the previously observed one (default).
//!
//! ## Rules
//! - Tokens are **opaque**: the policy compares them with exact equality
//!   only, never partial or fuzzy matching.
//! - Token production belongs to the render path: `final` once the owning
//!   task is done, a generation-tagged value while it runs.
//!
//! ## Choosing the right policy
//!
//! **Push-style consumers** (every render is delivered):
//! ```text
//! ReloadPolicy::Never           → always fetch the fresh artifact
//! ```
//!
//! **Poll-style consumers** (viewer re-reads on an interval):
//! ```text
//! ReloadPolicy::OnChange        → skip the fetch while the token is stable
//! ```

use crate::artifact::ContentToken;

/// Policy controlling whether a previously stored artifact may be reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReloadPolicy {
    /// Never reuse: every poll recomputes, tokens are ignored.
    Never,
    /// Reuse iff the current token equals the previous token (default).
    OnChange,
}

impl Default for ReloadPolicy {
    /// Returns [`ReloadPolicy::OnChange`].
    fn default() -> Self {
        ReloadPolicy::OnChange
    }
}

/// Outcome of a reload decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReloadDecision {
    /// The previously produced artifact is still valid; reuse it.
    Reuse,
    /// The artifact must be recomputed (or re-fetched).
    Recompute,
}

impl ReloadPolicy {
    /// Decides whether an artifact may be reused given the current and the
    /// previously observed content tokens.
    ///
    /// Comparison is exact equality of opaque tokens. A missing previous
    /// token always recomputes.
    ///
    /// # Example
    /// ```
    /// use livecard::{ContentToken, ReloadDecision, ReloadPolicy};
    ///
    /// let cur = ContentToken::final_token();
    /// let prev = ContentToken::final_token();
    /// assert_eq!(
    ///     ReloadPolicy::OnChange.decide(&cur, Some(&prev)),
    ///     ReloadDecision::Reuse,
    /// );
    /// assert_eq!(
    ///     ReloadPolicy::Never.decide(&cur, Some(&prev)),
    ///     ReloadDecision::Recompute,
    /// );
    /// ```
    pub fn decide(
        &self,
        current: &ContentToken,
        previous: Option<&ContentToken>,
    ) -> ReloadDecision {
        match self {
            ReloadPolicy::Never => ReloadDecision::Recompute,
            ReloadPolicy::OnChange => match previous {
                Some(prev) if prev == current => ReloadDecision::Reuse,
                _ => ReloadDecision::Recompute,
            },
        }
    }
}
