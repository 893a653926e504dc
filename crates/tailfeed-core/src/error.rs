//! Core error types
//!
//! Errors from the entity model and from remote-store collaborators. Every
//! error here is scoped to the operation that raised it; nothing in this
//! crate panics on bad input.

use crate::identifiers::PostId;
use thiserror::Error;

/// Errors from the entity model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    /// The record shape is not one the interaction layer understands.
    ///
    /// Fatal to the single operation that tried to use the entity, never to
    /// the process; the caller skips the entity and moves on.
    #[error("unsupported entity kind {kind:?} for post {post_id}")]
    Unsupported {
        /// The post whose record could not be interpreted
        post_id: PostId,
        /// The raw kind tag reported by the remote store
        kind: String,
    },
}

impl EntityError {
    /// Create an unsupported-entity error.
    pub fn unsupported(post_id: PostId, kind: impl Into<String>) -> Self {
        Self::Unsupported {
            post_id,
            kind: kind.into(),
        }
    }
}

/// Errors surfaced by remote-store collaborators.
///
/// The core never constructs these from a wire format — transport is a
/// collaborator concern — but it classifies them to decide between rollback,
/// default values, and propagation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteStoreError {
    /// The call failed in a way that may succeed on retry.
    #[error("remote store unavailable: {reason}")]
    Unavailable {
        /// Human-readable failure description from the collaborator
        reason: String,
    },

    /// The remote store rejected the request.
    #[error("remote store rejected request: {reason}")]
    Rejected {
        /// Human-readable rejection description from the collaborator
        reason: String,
    },

    /// The call did not complete within the caller-imposed deadline.
    #[error("remote store call timed out after {waited_ms}ms")]
    Timeout {
        /// How long the caller waited before giving up
        waited_ms: u64,
    },
}

impl RemoteStoreError {
    /// Create an unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Create a rejected error.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(waited_ms: u64) -> Self {
        Self::Timeout { waited_ms }
    }

    /// Whether retrying the same call later could reasonably succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_display() {
        let err = EntityError::unsupported(PostId::new("p7"), "poll_v2");
        assert!(err.to_string().contains("p7"));
        assert!(err.to_string().contains("poll_v2"));
    }

    #[test]
    fn test_remote_error_display() {
        let err = RemoteStoreError::unavailable("connection reset");
        assert!(err.to_string().contains("connection reset"));

        let err = RemoteStoreError::timeout(5000);
        assert!(err.to_string().contains("5000"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(RemoteStoreError::unavailable("down").is_transient());
        assert!(RemoteStoreError::timeout(100).is_transient());
        assert!(!RemoteStoreError::rejected("bad id").is_transient());
    }
}
