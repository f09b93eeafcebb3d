//! Error types for calls and registry snapshots.

use thiserror::Error;

/// The standard failure reason recorded on a failed [`ServiceCall`].
///
/// Fallback handlers registered with a failure-aware signature receive this
/// value as their first argument, so it is `Clone` and carries owned data.
///
/// [`ServiceCall`]: crate::call::ServiceCall
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// The connection to the instance could not be established.
    #[error("Connection to {instance} failed: {reason}")]
    Connect { instance: String, reason: String },

    /// The instance did not answer within the configured duration.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The instance answered with a non-success status.
    #[error("Remote returned status {code}: {message}")]
    Status { code: u16, message: String },

    /// No instance could be selected for the service.
    #[error("No instance available for service: {service}")]
    NoInstance { service: String },

    /// The response could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// An unexpected error.
    #[error("{0}")]
    Other(String),
}

impl CallError {
    /// Returns `true` if the failure happened before the request reached the remote.
    pub fn is_connect_failure(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::NoInstance { .. })
    }
}

/// Errors raised while loading or parsing a registry snapshot.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Snapshot JSON was malformed.
    #[error("Invalid registry snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two instances of one service share an id.
    #[error("Duplicate instance id {id} for service {service}")]
    DuplicateInstance { service: String, id: String },
}
