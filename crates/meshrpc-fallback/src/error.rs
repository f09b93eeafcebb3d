//! Fallback error types.

use thiserror::Error;

/// Error returned by a fallback handler body.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Why a fallback could not produce a result.
///
/// Configuration errors mean the fallback wiring is broken and will fail the
/// same way on every call; the remaining variants are failures of one
/// particular invocation. Use [`FallbackError::is_configuration`] to tell
/// them apart.
#[derive(Debug, Error)]
pub enum FallbackError {
    /// The call names a fallback type that was never registered.
    #[error("Fallback type {class} is not registered")]
    UnknownFallback { class: String },

    /// The fallback type has no constructor to build its shared instance.
    #[error("Fallback type {class} has no default constructor")]
    NoConstructor { class: String },

    /// Neither a failure-aware nor an exact-signature handler exists.
    #[error("Fallback type {class} has no method matching {method}")]
    MethodNotFound { class: String, method: String },

    /// The handler returned an error.
    #[error("Fallback {class}::{method} failed: {source}")]
    Handler {
        class: String,
        method: String,
        #[source]
        source: HandlerError,
    },

    /// The handler panicked.
    #[error("Fallback {class}::{method} panicked: {message}")]
    Panicked {
        class: String,
        method: String,
        message: String,
    },
}

impl FallbackError {
    /// Returns `true` if this error reflects broken fallback wiring rather
    /// than a failure of this one invocation.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownFallback { .. } | Self::NoConstructor { .. } | Self::MethodNotFound { .. }
        )
    }

    /// Name of the fallback type involved.
    pub fn class(&self) -> &str {
        match self {
            Self::UnknownFallback { class }
            | Self::NoConstructor { class }
            | Self::MethodNotFound { class, .. }
            | Self::Handler { class, .. }
            | Self::Panicked { class, .. } => class,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_are_distinguishable() {
        let missing = FallbackError::MethodNotFound {
            class: "UserFallback".into(),
            method: "get(i64)".into(),
        };
        assert!(missing.is_configuration());

        let failed = FallbackError::Handler {
            class: "UserFallback".into(),
            method: "get(i64)".into(),
            source: "cache miss".into(),
        };
        assert!(!failed.is_configuration());
        assert_eq!(failed.class(), "UserFallback");
        assert_eq!(failed.to_string(), "Fallback UserFallback::get(i64) failed: cache miss");
    }
}
