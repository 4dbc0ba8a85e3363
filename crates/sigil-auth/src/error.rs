//! Error types for request signing and verification.
//!
//! Every failure is an [`AuthError`]. Each variant maps to a stable
//! [`AuthErrorKind`] tag so the boundary layer can tell bad input, a wrong
//! signature and an expired timestamp apart without parsing messages.
//! Messages never carry key material or signature bytes.

use std::fmt;

/// Errors produced by the signing engine.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Key material is missing, invalid, or does not match the configured algorithm.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A required signing field is empty, or a field could not be decoded.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The recomputed signature does not match the supplied one.
    #[error("signature does not match")]
    SignatureMismatch,

    /// The request timestamp is outside the accepted replay window.
    #[error("request timestamp outside the allowed window of {tolerance_secs} seconds")]
    ReplayWindowExceeded {
        /// The configured tolerance in seconds.
        tolerance_secs: u64,
    },
}

impl AuthError {
    /// The machine-distinguishable kind of this error.
    #[must_use]
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            Self::Configuration(_) => AuthErrorKind::Configuration,
            Self::MalformedInput(_) => AuthErrorKind::MalformedInput,
            Self::SignatureMismatch => AuthErrorKind::SignatureMismatch,
            Self::ReplayWindowExceeded { .. } => AuthErrorKind::ReplayWindowExceeded,
        }
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedInput(msg.into())
    }
}

/// Stable kind tag for an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    /// Server-side misconfiguration.
    Configuration,
    /// Client sent incomplete or undecodable signing fields.
    MalformedInput,
    /// Signature check failed.
    SignatureMismatch,
    /// Timestamp is stale or too far in the future.
    ReplayWindowExceeded,
}

impl AuthErrorKind {
    /// The tag as a static string, suitable for logs and error bodies.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration_error",
            Self::MalformedInput => "malformed_input",
            Self::SignatureMismatch => "signature_mismatch",
            Self::ReplayWindowExceeded => "replay_window_exceeded",
        }
    }
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convenience result type for signing operations.
pub type AuthResult<T> = Result<T, AuthError>;
