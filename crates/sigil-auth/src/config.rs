//! Signature verification configuration.
//!
//! All configuration is driven by environment variables:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SIGNATURE_ENABLED` | `true` | Enforce request signatures |
//! | `SIGNATURE_ALGORITHM` | `hmac-sha256` | `hmac-sha256` or `rsa-pss-sha256` |
//! | `SIGNATURE_SECRET` | *(unset)* | Shared HMAC secret |
//! | `SIGNATURE_PUBLIC_KEY` | *(unset)* | Inline SubjectPublicKeyInfo PEM |
//! | `SIGNATURE_PUBLIC_KEY_FILE` | *(unset)* | Path to the public key PEM |
//! | `SIGNATURE_PRIVATE_KEY` | *(unset)* | Inline PKCS#8 PEM (signing clients only) |
//! | `SIGNATURE_PRIVATE_KEY_FILE` | *(unset)* | Path to the private key PEM |
//! | `SIGNATURE_TIMESTAMP_TOLERANCE` | `300` | Replay window in seconds |

use std::env;
use std::path::PathBuf;

use crate::algorithm::SignatureAlgorithm;
use crate::error::{AuthError, AuthResult};

/// Default replay window: five minutes.
pub const DEFAULT_TIMESTAMP_TOLERANCE_SECS: u64 = 300;

/// Signature verification settings.
///
/// Secrets and inline PEMs are never serialized.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureConfig {
    /// Whether signatures are enforced at all.
    pub enabled: bool,
    /// Algorithm used by every request.
    pub algorithm: SignatureAlgorithm,
    /// Shared HMAC secret.
    #[serde(skip_serializing, default)]
    pub secret: Option<String>,
    /// Inline public key PEM.
    #[serde(skip_serializing, default)]
    pub public_key_pem: Option<String>,
    /// Public key PEM file.
    #[serde(default)]
    pub public_key_file: Option<PathBuf>,
    /// Inline private key PEM.
    #[serde(skip_serializing, default)]
    pub private_key_pem: Option<String>,
    /// Private key PEM file.
    #[serde(default)]
    pub private_key_file: Option<PathBuf>,
    /// Maximum allowed distance between a request timestamp and now.
    pub timestamp_tolerance_secs: u64,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            algorithm: SignatureAlgorithm::default(),
            secret: None,
            public_key_pem: None,
            public_key_file: None,
            private_key_pem: None,
            private_key_file: None,
            timestamp_tolerance_secs: DEFAULT_TIMESTAMP_TOLERANCE_SECS,
        }
    }
}

impl SignatureConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> AuthResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Unknown algorithm names and non-numeric tolerances are configuration
    /// errors rather than silently falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AuthResult<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("SIGNATURE_ENABLED") {
            config.enabled = parse_bool(&v);
        }
        if let Some(v) = lookup("SIGNATURE_ALGORITHM") {
            config.algorithm = v.parse()?;
        }
        config.secret = lookup("SIGNATURE_SECRET");
        config.public_key_pem = lookup("SIGNATURE_PUBLIC_KEY");
        config.public_key_file = lookup("SIGNATURE_PUBLIC_KEY_FILE").map(PathBuf::from);
        config.private_key_pem = lookup("SIGNATURE_PRIVATE_KEY");
        config.private_key_file = lookup("SIGNATURE_PRIVATE_KEY_FILE").map(PathBuf::from);
        if let Some(v) = lookup("SIGNATURE_TIMESTAMP_TOLERANCE") {
            config.timestamp_tolerance_secs = v.trim().parse().map_err(|_| {
                AuthError::config(format!(
                    "SIGNATURE_TIMESTAMP_TOLERANCE must be a non-negative integer, got {v:?}"
                ))
            })?;
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
