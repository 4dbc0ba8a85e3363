//! Supported signing algorithms.

use std::fmt;
use std::str::FromStr;

use crate::error::AuthError;

/// The signing algorithm, selected once at configuration time.
///
/// Each variant has its own canonical string layout; see
/// [`crate::canonical::build_canonical_string`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureAlgorithm {
    /// HMAC-SHA256 with a shared secret. Hex-encoded signature, no nonce.
    #[default]
    HmacSha256,
    /// RSASSA-PSS with SHA-256. Base64-encoded signature, nonce and body digest signed.
    RsaPssSha256,
}

impl SignatureAlgorithm {
    /// Short identifier used in configuration.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HmacSha256 => "hmac-sha256",
            Self::RsaPssSha256 => "rsa-pss-sha256",
        }
    }

    /// Whether a nonce is part of the signed material.
    #[must_use]
    pub fn requires_nonce(self) -> bool {
        matches!(self, Self::RsaPssSha256)
    }

    /// Whether the algorithm uses an asymmetric keypair.
    #[must_use]
    pub fn is_asymmetric(self) -> bool {
        matches!(self, Self::RsaPssSha256)
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hmac-sha256" | "hmac" | "symmetric_hmac_sha256" => Ok(Self::HmacSha256),
            "rsa-pss-sha256" | "rsa-pss" | "asymmetric_rsa_pss_sha256" => Ok(Self::RsaPssSha256),
            _ => Err(AuthError::config(format!(
                "unsupported signature algorithm: {s}"
            ))),
        }
    }
}
