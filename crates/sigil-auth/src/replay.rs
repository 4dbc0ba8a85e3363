//! Replay protection: timestamp freshness and nonce generation.
//!
//! The freshness check is independent of signature verification. A valid
//! signature with a stale timestamp is rejected, and so is a fresh timestamp
//! with an invalid signature.
//!
//! Nonces are signed material only. No seen-nonce set is kept, so a captured
//! `(timestamp, nonce, signature)` triple can be replayed verbatim until the
//! timestamp leaves the window.

use chrono::Utc;
use rsa::rand_core::{OsRng, RngCore};

use crate::error::{AuthError, AuthResult};

/// Number of random bytes in a generated nonce.
pub const NONCE_BYTES: usize = 16;

/// Current Unix time in seconds.
#[must_use]
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Whether `timestamp` lies within `tolerance_secs` of the current time.
#[must_use]
pub fn is_fresh(timestamp: i64, tolerance_secs: u64) -> bool {
    is_fresh_at(timestamp, tolerance_secs, unix_now())
}

/// Whether `|now - timestamp| <= tolerance_secs`.
///
/// A tolerance of zero requires exact equality with `now`.
///
/// # Examples
///
/// ```
/// use sigil_auth::replay::is_fresh_at;
///
/// assert!(is_fresh_at(1_000, 300, 1_300));
/// assert!(!is_fresh_at(1_000, 300, 1_301));
/// assert!(is_fresh_at(1_000, 0, 1_000));
/// ```
#[must_use]
pub fn is_fresh_at(timestamp: i64, tolerance_secs: u64, now: i64) -> bool {
    now.abs_diff(timestamp) <= tolerance_secs
}

/// Generate a random nonce: [`NONCE_BYTES`] bytes from the OS CSPRNG, hex-encoded.
#[must_use]
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Timestamp window check with a fixed tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayGuard {
    tolerance_secs: u64,
}

impl ReplayGuard {
    /// Create a guard accepting timestamps within `tolerance_secs` of now.
    #[must_use]
    pub fn new(tolerance_secs: u64) -> Self {
        Self { tolerance_secs }
    }

    /// The configured tolerance.
    #[must_use]
    pub fn tolerance_secs(&self) -> u64 {
        self.tolerance_secs
    }

    /// Check `timestamp` against the current time.
    pub fn check(&self, timestamp: i64) -> AuthResult<()> {
        self.check_at(timestamp, unix_now())
    }

    /// Check `timestamp` against a caller-supplied `now`.
    pub fn check_at(&self, timestamp: i64, now: i64) -> AuthResult<()> {
        if is_fresh_at(timestamp, self.tolerance_secs, now) {
            Ok(())
        } else {
            Err(AuthError::ReplayWindowExceeded {
                tolerance_secs: self.tolerance_secs,
            })
        }
    }
}
