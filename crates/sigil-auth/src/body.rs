//! Request body hashing.

use sha2::{Digest, Sha256};

/// Hash a request body for inclusion in the canonical string.
///
/// Returns the lower-case hex SHA-256 digest of the exact bytes, or an empty
/// string when the body is absent or zero-length. Body size limits belong to
/// the transport layer.
///
/// # Examples
///
/// ```
/// use sigil_auth::body::hash_body;
///
/// assert_eq!(hash_body(None), "");
/// assert_eq!(hash_body(Some(b"")), "");
/// assert_eq!(
///     hash_body(Some(b"hello world")),
///     "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
/// );
/// ```
#[must_use]
pub fn hash_body(body: Option<&[u8]>) -> String {
    match body {
        Some(bytes) if !bytes.is_empty() => hex::encode(Sha256::digest(bytes)),
        _ => String::new(),
    }
}
