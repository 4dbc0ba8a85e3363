//! Request signing.
//!
//! [`sign`] is implemented once and parametrized over the
//! [`SignatureAlgorithm`] carried by the request:
//!
//! - **HMAC-SHA256**: keyed hash of the canonical string, lower-case hex.
//!   Deterministic: the same inputs always yield the same signature.
//! - **RSA-PSS-SHA256**: PSS padding with the maximal salt length, base64.
//!   Randomized: two signatures over identical inputs differ, so they can only
//!   be compared by verifying them.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, KeyInit, Mac};
use rsa::rand_core::OsRng;
use rsa::pss;
use rsa::signature::{RandomizedSigner, SignatureEncoding};
use sha2::Sha256;
use tracing::debug;

use crate::algorithm::SignatureAlgorithm;
use crate::canonical::{build_canonical_string, field_with_line_break};
use crate::envelope::SignatureEnvelope;
use crate::error::{AuthError, AuthResult};
use crate::keys::{KeyMaterial, SymmetricKey};
use crate::replay::generate_nonce;
use crate::request::SigningRequest;

type HmacSha256 = Hmac<Sha256>;

/// Digest used for RSA-PSS, from the `rsa` crate's own `sha2` re-export.
pub(crate) type PssDigest = rsa::sha2::Sha256;

/// Output size of [`PssDigest`] in bytes.
const PSS_DIGEST_LEN: usize = 32;

/// Sign `request` with `key`.
///
/// The request must carry a timestamp. For RSA-PSS a nonce is generated when
/// the request has none; the returned envelope always carries the nonce that
/// was signed.
///
/// # Errors
///
/// Returns [`AuthError::Configuration`] if the timestamp is missing, the
/// method, path or nonce contains a line break, the key
/// does not match the request's algorithm, an RSA key lacks its private half,
/// or the RSA signing operation itself fails.
///
/// # Examples
///
/// ```
/// use sigil_auth::{SignatureAlgorithm, SigningRequest, keys::load_symmetric, sign};
///
/// let key = load_symmetric("s3cr3t").unwrap();
/// let request = SigningRequest::new(SignatureAlgorithm::HmacSha256, "POST", "/api/v1/workflows/submit")
///     .with_timestamp(1_700_000_000);
/// let envelope = sign(&request, &key).unwrap();
/// assert_eq!(envelope.signature.len(), 64);
/// assert_eq!(envelope.timestamp, "1700000000");
/// assert!(envelope.nonce.is_none());
/// ```
pub fn sign(request: &SigningRequest, key: &KeyMaterial) -> AuthResult<SignatureEnvelope> {
    let timestamp = request
        .timestamp()
        .ok_or_else(|| AuthError::config("request timestamp must be set before signing"))?;
    let nonce = request.nonce().filter(|_| request.algorithm().requires_nonce());
    if let Some(field) = field_with_line_break(request.method(), request.path(), nonce) {
        return Err(AuthError::config(format!(
            "request {field} must not contain a line break"
        )));
    }

    match (request.algorithm(), key) {
        (SignatureAlgorithm::HmacSha256, KeyMaterial::Symmetric(secret)) => {
            let canonical =
                build_canonical_string(SignatureAlgorithm::HmacSha256, request, timestamp, None);
            debug!(method = request.method(), path = request.path(), "Signing request with HMAC-SHA256");
            Ok(SignatureEnvelope {
                signature: compute_hmac_signature(secret, &canonical),
                timestamp: timestamp.to_string(),
                nonce: None,
            })
        }
        (SignatureAlgorithm::RsaPssSha256, KeyMaterial::Asymmetric(pair)) => {
            let signing_key = pair.pss_signing_key().ok_or_else(|| {
                AuthError::config("RSA-PSS signing requires a private key")
            })?;
            let nonce = request
                .nonce()
                .filter(|n| !n.is_empty())
                .map_or_else(generate_nonce, ToOwned::to_owned);
            let canonical = build_canonical_string(
                SignatureAlgorithm::RsaPssSha256,
                request,
                timestamp,
                Some(&nonce),
            );
            debug!(method = request.method(), path = request.path(), "Signing request with RSA-PSS-SHA256");
            let signature = sign_pss(signing_key, canonical.as_bytes())?;
            Ok(SignatureEnvelope {
                signature: BASE64.encode(signature),
                timestamp: timestamp.to_string(),
                nonce: Some(nonce),
            })
        }
        (algorithm, _) => Err(key_mismatch(algorithm)),
    }
}

/// HMAC-SHA256 of `canonical` under `secret`, lower-case hex.
#[must_use]
pub fn compute_hmac_signature(secret: &SymmetricKey, canonical: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can accept any key length");
    mac.update(canonical.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Largest PSS salt that fits a modulus of `modulus_bits`.
pub(crate) fn max_pss_salt_len(modulus_bits: usize) -> usize {
    let em_len = modulus_bits.saturating_sub(1).div_ceil(8);
    em_len.saturating_sub(PSS_DIGEST_LEN + 2)
}

fn sign_pss(signing_key: &pss::SigningKey<PssDigest>, data: &[u8]) -> AuthResult<Vec<u8>> {
    signing_key
        .try_sign_with_rng(&mut OsRng, data)
        .map(|signature| signature.to_vec())
        .map_err(|e| AuthError::config(format!("RSA-PSS signing failed: {e}")))
}

pub(crate) fn key_mismatch(algorithm: SignatureAlgorithm) -> AuthError {
    let expected = if algorithm.is_asymmetric() {
        "an RSA key"
    } else {
        "a shared secret"
    };
    AuthError::config(format!("{algorithm} requires {expected}"))
}
