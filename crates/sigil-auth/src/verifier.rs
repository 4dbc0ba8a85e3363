//! Request signature verification.
//!
//! The verifier rebuilds the canonical string from the inbound request and the
//! envelope's timestamp and nonce, then checks the claimed signature against
//! it. No field is checked on its own: tampering with any signed field changes
//! the canonical string and the check fails.
//!
//! Freshness of the timestamp is a separate concern; see
//! [`crate::replay::ReplayGuard`].

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rsa::pss;
use rsa::signature::Verifier;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::algorithm::SignatureAlgorithm;
use crate::canonical::{build_canonical_string, field_with_line_break};
use crate::envelope::SignatureEnvelope;
use crate::error::{AuthError, AuthResult};
use crate::keys::KeyMaterial;
use crate::request::SigningRequest;
use crate::signer::{PssDigest, compute_hmac_signature, key_mismatch};

/// Verify `envelope` against `request` using `key`.
///
/// The request's own timestamp and nonce are ignored; the envelope's values
/// are what was signed.
///
/// # Errors
///
/// - [`AuthError::MalformedInput`] if the signature, timestamp, or (RSA-PSS)
///   nonce is empty, the method, path or nonce contains a line break, the timestamp is not an integer, or the RSA-PSS signature
///   is not valid base64.
/// - [`AuthError::SignatureMismatch`] if the signature does not match.
/// - [`AuthError::Configuration`] if the key does not fit the algorithm.
pub fn verify(
    request: &SigningRequest,
    envelope: &SignatureEnvelope,
    key: &KeyMaterial,
) -> AuthResult<()> {
    let algorithm = request.algorithm();

    if envelope.signature.is_empty() {
        return Err(AuthError::malformed("signature must not be empty"));
    }
    if envelope.timestamp.is_empty() {
        return Err(AuthError::malformed("timestamp must not be empty"));
    }
    let nonce = envelope.nonce.as_deref().unwrap_or_default();
    if algorithm.requires_nonce() && nonce.is_empty() {
        return Err(AuthError::malformed("nonce must not be empty"));
    }
    let signed_nonce = algorithm.requires_nonce().then_some(nonce);
    if let Some(field) = field_with_line_break(request.method(), request.path(), signed_nonce) {
        return Err(AuthError::malformed(format!(
            "{field} must not contain a line break"
        )));
    }
    let timestamp = envelope.parsed_timestamp()?;

    debug!(
        algorithm = %algorithm,
        method = request.method(),
        path = request.path(),
        timestamp,
        "Verifying request signature"
    );

    match (algorithm, key) {
        (SignatureAlgorithm::HmacSha256, KeyMaterial::Symmetric(secret)) => {
            let canonical = build_canonical_string(algorithm, request, timestamp, None);
            let expected = compute_hmac_signature(secret, &canonical);

            if envelope.signature.as_bytes().ct_eq(expected.as_bytes()).into() {
                debug!("Signature verification succeeded");
                Ok(())
            } else {
                debug!("HMAC signature mismatch");
                Err(AuthError::SignatureMismatch)
            }
        }
        (SignatureAlgorithm::RsaPssSha256, KeyMaterial::Asymmetric(pair)) => {
            let verifying_key = pair
                .pss_verifying_key()
                .ok_or_else(|| AuthError::config("RSA-PSS verification requires a public key"))?;
            let signature = BASE64
                .decode(envelope.signature.trim())
                .map_err(|_| AuthError::malformed("signature is not valid base64"))?;
            let canonical = build_canonical_string(algorithm, request, timestamp, Some(nonce));

            verify_pss(verifying_key, canonical.as_bytes(), &signature)?;
            debug!("Signature verification succeeded");
            Ok(())
        }
        (algorithm, _) => Err(key_mismatch(algorithm)),
    }
}

fn verify_pss(
    verifying_key: &pss::VerifyingKey<PssDigest>,
    data: &[u8],
    signature: &[u8],
) -> AuthResult<()> {
    let signature = pss::Signature::try_from(signature).map_err(|_| {
        debug!("RSA-PSS signature could not be decoded");
        AuthError::SignatureMismatch
    })?;

    verifying_key.verify(data, &signature).map_err(|_| {
        debug!("RSA-PSS signature mismatch");
        AuthError::SignatureMismatch
    })
}
