//! End-to-end tests for Sigil request signatures.
//!
//! Each test drives the public API the way a client and the gateway would:
//! the client signs and attaches an envelope, the gateway rebuilds the request
//! and authenticates it. Everything runs in-process.
//!
//! ```text
//! cargo test -p sigil-integration
//! ```

use std::sync::{Arc, LazyLock, Once};

use sigil_auth::keys::{
    DEFAULT_KEY_BITS, generate_keypair, load_asymmetric_private, load_asymmetric_public,
    load_symmetric,
};
use sigil_auth::{
    KeyMaterial, QueryParams, ReplayGuard, RequestAuthenticator, SignatureAlgorithm,
    SignatureEnvelope, SigningRequest,
};

static INIT: Once = Once::new();

/// Shared HMAC secret used across tests.
pub const SECRET: &str = "s3cr3t";

/// Fixed "current" time used by tests that pin the clock.
pub const NOW: i64 = 1_700_000_000;

/// Default replay window used by test authenticators.
pub const TOLERANCE_SECS: u64 = 300;

/// RSA key material generated once per test binary.
pub struct RsaKeys {
    /// Signing key (private half with its derived public half).
    pub private: Arc<KeyMaterial>,
    /// Matching public key.
    pub public: Arc<KeyMaterial>,
    /// Public key of an unrelated keypair.
    pub other_public: Arc<KeyMaterial>,
    /// PEM text of the matching public key.
    pub public_pem: String,
    /// PEM text of the private key.
    pub private_pem: String,
}

static RSA_KEYS: LazyLock<RsaKeys> = LazyLock::new(|| {
    let (private_pem, public_pem) =
        generate_keypair(DEFAULT_KEY_BITS).expect("RSA keypair generation should succeed");
    let (_, other_public_pem) =
        generate_keypair(DEFAULT_KEY_BITS).expect("RSA keypair generation should succeed");

    RsaKeys {
        private: Arc::new(load_asymmetric_private(&private_pem).expect("valid private key")),
        public: Arc::new(load_asymmetric_public(&public_pem).expect("valid public key")),
        other_public: Arc::new(
            load_asymmetric_public(&other_public_pem).expect("valid public key"),
        ),
        public_pem,
        private_pem,
    }
});

/// Initialize tracing (once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// The shared HMAC key.
#[must_use]
pub fn hmac_key() -> Arc<KeyMaterial> {
    init_tracing();
    Arc::new(load_symmetric(SECRET).expect("non-empty secret"))
}

/// The lazily generated RSA keys.
#[must_use]
pub fn rsa_keys() -> &'static RsaKeys {
    init_tracing();
    &RSA_KEYS
}

/// An enforcing authenticator for `algorithm` with the default replay window.
#[must_use]
pub fn authenticator(algorithm: SignatureAlgorithm, key: &Arc<KeyMaterial>) -> RequestAuthenticator {
    RequestAuthenticator::new(algorithm, Arc::clone(key), ReplayGuard::new(TOLERANCE_SECS))
        .expect("key should match algorithm")
}

/// `POST /api/v1/workflows/submit` with a small JSON body.
#[must_use]
pub fn submit_request(algorithm: SignatureAlgorithm, timestamp: i64) -> SigningRequest {
    SigningRequest::new(algorithm, "POST", "/api/v1/workflows/submit")
        .with_body(br#"{"prompt":"cat"}"#.to_vec())
        .with_timestamp(timestamp)
}

/// `GET /api/v1/queue/status?details=true` with no body.
#[must_use]
pub fn queue_status_request(algorithm: SignatureAlgorithm, timestamp: i64) -> SigningRequest {
    let query: QueryParams = [("details", "true")].into_iter().collect();
    SigningRequest::new(algorithm, "GET", "/api/v1/queue/status")
        .with_query(query)
        .with_timestamp(timestamp)
}

/// Build inbound HTTP request parts carrying `envelope` in headers.
#[must_use]
pub fn http_parts_with_headers(
    method: &str,
    uri: &str,
    envelope: &SignatureEnvelope,
) -> http::request::Parts {
    let mut builder = http::Request::builder().method(method).uri(uri);
    if let Some(headers) = builder.headers_mut() {
        envelope
            .apply_to_headers(headers)
            .expect("envelope fields are valid header values");
    }
    let (parts, ()) = builder
        .body(())
        .expect("request should build")
        .into_parts();
    parts
}

mod test_hmac;
mod test_pss;
mod test_replay;
