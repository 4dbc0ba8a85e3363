//! Request signing and verification for the Sigil job-submission gateway.
//!
//! This crate signs outbound HTTP API calls and verifies inbound ones with one
//! of two algorithms, chosen once at configuration time:
//!
//! - **HMAC-SHA256** with a shared secret (hex signature, no nonce).
//! - **RSA-PSS-SHA256** with an RSA keypair (base64 signature, random nonce,
//!   body digest included in the signed material).
//!
//! Verification and replay protection are separate checks. A request is
//! accepted only when the signature matches and the timestamp lies within the
//! configured window.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use sigil_auth::keys::load_symmetric;
//! use sigil_auth::{
//!     ReplayGuard, RequestAuthenticator, SignatureAlgorithm, SigningRequest, sign,
//! };
//!
//! let key = Arc::new(load_symmetric("s3cr3t").unwrap());
//! let authenticator =
//!     RequestAuthenticator::new(SignatureAlgorithm::HmacSha256, Arc::clone(&key), ReplayGuard::new(300))
//!         .unwrap();
//!
//! // Client side: sign the request and attach the envelope.
//! let request = SigningRequest::new(SignatureAlgorithm::HmacSha256, "POST", "/api/v1/workflows/submit")
//!     .with_body(br#"{"prompt":"cat"}"#.to_vec())
//!     .with_current_timestamp();
//! let envelope = sign(&request, &key).unwrap();
//!
//! // Server side: rebuild the request and check the envelope.
//! assert!(authenticator.authenticate(&request, &envelope).is_ok());
//! ```
//!
//! # Modules
//!
//! - [`algorithm`] - Supported algorithms and their names
//! - [`authenticator`] - Combined signature and replay verdict
//! - [`body`] - Request body digest
//! - [`canonical`] - Canonical string construction
//! - [`config`] - Environment-driven configuration
//! - [`envelope`] - Signature envelope and HTTP transport binding
//! - [`error`] - Authentication error types
//! - [`keys`] - Key loading, validation and generation
//! - [`query`] - Query parameter collection
//! - [`replay`] - Timestamp freshness and nonce generation
//! - [`request`] - The per-call signing request
//! - [`signer`] - Signing
//! - [`verifier`] - Signature verification

pub mod algorithm;
pub mod authenticator;
pub mod body;
pub mod canonical;
pub mod config;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod query;
pub mod replay;
pub mod request;
pub mod signer;
pub mod verifier;

pub use algorithm::SignatureAlgorithm;
pub use authenticator::{RequestAuthenticator, Verdict};
pub use config::SignatureConfig;
pub use envelope::SignatureEnvelope;
pub use error::{AuthError, AuthErrorKind, AuthResult};
pub use keys::KeyMaterial;
pub use query::QueryParams;
pub use replay::ReplayGuard;
pub use request::SigningRequest;
pub use signer::sign;
pub use verifier::verify;
