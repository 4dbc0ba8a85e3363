//! The combined authentication verdict used at the gateway boundary.
//!
//! [`RequestAuthenticator`] owns the configured algorithm, the loaded key and
//! the replay window. A request is accepted only when both the signature check
//! and the timestamp freshness check pass; either one can reject it on its own.
//! A configured tolerance of 0 switches the freshness check off.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::algorithm::SignatureAlgorithm;
use crate::config::SignatureConfig;
use crate::envelope::SignatureEnvelope;
use crate::error::{AuthError, AuthResult};
use crate::keys::KeyMaterial;
use crate::replay::{ReplayGuard, unix_now};
use crate::request::SigningRequest;
use crate::verifier::verify;

/// Outcome of authenticating one request.
pub type Verdict = AuthResult<()>;

/// Verifies inbound requests against one algorithm and one key.
///
/// Cheap to clone: the key is shared behind an [`Arc`].
#[derive(Debug, Clone)]
pub struct RequestAuthenticator {
    algorithm: SignatureAlgorithm,
    key: Option<Arc<KeyMaterial>>,
    guard: ReplayGuard,
}

impl RequestAuthenticator {
    /// Create an enforcing authenticator.
    ///
    /// A guard with a tolerance of 0 turns the freshness check off; only the
    /// signature is verified.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if `key` cannot be used with
    /// `algorithm`.
    pub fn new(
        algorithm: SignatureAlgorithm,
        key: Arc<KeyMaterial>,
        guard: ReplayGuard,
    ) -> AuthResult<Self> {
        if !key.supports(algorithm) {
            return Err(AuthError::config(format!(
                "configured key cannot be used with {algorithm}"
            )));
        }
        if matches!(key.as_ref(), KeyMaterial::Asymmetric(pair) if pair.public_key().is_none()) {
            return Err(AuthError::config(
                "RSA-PSS verification requires a public key",
            ));
        }
        if guard.tolerance_secs() == 0 {
            warn!("Timestamp tolerance is 0; request freshness is not checked");
        }
        Ok(Self {
            algorithm,
            key: Some(key),
            guard,
        })
    }

    /// Create an authenticator that accepts every request.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            algorithm: SignatureAlgorithm::default(),
            key: None,
            guard: ReplayGuard::new(0),
        }
    }

    /// Build an authenticator from configuration.
    ///
    /// Intended to run once at startup; a returned error should abort the
    /// process.
    pub fn from_config(config: &SignatureConfig) -> AuthResult<Self> {
        if !config.enabled {
            warn!("Request signature verification is disabled");
            return Ok(Self::disabled());
        }

        let key = KeyMaterial::from_config(config)?;
        let authenticator = Self::new(
            config.algorithm,
            Arc::new(key),
            ReplayGuard::new(config.timestamp_tolerance_secs),
        )?;
        info!(
            algorithm = %config.algorithm,
            tolerance_secs = config.timestamp_tolerance_secs,
            "Request signature verification enabled"
        );
        Ok(authenticator)
    }

    /// Whether signatures are enforced.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    /// The configured algorithm.
    #[must_use]
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Whether the timestamp window is enforced. False for a tolerance of 0.
    #[must_use]
    pub fn checks_freshness(&self) -> bool {
        self.is_enabled() && self.guard.tolerance_secs() > 0
    }

    /// The configured replay window.
    #[must_use]
    pub fn replay_guard(&self) -> ReplayGuard {
        self.guard
    }

    /// Verify the signature, then the timestamp freshness against now.
    pub fn authenticate(
        &self,
        request: &SigningRequest,
        envelope: &SignatureEnvelope,
    ) -> Verdict {
        self.authenticate_at(request, envelope, unix_now())
    }

    /// Like [`authenticate`](Self::authenticate) with a caller-supplied `now`.
    pub fn authenticate_at(
        &self,
        request: &SigningRequest,
        envelope: &SignatureEnvelope,
        now: i64,
    ) -> Verdict {
        let Some(key) = &self.key else {
            return Ok(());
        };
        let result = verify(request, envelope, key).and_then(|()| {
            if self.checks_freshness() {
                self.guard.check_at(envelope.parsed_timestamp()?, now)
            } else {
                Ok(())
            }
        });
        log_verdict(request, &result);
        result
    }

    /// Authenticate an inbound HTTP request from its parts and raw body.
    ///
    /// The envelope is read from headers, falling back to query parameters.
    pub fn authenticate_http(&self, parts: &http::request::Parts, body: &[u8]) -> Verdict {
        if !self.is_enabled() {
            return Ok(());
        }
        let envelope = SignatureEnvelope::from_http_parts(parts)?;
        let request = SigningRequest::from_http_parts(self.algorithm, parts, body);
        self.authenticate(&request, &envelope)
    }

    /// Authenticate without blocking the async executor.
    ///
    /// RSA-PSS verification runs on the blocking thread pool; HMAC is cheap
    /// and runs inline.
    pub async fn authenticate_blocking_offload(
        &self,
        request: SigningRequest,
        envelope: SignatureEnvelope,
    ) -> Verdict {
        if !self.algorithm.is_asymmetric() || !self.is_enabled() {
            return self.authenticate(&request, &envelope);
        }

        let this = self.clone();
        match tokio::task::spawn_blocking(move || this.authenticate(&request, &envelope)).await {
            Ok(verdict) => verdict,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(AuthError::config(format!(
                "signature verification task did not complete: {e}"
            ))),
        }
    }
}

fn log_verdict(request: &SigningRequest, result: &Verdict) {
    match result {
        Ok(()) => debug!(
            method = request.method(),
            path = request.path(),
            "Request authenticated"
        ),
        Err(e) => debug!(
            method = request.method(),
            path = request.path(),
            kind = %e.kind(),
            "Request rejected"
        ),
    }
}
