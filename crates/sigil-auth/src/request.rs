//! The per-call signing request.

use crate::algorithm::SignatureAlgorithm;
use crate::query::QueryParams;
use crate::replay::unix_now;

/// Everything the signer or verifier needs to know about one HTTP request.
///
/// Constructed per call and consumed once. The method is upper-cased on
/// construction; the path is kept byte-exact and must not include the host
/// or query string.
///
/// # Examples
///
/// ```
/// use sigil_auth::{SignatureAlgorithm, SigningRequest};
///
/// let request = SigningRequest::new(SignatureAlgorithm::HmacSha256, "post", "/api/v1/jobs")
///     .with_body(b"{}".to_vec())
///     .with_timestamp(1_700_000_000);
/// assert_eq!(request.method(), "POST");
/// assert_eq!(request.timestamp(), Some(1_700_000_000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRequest {
    algorithm: SignatureAlgorithm,
    method: String,
    path: String,
    query: QueryParams,
    body: Option<Vec<u8>>,
    timestamp: Option<i64>,
    nonce: Option<String>,
}

impl SigningRequest {
    /// Create a request with no query, body, timestamp or nonce.
    pub fn new(
        algorithm: SignatureAlgorithm,
        method: impl AsRef<str>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            algorithm,
            method: method.as_ref().to_ascii_uppercase(),
            path: path.into(),
            query: QueryParams::new(),
            body: None,
            timestamp: None,
            nonce: None,
        }
    }

    /// Build a request from inbound HTTP request parts and the raw body bytes.
    ///
    /// The path and query come from the request URI. Reserved query keys stay
    /// in the parameter set; canonicalization drops them.
    #[must_use]
    pub fn from_http_parts(
        algorithm: SignatureAlgorithm,
        parts: &http::request::Parts,
        body: &[u8],
    ) -> Self {
        let query = parts
            .uri
            .query()
            .map(QueryParams::from_query_str)
            .unwrap_or_default();

        Self::new(algorithm, parts.method.as_str(), parts.uri.path())
            .with_query(query)
            .with_body(body.to_vec())
    }

    /// Replace the query parameters.
    #[must_use]
    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    /// Set the raw request body.
    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the Unix timestamp in seconds.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Stamp the request with the current time.
    #[must_use]
    pub fn with_current_timestamp(self) -> Self {
        self.with_timestamp(unix_now())
    }

    /// Set the nonce. Only meaningful for RSA-PSS.
    #[must_use]
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// The algorithm this request is signed with.
    #[must_use]
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Upper-case HTTP method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters.
    #[must_use]
    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    /// Mutable access to the query parameters.
    pub fn query_mut(&mut self) -> &mut QueryParams {
        &mut self.query
    }

    /// Raw body bytes, if any.
    #[must_use]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Unix timestamp in seconds, if set.
    #[must_use]
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    /// Nonce, if set.
    #[must_use]
    pub fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }
}
