//! The signature envelope and its HTTP transport binding.
//!
//! A signature travels with the request as three values, either as headers or
//! as query parameters:
//!
//! | Header | Query key | Present |
//! |--------|-----------|---------|
//! | `X-Signature` | `signature` | always |
//! | `X-Timestamp` | `timestamp` | always |
//! | `X-Nonce` | `nonce` | RSA-PSS only |
//!
//! Whichever channel carries them, the query keys are excluded from the
//! canonical query string.

use http::HeaderMap;
use http::header::{HeaderName, HeaderValue};

use crate::error::{AuthError, AuthResult};
use crate::query::QueryParams;

/// Header carrying the encoded signature.
pub const SIGNATURE_HEADER: HeaderName = HeaderName::from_static("x-signature");
/// Header carrying the Unix timestamp.
pub const TIMESTAMP_HEADER: HeaderName = HeaderName::from_static("x-timestamp");
/// Header carrying the nonce.
pub const NONCE_HEADER: HeaderName = HeaderName::from_static("x-nonce");

/// Query key carrying the encoded signature.
pub const SIGNATURE_QUERY_KEY: &str = "signature";
/// Query key carrying the Unix timestamp.
pub const TIMESTAMP_QUERY_KEY: &str = "timestamp";
/// Query key carrying the nonce.
pub const NONCE_QUERY_KEY: &str = "nonce";

/// A signature together with the timestamp and nonce it was computed over.
///
/// `signature` is lower-case hex for HMAC and standard base64 for RSA-PSS.
/// `timestamp` is the decimal string of the exact integer used in the
/// canonical string.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SignatureEnvelope {
    /// Encoded signature.
    pub signature: String,
    /// Decimal Unix timestamp.
    pub timestamp: String,
    /// Nonce; present iff the algorithm is RSA-PSS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl SignatureEnvelope {
    /// Parse the timestamp as Unix seconds.
    pub fn parsed_timestamp(&self) -> AuthResult<i64> {
        self.timestamp
            .trim()
            .parse()
            .map_err(|_| AuthError::malformed("timestamp is not a valid integer"))
    }

    /// Read the envelope from `X-Signature` / `X-Timestamp` / `X-Nonce`.
    ///
    /// Returns `Ok(None)` when no signature header is present at all.
    pub fn from_headers(headers: &HeaderMap) -> AuthResult<Option<Self>> {
        let Some(signature) = header_str(headers, &SIGNATURE_HEADER)? else {
            return Ok(None);
        };
        Ok(Some(Self {
            signature,
            timestamp: header_str(headers, &TIMESTAMP_HEADER)?.unwrap_or_default(),
            nonce: header_str(headers, &NONCE_HEADER)?,
        }))
    }

    /// Read the envelope from the `signature` / `timestamp` / `nonce` query keys.
    ///
    /// Keys match case-insensitively. Returns `None` when no signature key is present.
    #[must_use]
    pub fn from_query(query: &QueryParams) -> Option<Self> {
        let signature = query.get_ignore_case(SIGNATURE_QUERY_KEY)?;
        Some(Self {
            signature: signature.to_owned(),
            timestamp: query
                .get_ignore_case(TIMESTAMP_QUERY_KEY)
                .unwrap_or_default()
                .to_owned(),
            nonce: query.get_ignore_case(NONCE_QUERY_KEY).map(ToOwned::to_owned),
        })
    }

    /// Read the envelope from an inbound request: headers first, query second.
    ///
    /// A request carrying neither yields an envelope with empty fields, which
    /// the verifier rejects as malformed input.
    pub fn from_http_parts(parts: &http::request::Parts) -> AuthResult<Self> {
        if let Some(envelope) = Self::from_headers(&parts.headers)? {
            return Ok(envelope);
        }
        let query = parts
            .uri
            .query()
            .map(QueryParams::from_query_str)
            .unwrap_or_default();
        Ok(Self::from_query(&query).unwrap_or_else(|| Self {
            signature: String::new(),
            timestamp: String::new(),
            nonce: None,
        }))
    }

    /// Write the envelope into outbound request headers.
    pub fn apply_to_headers(&self, headers: &mut HeaderMap) -> AuthResult<()> {
        headers.insert(SIGNATURE_HEADER, to_header_value(&self.signature)?);
        headers.insert(TIMESTAMP_HEADER, to_header_value(&self.timestamp)?);
        if let Some(nonce) = &self.nonce {
            headers.insert(NONCE_HEADER, to_header_value(nonce)?);
        }
        Ok(())
    }

    /// Write the envelope into outbound query parameters.
    pub fn apply_to_query(&self, query: &mut QueryParams) {
        query.insert(SIGNATURE_QUERY_KEY, self.signature.clone());
        query.insert(TIMESTAMP_QUERY_KEY, self.timestamp.clone());
        if let Some(nonce) = &self.nonce {
            query.insert(NONCE_QUERY_KEY, nonce.clone());
        }
    }
}

fn header_str(headers: &HeaderMap, name: &HeaderName) -> AuthResult<Option<String>> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map(|s| s.trim().to_owned())
                .map_err(|_| AuthError::malformed(format!("header {name} is not valid ASCII")))
        })
        .transpose()
}

fn to_header_value(value: &str) -> AuthResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| AuthError::malformed("signature field is not a valid header value"))
}
