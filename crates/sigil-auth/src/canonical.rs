//! Canonical string construction.
//!
//! The canonical string is the exact text that gets signed. Its layout depends
//! on the algorithm:
//!
//! ```text
//! HMAC-SHA256:     METHOD\nPATH\nQUERY\nTIMESTAMP
//! RSA-PSS-SHA256:  METHOD\nPATH\nQUERY\nBODY_DIGEST\nTIMESTAMP\nNONCE
//! ```
//!
//! Both layouts are kept as separate, explicit formats; a verifier picks the
//! layout from the configured algorithm. Everything here is a pure function of
//! its inputs: no clock, no randomness, no I/O.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::algorithm::SignatureAlgorithm;
use crate::body::hash_body;
use crate::query::{QueryParams, is_reserved_key};
use crate::request::SigningRequest;

/// Characters percent-encoded in query keys and values.
///
/// Everything except unreserved characters (`A-Z a-z 0-9 - _ . ~`) and the
/// space, which is written as `+` afterwards.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b' ');

/// Build the canonical string for `request` under `algorithm`.
///
/// `timestamp` and `nonce` are passed separately because the verifier takes
/// them from the signature envelope, not from the request. `nonce` is ignored
/// for HMAC and treated as empty for RSA-PSS when absent.
#[must_use]
pub fn build_canonical_string(
    algorithm: SignatureAlgorithm,
    request: &SigningRequest,
    timestamp: i64,
    nonce: Option<&str>,
) -> String {
    match algorithm {
        SignatureAlgorithm::HmacSha256 => build_hmac_canonical_string(
            request.method(),
            request.path(),
            request.query(),
            timestamp,
        ),
        SignatureAlgorithm::RsaPssSha256 => build_pss_canonical_string(
            request.method(),
            request.path(),
            request.query(),
            &hash_body(request.body()),
            timestamp,
            nonce.unwrap_or_default(),
        ),
    }
}

/// Canonical string for HMAC-SHA256: `METHOD\nPATH\nQUERY\nTIMESTAMP`.
///
/// # Examples
///
/// ```
/// use sigil_auth::canonical::build_hmac_canonical_string;
/// use sigil_auth::query::QueryParams;
///
/// let canonical = build_hmac_canonical_string(
///     "post",
///     "/api/v1/workflows/submit",
///     &QueryParams::new(),
///     1_700_000_000,
/// );
/// assert_eq!(canonical, "POST\n/api/v1/workflows/submit\n\n1700000000");
/// ```
#[must_use]
pub fn build_hmac_canonical_string(
    method: &str,
    path: &str,
    query: &QueryParams,
    timestamp: i64,
) -> String {
    let method = method.to_ascii_uppercase();
    let canonical_query = build_canonical_query_string(query);
    format!("{method}\n{path}\n{canonical_query}\n{timestamp}")
}

/// Canonical string for RSA-PSS-SHA256:
/// `METHOD\nPATH\nQUERY\nBODY_DIGEST\nTIMESTAMP\nNONCE`.
#[must_use]
pub fn build_pss_canonical_string(
    method: &str,
    path: &str,
    query: &QueryParams,
    body_digest: &str,
    timestamp: i64,
    nonce: &str,
) -> String {
    canonicalize(method, path, query, body_digest, timestamp, Some(nonce))
}

/// Join the signed fields into one newline-separated string.
///
/// Fields are `METHOD`, `PATH`, `QUERY`, `BODY_DIGEST`, `TIMESTAMP` and, only
/// when present, `NONCE`. An absent nonce removes the field entirely rather
/// than leaving it blank. There is no trailing separator.
///
/// # Examples
///
/// ```
/// use sigil_auth::canonical::canonicalize;
/// use sigil_auth::query::QueryParams;
///
/// let query: QueryParams = [("details", "true")].into_iter().collect();
/// assert_eq!(
///     canonicalize("get", "/q", &query, "", 10, Some("n1")),
///     "GET\n/q\ndetails=true\n\n10\nn1"
/// );
/// assert_eq!(
///     canonicalize("get", "/q", &query, "", 10, None),
///     "GET\n/q\ndetails=true\n\n10"
/// );
/// ```
#[must_use]
pub fn canonicalize(
    method: &str,
    path: &str,
    query: &QueryParams,
    body_digest: &str,
    timestamp: i64,
    nonce: Option<&str>,
) -> String {
    let method = method.to_ascii_uppercase();
    let canonical_query = build_canonical_query_string(query);
    match nonce {
        Some(nonce) => {
            format!("{method}\n{path}\n{canonical_query}\n{body_digest}\n{timestamp}\n{nonce}")
        }
        None => format!("{method}\n{path}\n{canonical_query}\n{body_digest}\n{timestamp}"),
    }
}

/// Name the first of `method`, `path` or `nonce` that contains a line break.
///
/// These fields are joined with `\n` unescaped, so a line break inside one of
/// them lets two different requests share a canonical string. The query is
/// percent-encoded and needs no check.
///
/// # Examples
///
/// ```
/// use sigil_auth::canonical::field_with_line_break;
///
/// assert_eq!(field_with_line_break("GET", "/a", Some("n1")), None);
/// assert_eq!(field_with_line_break("GET\n/a", "/b", None), Some("method"));
/// ```
#[must_use]
pub fn field_with_line_break(
    method: &str,
    path: &str,
    nonce: Option<&str>,
) -> Option<&'static str> {
    [("method", Some(method)), ("path", Some(path)), ("nonce", nonce)]
        .into_iter()
        .find(|(_, value)| value.is_some_and(|v| v.contains('\n')))
        .map(|(name, _)| name)
}

/// Build the canonical query string.
///
/// Reserved keys (`signature`, `timestamp`, `nonce`, any case) are dropped.
/// The remaining pairs are sorted by key, then by value for repeated keys, and
/// encoded as `application/x-www-form-urlencoded`.
///
/// # Examples
///
/// ```
/// use sigil_auth::canonical::build_canonical_query_string;
/// use sigil_auth::query::QueryParams;
///
/// let query: QueryParams = [("b", "2"), ("a", "1"), ("Signature", "x")]
///     .into_iter()
///     .collect();
/// assert_eq!(build_canonical_query_string(&query), "a=1&b=2");
/// ```
#[must_use]
pub fn build_canonical_query_string(query: &QueryParams) -> String {
    let mut params: Vec<(&str, &str)> = query
        .pairs()
        .filter(|(key, _)| !is_reserved_key(key))
        .collect();

    params.sort_unstable();

    params
        .iter()
        .map(|(k, v)| format!("{}={}", query_encode(k), query_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Percent-encode one query component, writing spaces as `+`.
fn query_encode(input: &str) -> String {
    utf8_percent_encode(input, QUERY_ENCODE_SET)
        .to_string()
        .replace(' ', "+")
}
