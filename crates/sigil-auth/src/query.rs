//! Query parameter collection used by the canonicalizer.
//!
//! A [`QueryParams`] maps each key to one or more values. Keys are kept in a
//! sorted map, so the order in which parameters were inserted never leaks
//! into the canonical string.

use std::collections::BTreeMap;

/// Query keys carrying the signature credentials themselves.
///
/// These are never part of the signed material, compared case-insensitively.
pub const RESERVED_QUERY_KEYS: [&str; 3] = ["signature", "timestamp", "nonce"];

/// Whether `key` is one of the [`RESERVED_QUERY_KEYS`].
#[must_use]
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_QUERY_KEYS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(key))
}

/// Unordered multi-valued query parameters.
///
/// # Examples
///
/// ```
/// use sigil_auth::query::QueryParams;
///
/// let mut query = QueryParams::new();
/// query.insert("details", "true");
/// query.append("tag", "b");
/// query.append("tag", "a");
/// assert_eq!(query.get("details"), Some("true"));
/// assert_eq!(query.get_all("tag"), ["b", "a"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: BTreeMap<String, Vec<String>>,
}

impl QueryParams {
    /// Create an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw URI query string (`a=1&b=two+words`), decoding
    /// `application/x-www-form-urlencoded` escapes. Repeated keys keep every value.
    #[must_use]
    pub fn from_query_str(query: &str) -> Self {
        form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Set `key` to a single value, replacing any existing values.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), vec![value.into()]);
    }

    /// Add another value for `key`.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.entry(key.into()).or_default().push(value.into());
    }

    /// First value for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values for `key`, in insertion order.
    #[must_use]
    pub fn get_all(&self, key: &str) -> &[String] {
        self.params.get(key).map_or(&[], Vec::as_slice)
    }

    /// First value whose key matches `key` ignoring ASCII case.
    #[must_use]
    pub fn get_ignore_case(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    /// Every `(key, value)` pair, keys ascending, values in insertion order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params
            .iter()
            .flat_map(|(k, values)| values.iter().map(move |v| (k.as_str(), v.as_str())))
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether no parameters are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.append(k, v);
        }
        params
    }
}
