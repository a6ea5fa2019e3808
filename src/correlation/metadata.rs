//! Request metadata and the per-request context carried through handlers

use crate::core::CorrelationLogger;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Case-insensitive, multi-valued string map sent alongside a request
///
/// Keys are stored lower-cased, so `Correlation_ID` and `correlation_id`
/// address the same entry.
///
/// # Example
///
/// ```
/// use fanout_logger::correlation::Metadata;
///
/// let md = Metadata::from_pairs([("Correlation_ID", "abc"), ("tenant", "acme")]);
/// assert_eq!(md.get("correlation_id"), ["abc"]);
/// assert_eq!(md.first("TENANT"), Some("acme"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: BTreeMap<String, Vec<String>>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from key/value pairs; repeated keys accumulate values
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut md = Self::new();
        for (key, value) in pairs {
            md.append(key.as_ref(), value);
        }
        md
    }

    /// All values under `key`, in insertion order
    pub fn get(&self, key: &str) -> &[String] {
        self.entries
            .get(&key.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).first().map(String::as_str)
    }

    /// Replace every value under `key`
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(key.to_lowercase(), vec![value.into()]);
    }

    /// Add a value under `key`, keeping existing ones
    pub fn append(&mut self, key: &str, value: impl Into<String>) {
        self.entries
            .entry(key.to_lowercase())
            .or_default()
            .push(value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.entries.remove(&key.to_lowercase())
    }

    /// Merge `other` into a copy of `self`, appending values of shared keys
    #[must_use]
    pub fn join(&self, other: &Metadata) -> Metadata {
        let mut joined = self.clone();
        for (key, values) in &other.entries {
            joined
                .entries
                .entry(key.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
        joined
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

/// Context propagated with one request
///
/// Carries the inbound metadata (absent when the transport supplied none)
/// and, once the request passed the correlation interceptor, the logger
/// bound to its correlation token. Cloning is cheap and never shares
/// mutation.
#[derive(Clone, Default)]
pub struct RequestContext {
    metadata: Option<Metadata>,
    logger: Option<Arc<dyn CorrelationLogger>>,
}

impl RequestContext {
    /// Context without any incoming metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Context carrying inbound `metadata`
    pub fn incoming(metadata: Metadata) -> Self {
        Self {
            metadata: Some(metadata),
            logger: None,
        }
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn CorrelationLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Logger bound to this request's correlation token
    pub fn logger(&self) -> Option<&Arc<dyn CorrelationLogger>> {
        self.logger.as_ref()
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.logger.as_ref().and_then(|logger| logger.correlation_id())
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("metadata", &self.metadata)
            .field("correlation_id", &self.correlation_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_case_insensitive() {
        let mut md = Metadata::new();
        md.append("X-Request", "1");
        md.append("x-request", "2");

        assert_eq!(md.get("X-REQUEST"), ["1", "2"]);
        assert_eq!(md.len(), 1);
        assert!(md.contains_key("x-Request"));
    }

    #[test]
    fn test_insert_replaces() {
        let mut md = Metadata::from_pairs([("k", "a"), ("k", "b")]);
        md.insert("K", "c");
        assert_eq!(md.get("k"), ["c"]);
    }

    #[test]
    fn test_join_keeps_both_sides() {
        let left = Metadata::from_pairs([("a", "1"), ("shared", "x")]);
        let right = Metadata::from_pairs([("b", "2"), ("shared", "y")]);

        let joined = left.join(&right);
        assert_eq!(joined.get("a"), ["1"]);
        assert_eq!(joined.get("b"), ["2"]);
        assert_eq!(joined.get("shared"), ["x", "y"]);
        // Inputs untouched
        assert_eq!(left.get("shared"), ["x"]);
    }

    #[test]
    fn test_missing_key() {
        let md = Metadata::new();
        assert!(md.get("nope").is_empty());
        assert_eq!(md.first("nope"), None);
    }

    #[test]
    fn test_context_without_metadata() {
        let ctx = RequestContext::new();
        assert!(ctx.metadata().is_none());
        assert!(ctx.logger().is_none());
        assert_eq!(ctx.correlation_id(), None);
    }
}
