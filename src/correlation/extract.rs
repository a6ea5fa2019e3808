//! Correlation token extraction, generation and injection

use super::metadata::{Metadata, RequestContext};
use std::fmt;
use std::sync::Arc;

/// Metadata key holding the correlation token
pub const CORRELATION_ID_KEY: &str = "correlation_id";

/// Why a request did not carry a usable correlation token
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CorrelationError {
    /// The request has no metadata container at all
    #[error("no incoming metadata")]
    NoIncomingMetadata,

    /// Metadata present but the key is absent or empty; a fresh token was generated
    #[error("empty correlation_id")]
    NoCorrelationId { generated: String },
}

impl CorrelationError {
    /// The token generated in place of a missing one
    pub fn generated(&self) -> Option<&str> {
        match self {
            CorrelationError::NoIncomingMetadata => None,
            CorrelationError::NoCorrelationId { generated } => Some(generated),
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, CorrelationError::NoCorrelationId { .. })
    }
}

/// Source of fresh correlation tokens
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

impl<F> IdGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn generate(&self) -> String {
        self()
    }
}

/// Time-ordered UUID v7 tokens
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV7Generator;

impl IdGenerator for UuidV7Generator {
    fn generate(&self) -> String {
        uuid::Uuid::now_v7().to_string()
    }
}

/// Reads and writes the correlation token in request metadata
///
/// # Example
///
/// ```
/// use fanout_logger::correlation::{
///     CorrelationError, CorrelationExtractor, Metadata, RequestContext,
/// };
///
/// let extractor = CorrelationExtractor::new().with_generator(|| "fresh".to_string());
///
/// let ctx = RequestContext::incoming(Metadata::from_pairs([("correlation_id", "abc")]));
/// assert_eq!(extractor.extract(&ctx), Ok("abc".to_string()));
///
/// let ctx = RequestContext::incoming(Metadata::new());
/// assert_eq!(
///     extractor.extract(&ctx),
///     Err(CorrelationError::NoCorrelationId { generated: "fresh".to_string() })
/// );
/// ```
#[derive(Clone)]
pub struct CorrelationExtractor {
    key: String,
    generator: Arc<dyn IdGenerator>,
}

impl CorrelationExtractor {
    pub fn new() -> Self {
        Self {
            key: CORRELATION_ID_KEY.to_string(),
            generator: Arc::new(UuidV7Generator),
        }
    }

    /// Use a different metadata key
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into().to_lowercase();
        self
    }

    #[must_use]
    pub fn with_generator(mut self, generator: impl IdGenerator + 'static) -> Self {
        self.generator = Arc::new(generator);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// First non-empty token under the key
    ///
    /// A missing or empty token is reported as
    /// [`CorrelationError::NoCorrelationId`] carrying a generated one.
    pub fn extract(&self, ctx: &RequestContext) -> Result<String, CorrelationError> {
        let metadata = ctx.metadata().ok_or(CorrelationError::NoIncomingMetadata)?;

        match metadata.get(&self.key).iter().find(|value| !value.is_empty()) {
            Some(token) => Ok(token.clone()),
            None => Err(CorrelationError::NoCorrelationId {
                generated: self.generator.generate(),
            }),
        }
    }

    /// Join `token` under the key into `metadata`, keeping every other entry
    pub fn inject(&self, metadata: Option<&Metadata>, token: &str) -> Metadata {
        let mut addition = Metadata::new();
        addition.append(&self.key, token);
        match metadata {
            Some(existing) => existing.join(&addition),
            None => addition,
        }
    }
}

impl Default for CorrelationExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CorrelationExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorrelationExtractor")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Extract with the default key and UUID v7 generator
pub fn extract_correlation_id(ctx: &RequestContext) -> Result<String, CorrelationError> {
    CorrelationExtractor::new().extract(ctx)
}

/// Inject under the default key
pub fn inject_correlation_id(metadata: Option<&Metadata>, token: &str) -> Metadata {
    CorrelationExtractor::new().inject(metadata, token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed() -> CorrelationExtractor {
        CorrelationExtractor::new().with_generator(|| "some id".to_string())
    }

    #[test]
    fn test_no_incoming_metadata() {
        let err = fixed().extract(&RequestContext::new()).unwrap_err();
        assert_eq!(err, CorrelationError::NoIncomingMetadata);
        assert_eq!(err.generated(), None);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_empty_metadata_generates() {
        let err = fixed()
            .extract(&RequestContext::incoming(Metadata::new()))
            .unwrap_err();
        assert_eq!(err.generated(), Some("some id"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_first_non_empty_value_wins() {
        let md = Metadata::from_pairs([
            ("correlation_id", ""),
            ("Correlation_Id", "second"),
            ("correlation_id", "third"),
        ]);
        let token = fixed().extract(&RequestContext::incoming(md)).unwrap();
        assert_eq!(token, "second");
    }

    #[test]
    fn test_only_empty_values_generate() {
        let md = Metadata::from_pairs([("correlation_id", "")]);
        let err = fixed().extract(&RequestContext::incoming(md)).unwrap_err();
        assert_eq!(err.generated(), Some("some id"));
    }

    #[test]
    fn test_inject_preserves_entries() {
        let md = Metadata::from_pairs([("tenant", "acme"), ("correlation_id", "")]);
        let injected = fixed().inject(Some(&md), "tok");

        assert_eq!(injected.get("tenant"), ["acme"]);
        let token = fixed().extract(&RequestContext::incoming(injected)).unwrap();
        assert_eq!(token, "tok");
    }

    #[test]
    fn test_custom_key() {
        let extractor = fixed().with_key("X-Trace-Id");
        assert_eq!(extractor.key(), "x-trace-id");

        let md = Metadata::from_pairs([("x-trace-id", "t1")]);
        assert_eq!(extractor.extract(&RequestContext::incoming(md)), Ok("t1".to_string()));
    }

    #[test]
    fn test_uuid_tokens_are_unique() {
        let a = UuidV7Generator.generate();
        let b = UuidV7Generator.generate();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }
}
