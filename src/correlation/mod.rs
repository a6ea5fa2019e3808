//! Correlation token propagation for request handlers

pub mod extract;
pub mod interceptor;
pub mod metadata;

pub use extract::{
    extract_correlation_id, inject_correlation_id, CorrelationError, CorrelationExtractor,
    IdGenerator, UuidV7Generator, CORRELATION_ID_KEY,
};
pub use interceptor::{
    CorrelationInterceptor, InterceptError, ServerStream, StreamServerInfo, UnaryServerInfo,
    WrappedStream,
};
pub use metadata::{Metadata, RequestContext};
