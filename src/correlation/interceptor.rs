//! Server-side interceptors binding a correlation token to each request

use super::extract::{CorrelationError, CorrelationExtractor};
use super::metadata::RequestContext;
use crate::core::{CorrelationLogger, FieldValue};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

const UNARY_KEY: &str = "unary_server_interceptor";
const STREAM_KEY: &str = "stream_server_interceptor";

/// Details of the unary call being intercepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnaryServerInfo {
    pub full_method: String,
}

impl UnaryServerInfo {
    pub fn new(full_method: impl Into<String>) -> Self {
        Self {
            full_method: full_method.into(),
        }
    }
}

/// Details of the stream being intercepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamServerInfo {
    pub full_method: String,
    pub is_client_stream: bool,
    pub is_server_stream: bool,
}

impl StreamServerInfo {
    pub fn new(full_method: impl Into<String>) -> Self {
        Self {
            full_method: full_method.into(),
            is_client_stream: false,
            is_server_stream: true,
        }
    }
}

/// Failure of an intercepted call
#[derive(Debug, thiserror::Error)]
pub enum InterceptError<E> {
    /// No metadata to read a token from; the handler never ran
    #[error(transparent)]
    Extraction(#[from] CorrelationError),

    /// The handler's own error, passed through untouched
    #[error("{0}")]
    Handler(E),
}

impl<E> InterceptError<E> {
    /// The handler error, if the handler ran and failed
    pub fn into_handler_error(self) -> Option<E> {
        match self {
            InterceptError::Handler(e) => Some(e),
            InterceptError::Extraction(_) => None,
        }
    }
}

/// A server-side message stream with a request context
pub trait ServerStream {
    type Message;
    type Error;

    fn context(&self) -> &RequestContext;

    fn send_message(&mut self, message: Self::Message) -> Result<(), Self::Error>;

    /// Next inbound message, `Ok(None)` once the client is done
    fn recv_message(&mut self) -> Result<Option<Self::Message>, Self::Error>;
}

/// Stream whose context is replaced for its whole lifetime
pub struct WrappedStream<S> {
    ctx: RequestContext,
    inner: S,
}

impl<S> WrappedStream<S> {
    pub fn new(ctx: RequestContext, inner: S) -> Self {
        Self { ctx, inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ServerStream> ServerStream for WrappedStream<S> {
    type Message = S::Message;
    type Error = S::Error;

    fn context(&self) -> &RequestContext {
        &self.ctx
    }

    fn send_message(&mut self, message: Self::Message) -> Result<(), Self::Error> {
        self.inner.send_message(message)
    }

    fn recv_message(&mut self) -> Result<Option<Self::Message>, Self::Error> {
        self.inner.recv_message()
    }
}

/// Binds every intercepted request to a correlation token
///
/// On entry the token is read from the request metadata. When it is missing,
/// a debug notice `no correlation id` goes to the base logger and a freshly
/// generated token is injected into the metadata the handler sees. The
/// handler's context then carries a logger bound to the token; one info
/// record names the call, and a handler failure is logged on the bound
/// logger before being returned unchanged.
///
/// # Example
///
/// ```
/// use fanout_logger::correlation::{
///     CorrelationInterceptor, Metadata, RequestContext, UnaryServerInfo,
/// };
/// use fanout_logger::{Logger, LogLevel};
/// use std::sync::Arc;
///
/// let logger = Logger::builder().level(LogLevel::Debug).build().unwrap();
/// let interceptor = CorrelationInterceptor::new(Arc::new(logger));
///
/// let ctx = RequestContext::incoming(Metadata::from_pairs([("correlation_id", "abc")]));
/// let info = UnaryServerInfo::new("/orders.Orders/Get");
///
/// let seen = interceptor
///     .unary(ctx, 42u32, &info, |ctx, _req| {
///         Ok::<_, std::io::Error>(ctx.correlation_id().map(str::to_string))
///     })
///     .unwrap();
/// assert_eq!(seen.as_deref(), Some("abc"));
/// ```
#[derive(Clone)]
pub struct CorrelationInterceptor {
    logger: Arc<dyn CorrelationLogger>,
    extractor: CorrelationExtractor,
}

impl CorrelationInterceptor {
    pub fn new(logger: Arc<dyn CorrelationLogger>) -> Self {
        Self {
            logger,
            extractor: CorrelationExtractor::new(),
        }
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: CorrelationExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn extractor(&self) -> &CorrelationExtractor {
        &self.extractor
    }

    /// Resolve the token and bind the logger; shared by every entry point
    fn bind(
        &self,
        ctx: RequestContext,
    ) -> Result<(RequestContext, Arc<dyn CorrelationLogger>), CorrelationError> {
        let (ctx, token) = match self.extractor.extract(&ctx) {
            Ok(token) => (ctx, token),
            Err(CorrelationError::NoCorrelationId { generated }) => {
                self.logger.debug("no correlation id");
                let metadata = self.extractor.inject(ctx.metadata(), &generated);
                (ctx.with_metadata(metadata), generated)
            }
            Err(e) => return Err(e),
        };

        let bound: Arc<dyn CorrelationLogger> = Arc::from(self.logger.with_correlation_id(&token));
        Ok((ctx.with_logger(Arc::clone(&bound)), bound))
    }

    fn log_call(
        logger: &dyn CorrelationLogger,
        key: &str,
        method: &str,
        request: Option<&dyn fmt::Debug>,
    ) {
        match logger.as_field_logger() {
            Some(fields) => {
                let mut with = fields.with_field(key, FieldValue::from(method));
                if let Some(request) = request {
                    with = with.with_field("request", FieldValue::from(format!("{:?}", request)));
                }
                with.info("");
            }
            None => match request {
                Some(request) => {
                    logger.infof(format_args!("{}={} request={:?}", key, method, request))
                }
                None => logger.infof(format_args!("{}={}", key, method)),
            },
        }
    }

    fn log_failure<E: fmt::Display>(logger: &dyn CorrelationLogger, key: &str, err: &E) {
        logger.errorf(format_args!("{}={}", key, err));
    }

    /// Intercept a blocking unary call
    pub fn unary<Req, Resp, E, F>(
        &self,
        ctx: RequestContext,
        request: Req,
        info: &UnaryServerInfo,
        handler: F,
    ) -> Result<Resp, InterceptError<E>>
    where
        Req: fmt::Debug,
        E: fmt::Display,
        F: FnOnce(RequestContext, Req) -> Result<Resp, E>,
    {
        let (ctx, logger) = self.bind(ctx)?;
        Self::log_call(logger.as_ref(), UNARY_KEY, &info.full_method, Some(&request));

        handler(ctx, request).map_err(|e| {
            Self::log_failure(logger.as_ref(), UNARY_KEY, &e);
            InterceptError::Handler(e)
        })
    }

    /// Intercept an async unary call
    pub async fn unary_async<Req, Resp, E, F, Fut>(
        &self,
        ctx: RequestContext,
        request: Req,
        info: &UnaryServerInfo,
        handler: F,
    ) -> Result<Resp, InterceptError<E>>
    where
        Req: fmt::Debug,
        E: fmt::Display,
        F: FnOnce(RequestContext, Req) -> Fut,
        Fut: Future<Output = Result<Resp, E>>,
    {
        let (ctx, logger) = self.bind(ctx)?;
        Self::log_call(logger.as_ref(), UNARY_KEY, &info.full_method, Some(&request));

        handler(ctx, request).await.map_err(|e| {
            Self::log_failure(logger.as_ref(), UNARY_KEY, &e);
            InterceptError::Handler(e)
        })
    }

    /// Intercept a blocking stream; the handler sees the wrapped stream
    pub fn stream<S, E, F>(
        &self,
        stream: S,
        info: &StreamServerInfo,
        handler: F,
    ) -> Result<(), InterceptError<E>>
    where
        S: ServerStream,
        E: fmt::Display,
        F: FnOnce(WrappedStream<S>) -> Result<(), E>,
    {
        let (ctx, logger) = self.bind(stream.context().clone())?;
        Self::log_call(logger.as_ref(), STREAM_KEY, &info.full_method, None);

        handler(WrappedStream::new(ctx, stream)).map_err(|e| {
            Self::log_failure(logger.as_ref(), STREAM_KEY, &e);
            InterceptError::Handler(e)
        })
    }

    /// Intercept an async stream
    pub async fn stream_async<S, E, F, Fut>(
        &self,
        stream: S,
        info: &StreamServerInfo,
        handler: F,
    ) -> Result<(), InterceptError<E>>
    where
        S: ServerStream,
        E: fmt::Display,
        F: FnOnce(WrappedStream<S>) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let (ctx, logger) = self.bind(stream.context().clone())?;
        Self::log_call(logger.as_ref(), STREAM_KEY, &info.full_method, None);

        handler(WrappedStream::new(ctx, stream)).await.map_err(|e| {
            Self::log_failure(logger.as_ref(), STREAM_KEY, &e);
            InterceptError::Handler(e)
        })
    }
}

impl fmt::Debug for CorrelationInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorrelationInterceptor")
            .field("extractor", &self.extractor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Debugger;
    use crate::correlation::Metadata;
    use parking_lot::Mutex;

    /// Minimal logger without field support
    #[derive(Clone, Default)]
    struct Plain {
        id: Option<String>,
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl Plain {
        fn push(&self, level: &str, message: &str) {
            self.lines
                .lock()
                .push(format!("{} [{}] {}", level, self.id.as_deref().unwrap_or("-"), message));
        }
    }

    impl Debugger for Plain {
        fn debug(&self, message: &str) {
            self.push("debug", message);
        }
    }

    impl CorrelationLogger for Plain {
        fn info(&self, message: &str) {
            self.push("info", message);
        }

        fn error(&self, message: &str) {
            self.push("error", message);
        }

        fn with_correlation_id(&self, id: &str) -> Box<dyn CorrelationLogger> {
            Box::new(Plain {
                id: Some(id.to_string()),
                lines: Arc::clone(&self.lines),
            })
        }

        fn correlation_id(&self) -> Option<&str> {
            self.id.as_deref()
        }
    }

    fn interceptor(logger: &Plain) -> CorrelationInterceptor {
        CorrelationInterceptor::new(Arc::new(logger.clone()))
            .with_extractor(CorrelationExtractor::new().with_generator(|| "gen-1".to_string()))
    }

    struct VecStream {
        ctx: RequestContext,
        inbound: Vec<u32>,
        sent: Vec<u32>,
    }

    impl ServerStream for VecStream {
        type Message = u32;
        type Error = String;

        fn context(&self) -> &RequestContext {
            &self.ctx
        }

        fn send_message(&mut self, message: u32) -> Result<(), String> {
            self.sent.push(message);
            Ok(())
        }

        fn recv_message(&mut self) -> Result<Option<u32>, String> {
            Ok(self.inbound.pop())
        }
    }

    #[test]
    fn test_plain_logger_gets_formatted_message() {
        let logger = Plain::default();
        let ctx = RequestContext::incoming(Metadata::from_pairs([("correlation_id", "abc")]));

        interceptor(&logger)
            .unary(ctx, "ping", &UnaryServerInfo::new("/svc/Ping"), |_, _| {
                Ok::<_, String>(())
            })
            .unwrap();

        assert_eq!(
            *logger.lines.lock(),
            vec!["info [abc] unary_server_interceptor=/svc/Ping request=\"ping\"".to_string()]
        );
    }

    #[test]
    fn test_missing_token_is_generated_and_injected() {
        let logger = Plain::default();
        let ctx = RequestContext::incoming(Metadata::from_pairs([("tenant", "acme")]));

        let seen = interceptor(&logger)
            .unary(ctx, (), &UnaryServerInfo::new("/svc/Ping"), |ctx, _| {
                let md = ctx.metadata().cloned().unwrap_or_default();
                Ok::<_, String>((md, ctx.correlation_id().map(str::to_string)))
            })
            .unwrap();

        assert_eq!(seen.0.get("correlation_id"), ["gen-1"]);
        assert_eq!(seen.0.get("tenant"), ["acme"]);
        assert_eq!(seen.1.as_deref(), Some("gen-1"));
        assert_eq!(logger.lines.lock()[0], "debug [-] no correlation id");
    }

    #[test]
    fn test_no_metadata_skips_handler() {
        let logger = Plain::default();
        let mut called = false;

        let err = interceptor(&logger)
            .unary(RequestContext::new(), (), &UnaryServerInfo::new("/svc/Ping"), |_, _| {
                called = true;
                Ok::<_, String>(())
            })
            .unwrap_err();

        assert!(!called);
        assert!(matches!(
            err,
            InterceptError::Extraction(CorrelationError::NoIncomingMetadata)
        ));
        assert!(logger.lines.lock().is_empty());
    }

    #[test]
    fn test_handler_error_logged_on_bound_logger() {
        let logger = Plain::default();
        let ctx = RequestContext::incoming(Metadata::from_pairs([("correlation_id", "abc")]));

        let err = interceptor(&logger)
            .unary(ctx, (), &UnaryServerInfo::new("/svc/Ping"), |_, _| {
                Err::<(), _>("not found".to_string())
            })
            .unwrap_err();

        assert_eq!(err.into_handler_error().as_deref(), Some("not found"));
        assert_eq!(
            logger.lines.lock().last().map(String::as_str),
            Some("error [abc] unary_server_interceptor=not found")
        );
    }

    #[test]
    fn test_stream_context_is_overridden() {
        let logger = Plain::default();
        let stream = VecStream {
            ctx: RequestContext::incoming(Metadata::new()),
            inbound: vec![2, 1],
            sent: Vec::new(),
        };

        interceptor(&logger)
            .stream(stream, &StreamServerInfo::new("/svc/Watch"), |mut wrapped| {
                assert_eq!(wrapped.context().correlation_id(), Some("gen-1"));
                assert_eq!(
                    wrapped.context().metadata().map(|md| md.get("correlation_id").to_vec()),
                    Some(vec!["gen-1".to_string()])
                );
                while let Some(n) = wrapped.recv_message()? {
                    wrapped.send_message(n * 10)?;
                }
                assert_eq!(wrapped.inner().sent, vec![10, 20]);
                // Original stream keeps its own context
                assert!(wrapped.inner().ctx.logger().is_none());
                Ok::<_, String>(())
            })
            .unwrap();

        assert_eq!(
            logger.lines.lock().last().map(String::as_str),
            Some("info [gen-1] stream_server_interceptor=/svc/Watch")
        );
    }

    #[test]
    fn test_unary_async_binds_logger() {
        let logger = Plain::default();
        let ctx = RequestContext::incoming(Metadata::from_pairs([("Correlation_ID", "xyz")]));
        let interceptor = interceptor(&logger);

        let id = tokio_test::block_on(interceptor.unary_async(
            ctx,
            1u8,
            &UnaryServerInfo::new("/svc/Get"),
            |ctx, _| async move {
                if let Some(logger) = ctx.logger() {
                    logger.info("inside");
                }
                Ok::<_, String>(ctx.correlation_id().map(str::to_string))
            },
        ))
        .unwrap();

        assert_eq!(id.as_deref(), Some("xyz"));
        assert_eq!(
            *logger.lines.lock(),
            vec![
                "info [xyz] unary_server_interceptor=/svc/Get request=1".to_string(),
                "info [xyz] inside".to_string(),
            ]
        );
    }

    #[test]
    fn test_stream_async_handler_error() {
        let logger = Plain::default();
        let stream = VecStream {
            ctx: RequestContext::incoming(Metadata::from_pairs([("correlation_id", "s-1")])),
            inbound: vec![3],
            sent: Vec::new(),
        };
        let interceptor = interceptor(&logger);

        let err = tokio_test::block_on(interceptor.stream_async(
            stream,
            &StreamServerInfo::new("/svc/Watch"),
            |mut wrapped| async move {
                let n = wrapped.recv_message()?.unwrap_or_default();
                Err::<(), _>(format!("rejected {}", n))
            },
        ))
        .unwrap_err();

        assert_eq!(err.to_string(), "rejected 3");
        assert_eq!(
            logger.lines.lock().last().map(String::as_str),
            Some("error [s-1] stream_server_interceptor=rejected 3")
        );
    }
}
