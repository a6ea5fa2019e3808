//! Correlated request handling example
//!
//! Simulates a server whose unary and streaming handlers run behind the
//! correlation interceptor: every record a handler writes carries the
//! request's correlation id, whether the client sent one or not.
//!
//! Run with: cargo run --example correlated_server

use fanout_logger::correlation::{
    inject_correlation_id, CorrelationInterceptor, Metadata, RequestContext, ServerStream,
    StreamServerInfo, UnaryServerInfo,
};
use fanout_logger::prelude::*;
use std::sync::Arc;

/// In-memory stream standing in for a network transport
struct LineStream {
    ctx: RequestContext,
    inbound: Vec<String>,
}

impl ServerStream for LineStream {
    type Message = String;
    type Error = String;

    fn context(&self) -> &RequestContext {
        &self.ctx
    }

    fn send_message(&mut self, message: String) -> std::result::Result<(), String> {
        println!("  -> {}", message);
        Ok(())
    }

    fn recv_message(&mut self) -> std::result::Result<Option<String>, String> {
        Ok(self.inbound.pop())
    }
}

#[derive(Debug)]
struct GetUser {
    id: u64,
}

async fn get_user(ctx: RequestContext, req: GetUser) -> std::result::Result<String, String> {
    if let Some(logger) = ctx.logger() {
        logger.info(&format!("looking up user {}", req.id));
    }
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    match req.id {
        0 => Err("user 0 does not exist".to_string()),
        id => Ok(format!("user-{}", id)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Fan-out Logger - Correlated Server Example ===\n");

    let logger = Logger::builder()
        .level(LogLevel::Debug)
        .encoding(LogEncoding::Json)
        .stacktrace(false)
        .build()?;
    let interceptor = CorrelationInterceptor::new(Arc::new(logger.clone()));
    let info = UnaryServerInfo::new("/users.UserService/GetUser");

    println!("1. Request carrying a correlation id:");
    let md = inject_correlation_id(Some(&Metadata::from_pairs([("tenant", "acme")])), "client-abc");
    let reply = interceptor
        .unary_async(RequestContext::incoming(md), GetUser { id: 7 }, &info, get_user)
        .await;
    println!("  reply: {:?}", reply);

    println!("\n2. Request without one (a fresh id is generated):");
    let reply = interceptor
        .unary_async(RequestContext::incoming(Metadata::new()), GetUser { id: 8 }, &info, get_user)
        .await;
    println!("  reply: {:?}", reply);

    println!("\n3. Failing handler:");
    let reply = interceptor
        .unary_async(
            RequestContext::incoming(Metadata::from_pairs([("correlation_id", "client-def")])),
            GetUser { id: 0 },
            &info,
            get_user,
        )
        .await;
    println!("  reply: {:?}", reply.map_err(|e| e.to_string()));

    println!("\n4. Streaming call:");
    let stream = LineStream {
        ctx: RequestContext::incoming(Metadata::from_pairs([("correlation_id", "stream-1")])),
        inbound: vec!["world".to_string(), "hello".to_string()],
    };
    let outcome = interceptor.stream(
        stream,
        &StreamServerInfo::new("/echo.Echo/Chat"),
        |mut s| {
            while let Some(msg) = s.recv_message()? {
                if let Some(logger) = s.context().logger() {
                    logger.info(&format!("echoing {}", msg));
                }
                s.send_message(msg.to_uppercase())?;
            }
            Ok::<_, String>(())
        },
    );
    println!("  outcome: {:?}", outcome.map_err(|e| e.to_string()));

    println!("\n5. Request with no metadata at all:");
    let reply = interceptor
        .unary_async(RequestContext::new(), GetUser { id: 9 }, &info, get_user)
        .await;
    println!("  reply: {:?}", reply.map_err(|e| e.to_string()));

    logger.close()?;
    println!("\n=== Example completed successfully! ===");
    Ok(())
}
