//! Basic logger usage example
//!
//! Demonstrates leveled logging, correlation-bound handles and structured
//! fields, written to stderr through the fan-out pipeline.
//!
//! Run with: cargo run --example basic_usage

use fanout_logger::prelude::*;
use fanout_logger::{info, warn};

fn main() -> Result<()> {
    println!("=== Fan-out Logger - Basic Usage Example ===\n");

    // Development console logger on stderr
    let logger = Logger::builder()
        .level(LogLevel::Debug)
        .env(LogEnv::Development)
        .encoding(LogEncoding::Console)
        .stacktrace(false)
        .build()?;

    println!("1. Logging at different levels:");
    logger.debug("This is a debug message");
    logger.info("This is an info message");
    logger.warn("This is a warning message");
    logger.error("This is an error message");

    println!("\n2. Formatting macros:");
    let port = 8080;
    info!(logger, "Server listening on port {}", port);
    warn!(logger, "{} retries left", 2);

    println!("\n3. Correlation-bound handle:");
    let request = logger.with_correlation_id("req-42");
    request.info("Handling request");
    request.with_field("user_id", 7i64).info("User authenticated");

    println!("\n4. JSON encoding:");
    let json = Logger::builder()
        .encoding(LogEncoding::Json)
        .output("stdout")
        .build()?;
    json.with_correlation_id("req-43").info("Structured record");
    json.close()?;

    logger.close()?;
    println!("\n=== Example completed successfully! ===");
    Ok(())
}
