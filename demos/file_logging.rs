//! File logging example
//!
//! Demonstrates one logger fanning every record out to the console and two
//! files at once, plus running the raw line pipeline over a reader.
//!
//! Run with: cargo run --example file_logging

use fanout_logger::pipeline::FanOut;
use fanout_logger::prelude::*;

fn main() -> Result<()> {
    println!("=== Fan-out Logger - File Logging Example ===\n");

    println!("1. Logging to stderr and two files:");
    let logger = Logger::builder()
        .encoding(LogEncoding::Json)
        .outputs(["stderr", "application.log", "audit.log"])
        .build()?;

    logger.info("Application started");
    logger.info("Configuration loaded successfully");
    logger.warn("Using default settings for some options");
    for i in 1..=5 {
        logger
            .with_correlation_id(format!("job-{}", i))
            .info(format!("Processing item {}/5", i));
    }
    logger.error("Failed to load optional plugin");

    // Drains the pipeline and flushes every file
    logger.close()?;

    println!("\n2. Fanning a reader out to files:");
    let input = "first line\r\nsecond line\nthird line without newline";
    let sinks: Vec<Box<dyn Sink>> = vec![
        Box::new(FileSink::create("copy-a.log")?),
        Box::new(FileSink::create("copy-b.log")?),
    ];
    FanOut::new(Bus::new()).run(input.as_bytes(), sinks)?;

    println!("\n=== Example completed successfully! ===");
    println!("Check 'application.log', 'audit.log', 'copy-a.log' and 'copy-b.log'");

    Ok(())
}
