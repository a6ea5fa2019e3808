//! Command-line and environment flags for logger configuration
//!
//! Flatten [`LogArgs`] into an application's own clap parser:
//!
//! ```
//! use clap::Parser;
//! use fanout_logger::cli::LogArgs;
//!
//! #[derive(Parser)]
//! struct Cli {
//!     #[command(flatten)]
//!     log: LogArgs,
//! }
//!
//! let cli = Cli::parse_from(["app", "--log-level", "debug", "--log-encoding", "json"]);
//! let config = cli.log.to_config();
//! assert_eq!(config.level, "debug");
//! ```

use crate::core::{LogEncoding, LogEnv, LogLevel, Logger, LoggerConfig, Result};
use clap::Args;

#[derive(Debug, Clone, Args)]
pub struct LogArgs {
    /// Environment: prod or dev (dev enables developer defaults)
    #[arg(
        long = "log-env",
        env = "LOG_ENV",
        default_value_t = LogEnv::Development.to_str().to_string()
    )]
    pub env: String,

    /// Minimum level: debug, info, warn, error, dpanic, panic, fatal
    #[arg(
        long = "log-level",
        env = "LOG_LEVEL",
        default_value_t = LogLevel::Info.to_str().to_string()
    )]
    pub level: String,

    /// Line encoding: json or console
    #[arg(
        long = "log-encoding",
        env = "LOG_ENCODING",
        default_value_t = LogEncoding::Console.to_str().to_string()
    )]
    pub encoding: String,

    /// Attach stack traces to severe entries
    #[arg(
        long = "log-stacktrace",
        visible_alias = "lst",
        env = "LOG_STACKTRACE",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub stacktrace: bool,

    /// Output destination (stderr, stdout or a file path); repeatable
    #[arg(long = "log-output", env = "LOG_OUTPUT", value_delimiter = ',')]
    pub outputs: Vec<String>,
}

impl LogArgs {
    pub fn to_config(&self) -> LoggerConfig {
        let mut config = LoggerConfig {
            level: self.level.clone(),
            env: self.env.clone(),
            encoding: self.encoding.clone(),
            stacktrace: self.stacktrace,
            ..LoggerConfig::default()
        };
        if !self.outputs.is_empty() {
            config.outputs = self.outputs.clone();
        }
        config
    }

    /// Build a logger; unknown level or encoding names are errors
    pub fn build_logger(&self) -> Result<Logger> {
        Logger::from_config(&self.to_config())
    }
}
