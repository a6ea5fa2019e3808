//! Environment, encoding and serializable logger configuration

use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Deployment environment; development turns on developer-friendly defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogEnv {
    #[default]
    Development,
    Production,
}

impl LogEnv {
    pub fn to_str(&self) -> &'static str {
        match self {
            LogEnv::Development => "dev",
            LogEnv::Production => "prod",
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, LogEnv::Development)
    }
}

impl fmt::Display for LogEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl FromStr for LogEnv {
    type Err = LoggerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(LogEnv::Development),
            "prod" => Ok(LogEnv::Production),
            _ => Err(LoggerError::config(
                "log env",
                format!("'{}' is not valid; allowed values are prod, dev", s),
            )),
        }
    }
}

/// Line encoding written into the fan-out pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogEncoding {
    Json,
    #[default]
    Console,
}

impl LogEncoding {
    pub fn to_str(&self) -> &'static str {
        match self {
            LogEncoding::Json => "json",
            LogEncoding::Console => "console",
        }
    }
}

impl fmt::Display for LogEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl FromStr for LogEncoding {
    type Err = LoggerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogEncoding::Json),
            "console" => Ok(LogEncoding::Console),
            "" => Err(LoggerError::config("encoding", "no encoder name specified")),
            _ => Err(LoggerError::config(
                "encoding",
                format!("no encoder registered for name \"{}\"", s),
            )),
        }
    }
}

/// Output destination name for standard error
pub const STDERR: &str = "stderr";
/// Output destination name for standard output
pub const STDOUT: &str = "stdout";

/// Plain-data logger configuration, e.g. loaded from a config file
///
/// Names are validated when the logger is built, so an unknown level or
/// encoding fails construction instead of being ignored.
///
/// # Example
///
/// ```
/// use fanout_logger::{Logger, LoggerConfig};
///
/// let config: LoggerConfig = serde_json::from_str(
///     r#"{"level":"debug","env":"prod","encoding":"json","outputs":["stderr"]}"#,
/// ).unwrap();
/// let logger = Logger::from_config(&config).unwrap();
/// logger.info("configured");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub level: String,
    pub env: String,
    pub encoding: String,
    pub stacktrace: bool,
    pub outputs: Vec<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info.to_str().to_string(),
            env: LogEnv::Development.to_str().to_string(),
            encoding: LogEncoding::Console.to_str().to_string(),
            stacktrace: true,
            outputs: vec![STDERR.to_string()],
        }
    }
}

impl LoggerConfig {
    pub fn level(&self) -> Result<LogLevel> {
        self.level.parse()
    }

    pub fn env(&self) -> Result<LogEnv> {
        self.env.parse()
    }

    pub fn encoding(&self) -> Result<LogEncoding> {
        self.encoding.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parse() {
        assert_eq!("PROD".parse::<LogEnv>().unwrap(), LogEnv::Production);
        assert_eq!("dev".parse::<LogEnv>().unwrap(), LogEnv::Development);
        assert!("staging".parse::<LogEnv>().is_err());
    }

    #[test]
    fn test_encoding_parse() {
        assert_eq!("json".parse::<LogEncoding>().unwrap(), LogEncoding::Json);
        assert_eq!("Console".parse::<LogEncoding>().unwrap(), LogEncoding::Console);

        let err = "xml".parse::<LogEncoding>().unwrap_err();
        assert!(err.to_string().contains("no encoder registered for name \"xml\""));

        let err = "".parse::<LogEncoding>().unwrap_err();
        assert!(err.to_string().contains("no encoder name specified"));
    }

    #[test]
    fn test_config_defaults_and_partial_json() {
        let config: LoggerConfig = serde_json::from_str(r#"{"level":"warn"}"#).unwrap();
        assert_eq!(config.level().unwrap(), LogLevel::Warn);
        assert_eq!(config.encoding().unwrap(), LogEncoding::Console);
        assert_eq!(config.outputs, vec!["stderr".to_string()]);
    }

    #[test]
    fn test_config_rejects_unknown_level() {
        let config = LoggerConfig {
            level: "loud".into(),
            ..LoggerConfig::default()
        };
        assert!(config.level().is_err());
    }

    #[test]
    fn test_config_rejects_unknown_env() {
        let config = LoggerConfig {
            env: "staging".into(),
            ..LoggerConfig::default()
        };
        let err = config.env().unwrap_err();
        assert!(err.to_string().contains("allowed values are prod, dev"));
    }
}
