//! Log entry structure

use super::log_context::Field;
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: String) -> Self {
        Self {
            level,
            message,
            timestamp: Utc::now(),
            correlation_id: None,
            fields: Vec::new(),
            stacktrace: None,
        }
    }

    pub fn with_correlation_id(mut self, id: Option<&str>) -> Self {
        self.correlation_id = id.filter(|id| !id.is_empty()).map(str::to_string);
        self
    }

    /// Attach fields; a field named like the correlation key never shadows the bound id
    pub fn with_fields(mut self, fields: &[Field], correlation_key: &str) -> Self {
        self.fields = fields
            .iter()
            .filter(|field| field.key() != correlation_key)
            .cloned()
            .collect();
        self
    }

    pub fn with_stacktrace(mut self, stacktrace: String) -> Self {
        self.stacktrace = Some(stacktrace);
        self
    }
}
