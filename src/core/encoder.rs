//! Line encoders for log entries
//!
//! Every encoded entry is exactly one newline-terminated record, which is
//! what the fan-out pipeline splits on:
//! - Json: `{"correlation_id":"abc","level":"info","msg":"started","ts":"2025-01-08T10:30:45.123Z"}`
//! - Console: `2025-01-08T10:30:45.123Z\tINFO\tstarted\t{"correlation_id":"abc"}`

use super::config::LogEncoding;
use super::log_entry::LogEntry;
use chrono::SecondsFormat;

/// Encodes entries in the configured format
#[derive(Debug, Clone)]
pub struct Encoder {
    encoding: LogEncoding,
    correlation_key: String,
}

impl Encoder {
    pub fn new(encoding: LogEncoding, correlation_key: impl Into<String>) -> Self {
        Self {
            encoding,
            correlation_key: correlation_key.into(),
        }
    }

    pub fn encoding(&self) -> LogEncoding {
        self.encoding
    }

    /// Encode one entry, including the trailing newline
    pub fn encode(&self, entry: &LogEntry) -> Vec<u8> {
        let mut line = match self.encoding {
            LogEncoding::Json => self.encode_json(entry),
            LogEncoding::Console => self.encode_console(entry),
        };
        line.push('\n');
        line.into_bytes()
    }

    fn timestamp(entry: &LogEntry) -> String {
        entry.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn context_object(&self, entry: &LogEntry) -> serde_json::Map<String, serde_json::Value> {
        let mut obj = serde_json::Map::new();

        if let Some(ref id) = entry.correlation_id {
            obj.insert(
                self.correlation_key.clone(),
                serde_json::Value::String(id.clone()),
            );
        }

        for field in &entry.fields {
            obj.insert(field.key().to_string(), field.value().to_json_value());
        }

        obj
    }

    fn encode_json(&self, entry: &LogEntry) -> String {
        let mut obj = self.context_object(entry);

        obj.insert(
            "level".to_string(),
            serde_json::Value::String(entry.level.to_str().to_string()),
        );
        obj.insert(
            "ts".to_string(),
            serde_json::Value::String(Self::timestamp(entry)),
        );
        obj.insert(
            "msg".to_string(),
            serde_json::Value::String(entry.message.clone()),
        );
        if let Some(ref stacktrace) = entry.stacktrace {
            obj.insert(
                "stacktrace".to_string(),
                serde_json::Value::String(stacktrace.clone()),
            );
        }

        serde_json::to_string(&serde_json::Value::Object(obj)).unwrap_or_default()
    }

    fn encode_console(&self, entry: &LogEntry) -> String {
        let mut line = format!(
            "{}\t{}\t{}",
            Self::timestamp(entry),
            entry.level.label(),
            sanitize(&entry.message)
        );

        let context = self.context_object(entry);
        if !context.is_empty() {
            line.push('\t');
            line.push_str(
                &serde_json::to_string(&serde_json::Value::Object(context)).unwrap_or_default(),
            );
        }

        if let Some(ref stacktrace) = entry.stacktrace {
            line.push('\t');
            line.push_str(&sanitize(stacktrace));
        }

        line
    }
}

/// Escape line breaks so one entry cannot forge extra records
fn sanitize(message: &str) -> String {
    message
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}
