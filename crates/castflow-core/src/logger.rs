//! Logging sink handed to workflow nodes.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Leveled progress narration for the hosting workflow.
///
/// Messages never drive control flow.
pub trait NodeLogger: Send + Sync {
    fn info(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards node narration to `tracing`, tagged with the node name.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    node: String,
}

impl TracingLogger {
    pub fn new(node: impl Into<String>) -> Self {
        Self { node: node.into() }
    }
}

impl NodeLogger for TracingLogger {
    fn info(&self, message: &str) {
        info!(node = %self.node, "{}", message);
    }

    fn warning(&self, message: &str) {
        warn!(node = %self.node, "{}", message);
    }

    fn error(&self, message: &str) {
        error!(node = %self.node, "{}", message);
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

/// Keeps every entry in memory; useful for hosts that return logs with the
/// node result, and for tests.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.level == level)
            .map(|entry| entry.message)
            .collect()
    }

    fn push(&self, level: LogLevel, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                level,
                message: message.to_string(),
            });
        }
    }
}

impl NodeLogger for RecordingLogger {
    fn info(&self, message: &str) {
        self.push(LogLevel::Info, message);
    }

    fn warning(&self, message: &str) {
        self.push(LogLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.push(LogLevel::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_logger_keeps_order_and_levels() {
        let logger = RecordingLogger::new();
        logger.info("navigated");
        logger.warning("overlay missing");
        logger.error("publish failed");

        let entries = logger.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].level, LogLevel::Warning);
        assert_eq!(logger.messages(LogLevel::Error), vec!["publish failed"]);
    }
}
