//! Activity feed streamed to browsers over Server-Sent Events.
//!
//! Every entry is also emitted through `tracing` at the matching level.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::flow::{FlowEvent, FlowState};

/// Entries kept for slow subscribers before they start lagging.
const ACTIVITY_CAPACITY: usize = 100;

/// Severity shown by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One line of the activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth for grouped lines.
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            indent: 0,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }
}

impl From<&FlowEvent> for LogEntry {
    fn from(event: &FlowEvent) -> Self {
        match event {
            FlowEvent::AuthenticationRequested => LogEntry::warning("Please connect wallet first!"),
            FlowEvent::FileUploaded { index, total, result } => LogEntry::success(format!(
                "[{}/{}] {} pinned: {}",
                index + 1,
                total,
                result.file_name,
                result.gateway_link
            ))
            .with_indent(1),
            FlowEvent::StateChanged { state } => match state {
                FlowState::Succeeded { .. } => LogEntry::success(state.to_string()),
                FlowState::Failed { .. } => LogEntry::error(state.to_string()),
                _ => LogEntry::info(state.to_string()),
            },
        }
    }
}

/// Fan-out of activity entries to every connected SSE client.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    sender: broadcast::Sender<LogEntry>,
}

impl ActivityLog {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(ACTIVITY_CAPACITY);
        Self { sender }
    }

    /// Record an entry. Dropped silently when nobody listens.
    pub fn log(&self, entry: LogEntry) {
        match entry.level {
            LogLevel::Info | LogLevel::Success => tracing::info!(indent = entry.indent, "{}", entry.message),
            LogLevel::Warning => tracing::warn!(indent = entry.indent, "{}", entry.message),
            LogLevel::Error => tracing::error!(indent = entry.indent, "{}", entry.message),
        }
        let _ = self.sender.send(entry);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogEntry::info(message));
    }

    pub fn success(&self, message: impl Into<String>) {
        self.log(LogEntry::success(message));
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogEntry::warning(message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogEntry::error(message));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UploadResult;

    #[tokio::test]
    async fn test_subscribers_receive_entries() {
        let log = ActivityLog::new();
        let mut rx = log.subscribe();
        log.success("Upload URL issued");
        let entry = rx.recv().await.unwrap();
        assert_eq!(entry.level, LogLevel::Success);
        assert_eq!(entry.message, "Upload URL issued");
    }

    #[test]
    fn test_logging_without_subscribers_is_fine() {
        ActivityLog::new().error("nobody listening");
    }

    #[test]
    fn test_flow_events_become_entries() {
        let uploaded = FlowEvent::FileUploaded {
            index: 0,
            total: 2,
            result: UploadResult {
                file_name: "odyssey.mp4".into(),
                cid: "bafy".into(),
                gateway_link: "https://gw/ipfs/bafy".into(),
            },
        };
        let entry = LogEntry::from(&uploaded);
        assert_eq!(entry.level, LogLevel::Success);
        assert_eq!(entry.message, "[1/2] odyssey.mp4 pinned: https://gw/ipfs/bafy");
        assert_eq!(entry.indent, 1);

        let failed = FlowEvent::StateChanged {
            state: FlowState::Failed { message: "boom".into() },
        };
        assert_eq!(LogEntry::from(&failed).level, LogLevel::Error);

        let json = serde_json::to_value(LogEntry::from(&FlowEvent::AuthenticationRequested)).unwrap();
        assert_eq!(json["level"], "warning");
    }
}
