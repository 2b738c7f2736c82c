//! Append-only conversion log
//!
//! Every entry is also forwarded to the `log` facade. Callers can inspect the
//! collected entries after a run; conversion code only writes.

use std::fmt;
use std::sync::Mutex;

use crate::map_data::ElementId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub element: Option<ElementId>,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.element {
            Some(id) => write!(f, "{}: {}", id, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Thread-safe sink for per-element warnings and errors
#[derive(Debug, Default)]
pub struct ConversionLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl ConversionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&self, element: Option<ElementId>, message: impl Into<String>) {
        self.push(LogLevel::Warning, element, message.into());
    }

    pub fn error(&self, element: Option<ElementId>, message: impl Into<String>) {
        self.push(LogLevel::Error, element, message.into());
    }

    fn push(&self, level: LogLevel, element: Option<ElementId>, message: String) {
        let entry = LogEntry { level, element, message };
        match level {
            LogLevel::Warning => log::warn!("[Conversion] {}", entry),
            LogLevel::Error => log::error!("[Conversion] {}", entry),
        }
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entry);
    }

    /// Snapshot of all entries in insertion order
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
