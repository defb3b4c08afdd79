//! The visible output log
//!
//! Lines are only ever added, newest first. Lines produced by a gateway call
//! carry that call's sequence number, so when two calls race the rendered
//! order still shows which response belongs to which request.

use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Ok,
    Error,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub seq: Option<u64>,
    pub at: DateTime<Local>,
    pub level: Level,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.at.format("%H:%M:%S"))?;
        if let Some(seq) = self.seq {
            write!(f, " #{}", seq)?;
        }
        match self.level {
            Level::Ok => write!(f, " OK")?,
            Level::Error => write!(f, " ERROR")?,
        }
        write!(f, "\n{}", self.message)
    }
}

pub struct OutputLog {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl OutputLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn info(&self, seq: Option<u64>, message: impl Into<String>) {
        self.push(seq, Level::Ok, message.into());
    }

    pub fn error(&self, seq: Option<u64>, message: impl Into<String>) {
        self.push(seq, Level::Error, message.into());
    }

    fn push(&self, seq: Option<u64>, level: Level, message: String) {
        match level {
            Level::Ok => tracing::debug!(seq, "{}", message),
            Level::Error => tracing::warn!(seq, "{}", message),
        }
        let entry = LogEntry {
            seq,
            at: Local::now(),
            level,
            message,
        };
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push_front(entry);
        entries.truncate(self.capacity);
    }

    /// Entries, most recent first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries oldest first, for streaming to a terminal
    pub fn drain_chronological(&self) -> Vec<LogEntry> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.drain(..).rev().collect()
    }

    pub fn render(&self) -> String {
        let entries = self.entries();
        if entries.is_empty() {
            return "Waiting for commands...".to_string();
        }
        entries
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl Default for OutputLog {
    fn default() -> Self {
        Self::new(200)
    }
}
