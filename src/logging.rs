//! Logging sinks injected into writers
//!
//! Writers never reach for a global logger directly. They hold an
//! `Arc<dyn LogSink>` so tests can capture exactly what was emitted.
//! `TracingSink` is the default and forwards to the `tracing` facade.

use std::error::Error as StdError;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

/// Shared handle to a log sink
pub type SharedSink = Arc<dyn LogSink>;

/// Destination for writer log messages
pub trait LogSink: Send + Sync {
    /// Informational message
    fn info(&self, message: &str);

    /// Recoverable problem worth surfacing
    fn warn(&self, message: &str);

    /// Caught error, reported with its full cause chain
    fn exception(&self, message: &str, error: &dyn StdError);
}

/// Render an error together with every `source()` below it.
pub fn error_chain(error: &dyn StdError) -> String {
    let mut out = error.to_string();
    let mut cause = error.source();
    while let Some(err) = cause {
        let _ = write!(out, "\n  Caused by: {err}");
        cause = err.source();
    }
    out
}

/// Sink forwarding to `tracing` macros
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn exception(&self, message: &str, error: &dyn StdError) {
        tracing::error!(error = %error_chain(error), "{message}");
    }
}

/// Default sink used when none is injected
pub fn default_sink() -> SharedSink {
    Arc::new(TracingSink)
}

/// Severity of a captured record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One captured log record
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    /// Rendered error chain for `exception` records
    pub error: Option<String>,
}

/// In-memory sink that keeps every record
///
/// Cloning shares the underlying buffer.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured records
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Messages of the given level, in emission order
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|r| r.level == level)
            .map(|r| r.message)
            .collect()
    }

    /// Drop all captured records
    pub fn clear(&self) {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }

    fn push(&self, level: LogLevel, message: &str, error: Option<String>) {
        if let Ok(mut records) = self.records.lock() {
            records.push(LogRecord { level, message: message.to_string(), error });
        }
    }
}

impl LogSink for MemorySink {
    fn info(&self, message: &str) {
        self.push(LogLevel::Info, message, None);
    }

    fn warn(&self, message: &str) {
        self.push(LogLevel::Warn, message, None);
    }

    fn exception(&self, message: &str, error: &dyn StdError) {
        self.push(LogLevel::Error, message, Some(error_chain(error)));
    }
}

/// Install a `tracing` fmt subscriber honoring `RUST_LOG`
///
/// Falls back to `info` when `RUST_LOG` is unset. Safe to call more than
/// once; later calls leave the first subscriber in place.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WriterError;

    #[test]
    fn test_memory_sink_captures_levels() {
        let sink = MemorySink::new();
        sink.info("hello");
        sink.warn("careful");
        sink.exception("failed", &std::io::Error::other("disk"));

        let records = sink.records();
        assert_eq!(records.len(), 3);
        assert_eq!(sink.messages(LogLevel::Info), vec!["hello".to_string()]);
        assert_eq!(sink.messages(LogLevel::Warn), vec!["careful".to_string()]);
        assert_eq!(records[2].error.as_deref(), Some("disk"));
    }

    #[test]
    fn test_memory_sink_clones_share_buffer() {
        let sink = MemorySink::new();
        let shared: SharedSink = Arc::new(sink.clone());
        shared.info("via trait object");
        assert_eq!(sink.records().len(), 1);

        sink.clear();
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_error_chain_walks_sources() {
        let err = WriterError::io("saving /x/scalars.json", std::io::Error::other("read-only"));
        let chain = error_chain(&err);
        assert!(chain.starts_with("IO error: saving /x/scalars.json"));
        assert!(chain.contains("Caused by: read-only"));
    }

    #[test]
    fn test_tracing_sink_without_subscriber() {
        // No subscriber installed: calls must be harmless
        let sink = TracingSink;
        sink.info("info");
        sink.warn("warn");
        sink.exception("error", &std::io::Error::other("x"));
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging();
        init_logging();
    }
}
