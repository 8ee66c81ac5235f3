//! Host-side collaborators: the audit trail and the transient status line.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Receives one audit line per inbound message and per consent decision.
pub trait AuditSink: Send + Sync {
    /// Append a line to the audit trail.
    fn append(&self, line: &str);
}

/// Shows a short-lived, human-readable status message.
pub trait StatusSink: Send + Sync {
    /// Show `message` for roughly `duration`.
    fn show(&self, message: &str, duration: Duration);
}

/// Audit trail kept in a plain text file, one timestamped line per entry.
pub struct FileAuditLog {
    path: PathBuf,
    // Serialises appends so lines never interleave.
    lock: Mutex<()>,
}

impl FileAuditLog {
    /// Log to `path`, creating the file on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Per-process default location in the system temp directory.
    pub fn default_path() -> PathBuf {
        std::env::temp_dir().join(format!("hostgate-mcp-{}.log", std::process::id()))
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&self, line: &str) -> std::io::Result<()> {
        let timestamp = chrono::Local::now().format("%H:%M:%S%.3f");
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "[{timestamp}] {line}")
    }
}

impl AuditSink for FileAuditLog {
    fn append(&self, line: &str) {
        if let Err(e) = self.write_line(line) {
            tracing::warn!("Failed to write audit log {}: {}", self.path.display(), e);
        }
    }
}

/// Status messages routed to the `status` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStatus;

impl StatusSink for TracingStatus {
    fn show(&self, message: &str, duration: Duration) {
        tracing::info!(target: "status", duration_ms = duration.as_millis() as u64, "{}", message);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AuditSink for NullSink {
    fn append(&self, _line: &str) {}
}

impl StatusSink for NullSink {
    fn show(&self, _message: &str, _duration: Duration) {}
}

/// The audit and status sinks handed to the gate and the transport.
#[derive(Clone)]
pub struct HostHooks {
    /// Audit trail.
    pub audit: Arc<dyn AuditSink>,
    /// Status line.
    pub status: Arc<dyn StatusSink>,
    /// How long status messages stay visible.
    pub status_duration: Duration,
}

impl HostHooks {
    /// Default status message lifetime.
    pub const DEFAULT_STATUS_DURATION: Duration = Duration::from_secs(5);

    /// Build hooks from the two sinks.
    pub fn new(audit: Arc<dyn AuditSink>, status: Arc<dyn StatusSink>) -> Self {
        Self {
            audit,
            status,
            status_duration: Self::DEFAULT_STATUS_DURATION,
        }
    }

    /// Hooks that drop every line and message.
    pub fn silent() -> Self {
        Self::new(Arc::new(NullSink), Arc::new(NullSink))
    }

    /// Override the status message lifetime.
    pub fn with_status_duration(mut self, duration: Duration) -> Self {
        self.status_duration = duration;
        self
    }

    /// Append an audit line.
    pub fn record(&self, line: &str) {
        self.audit.append(line);
    }

    /// Show a status message for the configured duration.
    pub fn announce(&self, message: &str) {
        self.status.show(message, self.status_duration);
    }
}
