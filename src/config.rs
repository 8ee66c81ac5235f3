//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::host::{FileAuditLog, HostHooks};
use crate::transport::DEFAULT_PATH;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 2026;

/// Everything needed to bring the HTTP server up.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Endpoint path, e.g. `/mcp`.
    pub path: String,
    /// Audit log file.
    pub audit_log: PathBuf,
    /// How long status messages stay visible.
    pub status_duration: Duration,
    /// Answer CORS preflights and add permissive CORS headers.
    pub cors: bool,
    /// Register the built-in example tools.
    pub builtin_tools: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: DEFAULT_PORT,
            path: DEFAULT_PATH.into(),
            audit_log: FileAuditLog::default_path(),
            status_duration: HostHooks::DEFAULT_STATUS_DURATION,
            cors: true,
            builtin_tools: true,
        }
    }
}

impl ServerConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(Error::Config(format!(
                "endpoint path '{}' must start with '/'",
                self.path
            )));
        }
        if self.path.contains(|c: char| c == '?' || c == '#') {
            return Err(Error::Config(format!(
                "endpoint path '{}' must not contain a query or fragment",
                self.path
            )));
        }
        if self.port == 0 {
            return Err(Error::Config("port must be non-zero".into()));
        }
        if self.host.is_empty() {
            return Err(Error::Config("host must not be empty".into()));
        }
        Ok(())
    }

    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Client-facing endpoint URL.
    pub fn endpoint_url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.path)
    }
}
