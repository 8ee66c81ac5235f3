//! hostgate-mcp - consent-gated MCP server over HTTP
//!
//! This binary serves the built-in tools on a local HTTP endpoint and asks
//! the operator on the terminal before the first client gets in.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hostgate_mcp::{
    builtin, http, AccessGate, Dispatcher, FileAuditLog, HostHooks, ServerConfig, TerminalPrompt,
    ToolRegistry, TracingStatus, TransportHandler,
};

/// Log output format.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Consent-gated MCP server over HTTP.
#[derive(Parser, Debug)]
#[command(name = "hostgate-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Interface to listen on.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = hostgate_mcp::config::DEFAULT_PORT)]
    port: u16,

    /// Endpoint path.
    #[arg(long, default_value = hostgate_mcp::transport::DEFAULT_PATH)]
    path: String,

    /// Audit log file (default: hostgate-mcp-<pid>.log in the temp directory).
    #[arg(long)]
    audit_log: Option<PathBuf>,

    /// Seconds a status message stays visible.
    #[arg(long, default_value_t = 5)]
    status_seconds: u64,

    /// Do not add CORS headers.
    #[arg(long)]
    no_cors: bool,

    /// Start without the built-in example tools.
    #[arg(long)]
    no_builtin_tools: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Log output format.
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        ServerConfig {
            host: self.host,
            port: self.port,
            path: self.path,
            audit_log: self.audit_log.unwrap_or(defaults.audit_log),
            status_duration: Duration::from_secs(self.status_seconds),
            cors: !self.no_cors,
            builtin_tools: !self.no_builtin_tools,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Set up logging
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Log to stderr; stdout stays free and stdin is the consent prompt
    match args.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }

    tracing::info!(
        "Starting {} v{}",
        hostgate_mcp::dispatcher::SERVER_NAME,
        hostgate_mcp::dispatcher::SERVER_VERSION
    );

    let config = args.into_config();
    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        return ExitCode::FAILURE;
    }

    let mut registry = ToolRegistry::new();
    if config.builtin_tools {
        builtin::register_all(&mut registry);
    }
    tracing::info!("Serving {} tool(s)", registry.len());

    let audit = Arc::new(FileAuditLog::new(config.audit_log.clone()));
    tracing::info!("Audit log: {}", audit.path().display());

    let hooks = HostHooks::new(audit, Arc::new(TracingStatus))
        .with_status_duration(config.status_duration);
    let gate = AccessGate::new(Arc::new(TerminalPrompt), hooks.clone());
    let dispatcher = Dispatcher::new(Arc::new(registry));
    let transport = TransportHandler::new(dispatcher, gate, hooks).with_path(config.path.clone());

    tracing::info!(
        r#"Configure your MCP client with: {{"mcpServers": {{"host": {{"url": "{}"}}}}}}"#,
        config.endpoint_url()
    );

    match http::serve(&config, transport).await {
        Ok(()) => {
            tracing::info!("Server exited cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
