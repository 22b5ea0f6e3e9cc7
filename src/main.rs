//! PostgreSQL MCP Server - Main entry point.
//!
//! This server provides MCP (Model Context Protocol) tools for AI assistants
//! to explore and query a PostgreSQL database.

use clap::Parser;
use pg_mcp_server::config::{Cli, Config, TransportMode};
use pg_mcp_server::observability::{LogTarget, Observability, logging};
use pg_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use pg_mcp_server::{DbService, PgGateway};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let vars: HashMap<String, String> = std::env::vars().collect();
    let config = match Config::resolve(cli.config_path.as_deref(), &vars) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let log_guard = logging::init(&cli.log_level, cli.json_logs, &config.logging);

    info!(
        transport = %cli.transport,
        "Starting PostgreSQL MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );
    for warning in config.warnings.iter().chain(&log_guard.warnings) {
        warn!("{warning}");
    }
    if let LogTarget::File(path) = &log_guard.target {
        info!(path = %path.display(), "Logging to file");
    }
    info!(config = ?config.summary(), "Configuration resolved");

    let observability = Arc::new(Observability::from_settings(&config.telemetry));

    let gateway = match PgGateway::connect(&config.database).await {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            error!(
                error = %e,
                suggestion = e.suggestion().unwrap_or_default(),
                "Failed to connect to PostgreSQL"
            );
            observability.shutdown();
            drop(log_guard);
            std::process::exit(1);
        }
    };

    let service = DbService::new(gateway.clone(), observability.clone());

    let result = match cli.transport {
        TransportMode::Stdio => StdioTransport::new(service).run().await,
        TransportMode::Http => {
            info!(
                addr = %cli.http_bind_addr(),
                endpoint = %cli.mcp_endpoint,
                "Using HTTP transport"
            );
            HttpTransport::new(service, &cli.http_host, cli.http_port, &cli.mcp_endpoint)
                .run()
                .await
        }
    };

    if let Err(e) = &result {
        error!(error = %e, "Server error");
    }

    gateway.close().await;
    observability.shutdown();
    info!("Server shutdown complete");
    log_guard.flush();

    // stdin may still be blocked in a read that cannot be cancelled
    std::process::exit(if result.is_ok() { 0 } else { 1 });
}
