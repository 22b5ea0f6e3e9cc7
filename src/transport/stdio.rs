//! Stdio transport for the MCP server.
//!
//! This transport uses standard input/output for communication,
//! which is the standard mode for CLI-based MCP integrations.

use crate::db::QueryGateway;
use crate::error::{DbError, DbResult};
use crate::mcp::DbService;
use crate::transport::{Transport, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use tracing::{info, warn};

/// Stdio transport implementation.
///
/// This transport reads JSON-RPC messages from stdin and writes
/// responses to stdout, following the MCP protocol specification.
pub struct StdioTransport<G> {
    service: DbService<G>,
}

impl<G: QueryGateway> StdioTransport<G> {
    pub fn new(service: DbService<G>) -> Self {
        Self { service }
    }
}

impl<G: QueryGateway> Transport for StdioTransport<G> {
    async fn run(&self) -> DbResult<()> {
        info!("Starting MCP server with stdio transport");

        let running_service = self
            .service
            .clone()
            .serve(stdio())
            .await
            .map_err(|e| DbError::internal(format!("Failed to start stdio transport: {}", e)))?;

        tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(_quit_reason) => info!("Stdio transport completed normally"),
                    Err(e) => {
                        warn!(error = %e, "Stdio transport error");
                        return Err(DbError::internal(format!("Stdio transport error: {}", e)));
                    }
                }
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                // stdin reads cannot be interrupted, so a second signal exits
                // without waiting for cleanup
                tokio::spawn(async {
                    wait_for_signal().await;
                    warn!("Received second signal, forcing immediate exit");
                    std::process::exit(1);
                });
            }
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mock::MockGateway;
    use crate::observability::Observability;
    use std::sync::Arc;

    #[test]
    fn test_stdio_transport_creation() {
        let service = DbService::new(
            Arc::new(MockGateway::empty()),
            Arc::new(Observability::disabled()),
        );
        let transport = StdioTransport::new(service);
        assert_eq!(transport.name(), "stdio");
    }
}
