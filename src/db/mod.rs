//! Database access layer.
//!
//! This module provides database access functionality:
//! - The [`QueryGateway`] seam the tool handlers are written against
//! - The pooled PostgreSQL gateway
//! - Schema introspection queries
//! - Statement classification
//! - Value to JSON conversion

#[cfg(test)]
pub(crate) mod mock;
pub mod params;
pub mod pool;
pub mod schema;
pub mod statement;
pub mod types;

pub use pool::PgGateway;
pub use schema::SchemaInspector;
pub use statement::StatementKind;

use crate::error::DbResult;
use crate::models::{QueryParam, QueryResult};
use serde::Serialize;
use std::future::Future;

/// Facts about the connected server, captured once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    /// Configured database, or the server's `current_database()`.
    pub database: String,
    /// `host:port`
    pub address: String,
    pub server_version: Option<String>,
}

/// Execute-one-statement primitive the tool handlers depend on.
///
/// Implementations must hand back rows and row counts exactly as the
/// database produced them, and report database errors verbatim.
pub trait QueryGateway: Send + Sync + 'static {
    /// Run one statement with positional parameters on a single pooled
    /// connection.
    fn execute(
        &self,
        sql: &str,
        params: &[QueryParam],
    ) -> impl Future<Output = DbResult<QueryResult>> + Send;

    fn info(&self) -> &ConnectionInfo;
}
