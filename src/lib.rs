//! PostgreSQL MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools for AI assistants
//! to explore and query a single PostgreSQL database.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod observability;
pub mod registry;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use db::{ConnectionInfo, PgGateway, QueryGateway};
pub use error::{DbError, DbResult};
pub use mcp::DbService;
pub use observability::Observability;
pub use registry::Operation;
