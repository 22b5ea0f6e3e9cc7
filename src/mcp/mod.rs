//! MCP server integration module.
//!
//! This module provides the integration between the MCP protocol and
//! the database tool handlers using the rmcp framework.

pub mod envelope;
pub mod service;

pub use envelope::Envelope;
pub use service::DbService;
