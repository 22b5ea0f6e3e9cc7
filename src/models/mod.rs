//! Data models for the PostgreSQL MCP Server.
//!
//! This module re-exports all model types used throughout the application.

pub mod query;
pub mod schema;

// Re-export commonly used types
pub use query::{Field, QueryParam, QueryResponse, QueryResult, Row};
pub use schema::{
    CheckConstraint, ColumnDefinition, DEFAULT_SCHEMA, ForeignKey, IndexInfo, TableList,
    TableSchema, UniqueConstraint,
};
