//! MCP tool implementations.
//!
//! This module contains the handlers behind the four tools:
//! - `onboarding`: Static guide to the server and its tools
//! - `list_tables`: List base tables in a schema
//! - `get_table_schema`: Columns, keys, indexes and constraints of a table
//! - `execute_query`: Run arbitrary SQL

pub mod execute;
pub mod onboarding;
pub mod schema;

pub use execute::{ExecuteQueryInput, QueryToolHandler};
pub use onboarding::{OnboardingGuide, onboarding_guide};
pub use schema::{GetTableSchemaInput, ListTablesInput, SchemaToolHandler};
