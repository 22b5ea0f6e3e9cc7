//! Schema introspection tools.
//!
//! This module implements the `list_tables` and `get_table_schema` MCP tools.

use crate::db::{QueryGateway, SchemaInspector};
use crate::error::{DbError, DbResult};
use crate::models::{DEFAULT_SCHEMA, TableList, TableSchema};
use crate::observability::Measured;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Input for the list_tables tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListTablesInput {
    /// Schema name. Default: public
    #[serde(default)]
    pub schema: Option<String>,
}

/// Input for the get_table_schema tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetTableSchemaInput {
    /// Table name
    pub table: String,
    /// Schema name. Default: public
    #[serde(default)]
    pub schema: Option<String>,
}

impl Measured for TableList {
    fn row_count(&self) -> Option<u64> {
        Some(self.tables.len() as u64)
    }
}

impl Measured for TableSchema {
    fn row_count(&self) -> Option<u64> {
        Some(self.columns.len() as u64)
    }
}

/// Blank or missing schema means `public`. Any other value is used as given.
fn schema_or_default(schema: Option<&str>) -> &str {
    schema
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_SCHEMA)
}

pub struct SchemaToolHandler<G> {
    gateway: Arc<G>,
}

impl<G: QueryGateway> SchemaToolHandler<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    pub async fn list_tables(&self, input: ListTablesInput) -> DbResult<TableList> {
        let schema = schema_or_default(input.schema.as_deref());
        let tables = SchemaInspector::new(self.gateway.as_ref())
            .list_tables(schema)
            .await?;

        info!(schema = %schema, count = tables.len(), "Listed tables");

        Ok(TableList {
            database: self.gateway.info().database.clone(),
            schema: schema.to_string(),
            tables,
        })
    }

    pub async fn get_table_schema(&self, input: GetTableSchemaInput) -> DbResult<TableSchema> {
        if input.table.trim().is_empty() {
            return Err(DbError::invalid_input("table is required"));
        }
        let schema = schema_or_default(input.schema.as_deref());

        let description = SchemaInspector::new(self.gateway.as_ref())
            .describe_table(&self.gateway.info().database, schema, &input.table)
            .await?;

        info!(
            table = %description.qualified_name(),
            columns = description.columns.len(),
            "Described table"
        );

        Ok(description)
    }
}
