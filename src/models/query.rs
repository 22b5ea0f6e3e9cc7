//! Query-related data models.
//!
//! This module defines the gateway's parameter and result types and the two
//! response shapes returned by `execute_query`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// A positional parameter value for prepared statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryParam {
    /// NULL value
    Null,
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    Float(f64),
    String(String),
    /// Bound as `jsonb`
    Json(JsonValue),
}

impl From<&str> for QueryParam {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Result column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Field {
    pub name: String,
    /// PostgreSQL type OID (e.g. 23 for int4, 25 for text).
    #[serde(rename = "dataTypeID")]
    pub data_type_id: u32,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type_id: u32) -> Self {
        Self {
            name: name.into(),
            data_type_id,
        }
    }
}

/// One row as a column-name keyed mapping.
pub type Row = Map<String, JsonValue>;

/// Everything the driver returned for one `execute` call.
///
/// Rows and the row count are passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub row_count: u64,
    pub rows: Vec<Row>,
    pub fields: Vec<Field>,
    /// Leading keyword of the executed statement, uppercased.
    pub command: String,
}

impl QueryResult {
    /// Take the string value of `column` from every row, skipping NULLs.
    pub fn column_strings(&self, column: &str) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.get(column))
            .filter_map(|value| value.as_str().map(String::from))
            .collect()
    }
}

/// Response shape of `execute_query`.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum QueryResponse {
    /// Returned for SELECT, WITH and EXPLAIN.
    #[serde(rename_all = "camelCase")]
    Rows {
        row_count: u64,
        rows: Vec<Row>,
        fields: Vec<Field>,
    },
    /// Returned for every other statement.
    #[serde(rename_all = "camelCase")]
    Command { row_count: u64, command: String },
}

impl QueryResponse {
    pub fn row_count(&self) -> u64 {
        match self {
            Self::Rows { row_count, .. } | Self::Command { row_count, .. } => *row_count,
        }
    }
}
