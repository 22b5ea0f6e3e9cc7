//! The `onboarding` tool.
//!
//! Returns a fixed guide built from the operation registry plus the facts
//! about the connected server captured at startup. It never touches the
//! database, so repeated calls produce identical output.

use crate::db::ConnectionInfo;
use crate::observability::Measured;
use crate::registry::{Operation, OperationDescriptor};
use serde::Serialize;
use serde_json::{Value as JsonValue, json};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSummary {
    pub database: String,
    /// `host:port`
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_version: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolExample {
    pub tool: &'static str,
    pub arguments: JsonValue,
    pub purpose: &'static str,
}

/// Output of the `onboarding` tool.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingGuide {
    pub server: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub connection: ConnectionSummary,
    pub tools: Vec<OperationDescriptor>,
    pub recommended_workflow: Vec<&'static str>,
    pub examples: Vec<ToolExample>,
    pub notes: Vec<&'static str>,
}

impl Measured for OnboardingGuide {}

const WORKFLOW: [&str; 4] = [
    "Call `list_tables` to see the tables in a schema (default: public).",
    "Call `get_table_schema` for each table you need to understand: columns, keys, indexes and constraints.",
    "Write SQL against the discovered structure and run it with `execute_query`.",
    "Read `fields` in query results for column types (PostgreSQL type OIDs).",
];

const NOTES: [&str; 5] = [
    "execute_query runs any SQL as-is, including writes and DDL. There is no confirmation step.",
    "SELECT, WITH and EXPLAIN return rows; other statements return rowCount and command. INSERT ... RETURNING is reported as a command.",
    "bigint, numeric and COUNT(*) values are returned as strings to keep full precision.",
    "Each statement runs on its own connection: there is no transaction spanning calls.",
    "Database errors are returned verbatim as tool errors.",
];

/// Build the guide. Pure: the output depends only on `info`.
pub fn onboarding_guide(info: &ConnectionInfo) -> OnboardingGuide {
    OnboardingGuide {
        server: "pg-mcp-server",
        version: env!("CARGO_PKG_VERSION"),
        description: "MCP server exposing a PostgreSQL database: introspect schemas and run SQL.",
        connection: ConnectionSummary {
            database: info.database.clone(),
            host: info.address.clone(),
            server_version: info.server_version.clone(),
        },
        tools: Operation::ALL.iter().map(|op| op.descriptor()).collect(),
        recommended_workflow: WORKFLOW.to_vec(),
        examples: vec![
            ToolExample {
                tool: "list_tables",
                arguments: json!({ "schema": "public" }),
                purpose: "List base tables in the public schema",
            },
            ToolExample {
                tool: "get_table_schema",
                arguments: json!({ "table": "users" }),
                purpose: "Describe the users table",
            },
            ToolExample {
                tool: "execute_query",
                arguments: json!({ "query": "SELECT COUNT(*) FROM users" }),
                purpose: "Count rows",
            },
            ToolExample {
                tool: "execute_query",
                arguments: json!({ "query": "UPDATE users SET name = 'Ada' WHERE id = 1" }),
                purpose: "Modify data; returns rowCount and command",
            },
        ],
        notes: NOTES.to_vec(),
    }
}
