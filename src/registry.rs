//! Static catalog of the operations this server exposes.
//!
//! The catalog is the single source for tool names, descriptions and argument
//! shapes. The `onboarding` guide is built from it, and the MCP tool
//! descriptions are checked against it in tests.

use crate::error::{DbError, DbResult};
use serde::Serialize;

pub const ONBOARDING_DESCRIPTION: &str = "Get an overview of this PostgreSQL server's tools, the recommended workflow and example calls. Call this first.";
pub const LIST_TABLES_DESCRIPTION: &str =
    "List all base tables in a schema (default: public), ordered by name.";
pub const GET_TABLE_SCHEMA_DESCRIPTION: &str = "Get a table's columns, primary keys, indexes, foreign keys, unique constraints and check constraints.";
pub const EXECUTE_QUERY_DESCRIPTION: &str = "Execute any SQL statement against the database. SELECT, WITH and EXPLAIN return rows and field metadata; other statements return the affected row count and command.";

/// Argument type as advertised to the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentType {
    String,
}

/// One declared argument of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgumentSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: ArgumentType,
    pub required: bool,
    pub description: &'static str,
}

/// Name, description and arguments of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub arguments: &'static [ArgumentSpec],
}

const SCHEMA_ARG: ArgumentSpec = ArgumentSpec {
    name: "schema",
    kind: ArgumentType::String,
    required: false,
    description: "Schema name (default: public)",
};

const LIST_TABLES_ARGS: &[ArgumentSpec] = &[SCHEMA_ARG];

const GET_TABLE_SCHEMA_ARGS: &[ArgumentSpec] = &[
    ArgumentSpec {
        name: "table",
        kind: ArgumentType::String,
        required: true,
        description: "Table name",
    },
    SCHEMA_ARG,
];

const EXECUTE_QUERY_ARGS: &[ArgumentSpec] = &[ArgumentSpec {
    name: "query",
    kind: ArgumentType::String,
    required: true,
    description: "SQL statement to execute",
}];

/// The operations exposed over MCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Onboarding,
    ListTables,
    GetTableSchema,
    ExecuteQuery,
}

impl Operation {
    /// All operations in the order they are advertised.
    pub const ALL: [Operation; 4] = [
        Operation::Onboarding,
        Operation::ListTables,
        Operation::GetTableSchema,
        Operation::ExecuteQuery,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Onboarding => "onboarding",
            Self::ListTables => "list_tables",
            Self::GetTableSchema => "get_table_schema",
            Self::ExecuteQuery => "execute_query",
        }
    }

    /// Look up an operation by its wire name.
    pub fn from_name(name: &str) -> DbResult<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == name)
            .ok_or_else(|| DbError::unknown_operation(name))
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Onboarding => ONBOARDING_DESCRIPTION,
            Self::ListTables => LIST_TABLES_DESCRIPTION,
            Self::GetTableSchema => GET_TABLE_SCHEMA_DESCRIPTION,
            Self::ExecuteQuery => EXECUTE_QUERY_DESCRIPTION,
        }
    }

    pub fn arguments(self) -> &'static [ArgumentSpec] {
        match self {
            Self::Onboarding => &[],
            Self::ListTables => LIST_TABLES_ARGS,
            Self::GetTableSchema => GET_TABLE_SCHEMA_ARGS,
            Self::ExecuteQuery => EXECUTE_QUERY_ARGS,
        }
    }

    pub fn descriptor(self) -> OperationDescriptor {
        OperationDescriptor {
            name: self.as_str(),
            description: self.description(),
            arguments: self.arguments(),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_operations_in_order() {
        let names: Vec<_> = Operation::ALL.iter().map(|op| op.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "onboarding",
                "list_tables",
                "get_table_schema",
                "execute_query"
            ]
        );
    }

    #[test]
    fn test_from_name_round_trip() {
        for op in Operation::ALL {
            assert_eq!(Operation::from_name(op.as_str()).unwrap(), op);
        }
    }

    #[test]
    fn test_from_name_unknown() {
        let err = Operation::from_name("drop_database").unwrap_err();
        assert!(matches!(err, DbError::UnknownOperation { .. }));
        assert_eq!(err.to_string(), "Unknown tool: drop_database");
    }

    #[test]
    fn test_required_arguments() {
        let required = |op: Operation| -> Vec<&str> {
            op.arguments()
                .iter()
                .filter(|a| a.required)
                .map(|a| a.name)
                .collect()
        };
        assert!(required(Operation::Onboarding).is_empty());
        assert!(required(Operation::ListTables).is_empty());
        assert_eq!(required(Operation::GetTableSchema), vec!["table"]);
        assert_eq!(required(Operation::ExecuteQuery), vec!["query"]);
    }

    #[test]
    fn test_descriptor_serializes_type_field() {
        let json = serde_json::to_value(Operation::ExecuteQuery.descriptor()).unwrap();
        assert_eq!(json["name"], "execute_query");
        assert_eq!(json["arguments"][0]["type"], "string");
        assert_eq!(json["arguments"][0]["required"], true);
    }
}
