//! MCP service implementation using rmcp.
//!
//! This module defines the DbService struct with the four PostgreSQL tools
//! exposed via the MCP protocol using the rmcp framework's macros. Every tool
//! answers with an [`Envelope`]: database errors, malformed arguments and
//! unknown tool names become tool results flagged as errors, never protocol
//! failures.

use crate::db::{QueryGateway, StatementKind};
use crate::error::{DbError, DbResult};
use crate::mcp::envelope::Envelope;
use crate::observability::Observability;
use crate::registry::Operation;
use crate::tools::execute::{ExecuteQueryInput, QueryToolHandler};
use crate::tools::onboarding::onboarding_guide;
use crate::tools::schema::{GetTableSchemaInput, ListTablesInput, SchemaToolHandler};
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{
        CallToolRequestParam, CallToolResult, Implementation, JsonObject, ListToolsResult,
        PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
    tool, tool_router,
};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::warn;

pub struct DbService<G> {
    /// Shared gateway for all database operations
    gateway: Arc<G>,
    observability: Arc<Observability>,
    /// Tool catalog advertised by `tools/list` (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl<G> Clone for DbService<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            observability: self.observability.clone(),
            tool_router: self.tool_router.clone(),
        }
    }
}

/// Deserialize tool arguments, treating absent arguments as an empty object.
fn parse_arguments<T: DeserializeOwned>(arguments: Option<JsonObject>) -> DbResult<T> {
    let value = JsonValue::Object(arguments.unwrap_or_default());
    serde_json::from_value(value).map_err(|e| DbError::invalid_input(e.to_string()))
}

impl<G: QueryGateway> DbService<G> {
    pub fn new(gateway: Arc<G>, observability: Arc<Observability>) -> Self {
        Self {
            gateway,
            observability,
            tool_router: Self::tool_router(),
        }
    }

    /// Route a `tools/call` request by name.
    ///
    /// Always yields a tool result: an unknown name or arguments that do not
    /// fit the tool's input schema come back flagged as errors.
    pub async fn dispatch(&self, name: &str, arguments: Option<JsonObject>) -> CallToolResult {
        let operation = match Operation::from_name(name) {
            Ok(op) => op,
            Err(e) => {
                warn!(tool = name, "Unknown tool requested");
                return Envelope::from(e).into();
            }
        };

        match operation {
            Operation::Onboarding => self.run_onboarding().await,
            Operation::ListTables => self.run_list_tables(parse_arguments(arguments)).await,
            Operation::GetTableSchema => {
                self.run_get_table_schema(parse_arguments(arguments)).await
            }
            Operation::ExecuteQuery => self.run_execute_query(parse_arguments(arguments)).await,
        }
    }

    async fn run_onboarding(&self) -> CallToolResult {
        let info = self.gateway.info();
        let result = self
            .observability
            .instrument(Operation::Onboarding, None, async {
                Ok(onboarding_guide(info))
            })
            .await;
        Envelope::from_result(result).into()
    }

    async fn run_list_tables(&self, input: DbResult<ListTablesInput>) -> CallToolResult {
        let handler = SchemaToolHandler::new(self.gateway.clone());
        let result = self
            .observability
            .instrument(Operation::ListTables, None, async {
                handler.list_tables(input?).await
            })
            .await;
        Envelope::from_result(result).into()
    }

    async fn run_get_table_schema(&self, input: DbResult<GetTableSchemaInput>) -> CallToolResult {
        let handler = SchemaToolHandler::new(self.gateway.clone());
        let result = self
            .observability
            .instrument(Operation::GetTableSchema, None, async {
                handler.get_table_schema(input?).await
            })
            .await;
        Envelope::from_result(result).into()
    }

    async fn run_execute_query(&self, input: DbResult<ExecuteQueryInput>) -> CallToolResult {
        let kind = input
            .as_ref()
            .ok()
            .map(|i| StatementKind::detect(&i.query));
        let handler = QueryToolHandler::new(self.gateway.clone());
        let result = self
            .observability
            .instrument(Operation::ExecuteQuery, kind, async {
                handler.execute_query(input?).await
            })
            .await;
        Envelope::from_result(result).into()
    }
}

#[tool_router]
impl<G: QueryGateway> DbService<G> {
    #[tool(
        description = "Get an overview of this PostgreSQL server's tools, the recommended workflow and example calls. Call this first."
    )]
    async fn onboarding(&self) -> Result<CallToolResult, McpError> {
        Ok(self.run_onboarding().await)
    }

    #[tool(description = "List all base tables in a schema (default: public), ordered by name.")]
    async fn list_tables(
        &self,
        Parameters(input): Parameters<ListTablesInput>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.run_list_tables(Ok(input)).await)
    }

    #[tool(
        description = "Get a table's columns, primary keys, indexes, foreign keys, unique constraints and check constraints."
    )]
    async fn get_table_schema(
        &self,
        Parameters(input): Parameters<GetTableSchemaInput>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.run_get_table_schema(Ok(input)).await)
    }

    #[tool(
        description = "Execute any SQL statement against the database. SELECT, WITH and EXPLAIN return rows and field metadata; other statements return the affected row count and command."
    )]
    async fn execute_query(
        &self,
        Parameters(input): Parameters<ExecuteQueryInput>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.run_execute_query(Ok(input)).await)
    }
}

impl<G: QueryGateway> ServerHandler for DbService<G> {
    fn get_info(&self) -> ServerInfo {
        let info = self.gateway.info();
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "pg-mcp-server".to_owned(),
                title: Some("PostgreSQL MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "Tools for exploring and querying the PostgreSQL database `{}` at {}.\n\
                \n\
                ## Workflow\n\
                1. Call `onboarding` for an overview and example calls\n\
                2. Call `list_tables` to find tables (schema defaults to `public`)\n\
                3. Call `get_table_schema` to inspect columns, keys and constraints\n\
                4. Run SQL with `execute_query`\n\
                \n\
                ## Notes\n\
                - `execute_query` runs any statement, including writes and DDL\n\
                - Database errors are returned verbatim as tool errors",
                info.database, info.address
            )),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tool_router.list_all()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.dispatch(&request.name, request.arguments).await)
    }
}
