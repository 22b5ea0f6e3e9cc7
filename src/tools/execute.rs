//! The `execute_query` tool.
//!
//! Runs caller-supplied SQL as-is. The leading keyword decides the response
//! shape only: `SELECT`, `WITH` and `EXPLAIN` answer with rows and field
//! metadata, everything else with the row count and command verb. That
//! includes `INSERT ... RETURNING`, whose returned rows are not shown.

use crate::db::{QueryGateway, StatementKind};
use crate::error::{DbError, DbResult};
use crate::models::QueryResponse;
use crate::observability::Measured;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Input for the execute_query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExecuteQueryInput {
    /// SQL to execute
    pub query: String,
}

impl Measured for QueryResponse {
    fn row_count(&self) -> Option<u64> {
        Some(QueryResponse::row_count(self))
    }
}

pub struct QueryToolHandler<G> {
    gateway: Arc<G>,
}

impl<G: QueryGateway> QueryToolHandler<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    pub async fn execute_query(&self, input: ExecuteQueryInput) -> DbResult<QueryResponse> {
        if input.query.trim().is_empty() {
            return Err(DbError::invalid_input("query is required"));
        }

        let kind = StatementKind::detect(&input.query);
        let result = self.gateway.execute(&input.query, &[]).await?;

        info!(
            statement_kind = %kind,
            rows = result.row_count,
            "Query executed"
        );

        let response = if kind.returns_rows() {
            QueryResponse::Rows {
                row_count: result.row_count,
                rows: result.rows,
                fields: result.fields,
            }
        } else {
            QueryResponse::Command {
                row_count: result.row_count,
                command: result.command,
            }
        };
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mock::{MockGateway, rows};
    use crate::models::{Field, QueryResult};
    use serde_json::json;

    fn handler(gateway: MockGateway) -> QueryToolHandler<MockGateway> {
        QueryToolHandler::new(Arc::new(gateway))
    }

    fn input(query: &str) -> ExecuteQueryInput {
        ExecuteQueryInput {
            query: query.to_string(),
        }
    }

    #[tokio::test]
    async fn test_select_returns_rows_and_fields() {
        let gateway = MockGateway::new(|_, _| {
            let mut result = rows(vec![json!({"count": "3"})]);
            result.fields = vec![Field::new("count", 20)];
            Ok(result)
        });

        let response = handler(gateway)
            .execute_query(input("SELECT COUNT(*) FROM users"))
            .await
            .unwrap();

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            json!({
                "rowCount": 1,
                "rows": [{"count": "3"}],
                "fields": [{"name": "count", "dataTypeID": 20}]
            })
        );
    }

    #[tokio::test]
    async fn test_with_and_explain_return_rows() {
        for sql in ["  with t as (select 1) select * from t", "EXPLAIN SELECT 1"] {
            let response = handler(MockGateway::new(|_, _| Ok(rows(vec![json!({"x": 1})]))))
                .execute_query(input(sql))
                .await
                .unwrap();
            assert!(matches!(response, QueryResponse::Rows { .. }), "{sql}");
        }
    }

    #[tokio::test]
    async fn test_update_returns_command() {
        let gateway = MockGateway::new(|_, _| {
            Ok(QueryResult {
                row_count: 2,
                command: "UPDATE".to_string(),
                ..Default::default()
            })
        });

        let response = handler(gateway)
            .execute_query(input("UPDATE users SET name = 'x'"))
            .await
            .unwrap();
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"rowCount": 2, "command": "UPDATE"})
        );
    }

    #[tokio::test]
    async fn test_insert_returning_uses_command_shape() {
        let gateway = MockGateway::new(|_, _| {
            let mut result = rows(vec![json!({"id": 7})]);
            result.command = "INSERT".to_string();
            Ok(result)
        });

        let response = handler(gateway)
            .execute_query(input("INSERT INTO users (name) VALUES ('a') RETURNING *"))
            .await
            .unwrap();
        assert_eq!(
            response,
            QueryResponse::Command {
                row_count: 1,
                command: "INSERT".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_query_sent_verbatim_without_params() {
        let gateway = Arc::new(MockGateway::empty());
        let handler = QueryToolHandler::new(gateway.clone());
        let sql = "DELETE FROM users WHERE id = 1; DROP TABLE users";

        handler.execute_query(input(sql)).await.unwrap();

        let calls = gateway.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, sql);
        assert!(calls[0].1.is_empty());
    }

    #[tokio::test]
    async fn test_database_error_passes_through() {
        let gateway = MockGateway::new(|_, _| {
            Err(DbError::database(
                "table \"nonexistent\" does not exist",
                Some("42P01".into()),
            ))
        });

        let err = handler(gateway)
            .execute_query(input("DROP TABLE nonexistent"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "table \"nonexistent\" does not exist");
    }

    #[tokio::test]
    async fn test_blank_query_rejected() {
        let gateway = Arc::new(MockGateway::empty());
        let handler = QueryToolHandler::new(gateway.clone());

        let err = handler.execute_query(input("   \n")).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
        assert_eq!(gateway.call_count(), 0);
    }
}
