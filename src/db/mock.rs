//! In-memory gateway for handler tests.

use crate::db::{ConnectionInfo, QueryGateway};
use crate::error::DbResult;
use crate::models::{QueryParam, QueryResult};
use std::sync::Mutex;

type Responder = Box<dyn Fn(&str, &[QueryParam]) -> DbResult<QueryResult> + Send + Sync>;

pub(crate) struct MockGateway {
    info: ConnectionInfo,
    responder: Responder,
    pub calls: Mutex<Vec<(String, Vec<QueryParam>)>>,
}

impl MockGateway {
    pub fn new(
        responder: impl Fn(&str, &[QueryParam]) -> DbResult<QueryResult> + Send + Sync + 'static,
    ) -> Self {
        Self {
            info: ConnectionInfo {
                database: "app".to_string(),
                address: "localhost:5432".to_string(),
                server_version: Some("PostgreSQL 16.2".to_string()),
            },
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Gateway answering every statement with an empty result.
    pub fn empty() -> Self {
        Self::new(|_, _| Ok(QueryResult::default()))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl QueryGateway for MockGateway {
    async fn execute(&self, sql: &str, params: &[QueryParam]) -> DbResult<QueryResult> {
        self.calls
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        (self.responder)(sql, params)
    }

    fn info(&self) -> &ConnectionInfo {
        &self.info
    }
}

/// Build result rows from JSON objects.
pub(crate) fn rows(values: Vec<serde_json::Value>) -> QueryResult {
    let rows: Vec<_> = values
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect();
    QueryResult {
        row_count: rows.len() as u64,
        rows,
        fields: Vec::new(),
        command: "SELECT".to_string(),
    }
}
