//! Success/error wrapper returned for every tool invocation.

use crate::error::{DbError, DbResult};
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Success(JsonValue),
    Error { message: String },
}

impl Envelope {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn from_result<T: Serialize>(result: DbResult<T>) -> Self {
        match result {
            Ok(payload) => match serde_json::to_value(payload) {
                Ok(value) => Self::Success(value),
                Err(e) => Self::error(format!("Failed to serialize result: {e}")),
            },
            Err(e) => Self::error(e.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl From<DbError> for Envelope {
    fn from(err: DbError) -> Self {
        Self::error(err.to_string())
    }
}

impl From<Envelope> for CallToolResult {
    fn from(envelope: Envelope) -> Self {
        match envelope {
            Envelope::Success(value) => {
                let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
                CallToolResult::success(vec![Content::text(text)])
            }
            Envelope::Error { message } => CallToolResult::error(vec![Content::text(message)]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QueryResponse;
    use serde_json::json;

    fn text_of(result: &CallToolResult) -> String {
        result.content[0]
            .as_text()
            .map(|t| t.text.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_success_is_pretty_json() {
        let envelope = Envelope::from_result(Ok(QueryResponse::Command {
            row_count: 3,
            command: "DELETE".into(),
        }));
        assert!(!envelope.is_error());

        let result: CallToolResult = envelope.into();
        assert_eq!(result.is_error, Some(false));
        let text = text_of(&result);
        assert!(text.contains('\n'));
        let parsed: JsonValue = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, json!({"rowCount": 3, "command": "DELETE"}));
    }

    #[test]
    fn test_error_carries_message_verbatim() {
        let result: DbResult<QueryResponse> = Err(DbError::database(
            "relation \"missing\" does not exist",
            Some("42P01".into()),
        ));
        let envelope = Envelope::from_result(result);
        assert_eq!(
            envelope,
            Envelope::error("relation \"missing\" does not exist")
        );

        let result: CallToolResult = envelope.into();
        assert_eq!(result.is_error, Some(true));
        assert_eq!(text_of(&result), "relation \"missing\" does not exist");
    }

    #[test]
    fn test_unknown_operation_becomes_error_result() {
        let result: CallToolResult = Envelope::from(DbError::unknown_operation("drop_everything")).into();
        assert_eq!(result.is_error, Some(true));
        assert_eq!(text_of(&result), "Unknown tool: drop_everything");
    }
}
