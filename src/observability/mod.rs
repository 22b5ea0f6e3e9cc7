//! Observability around tool invocations.
//!
//! [`Observability`] is built once at startup and passed to the service. It
//! wraps each handler call with timing, a structured log line and, when
//! enabled, OTLP metrics and a span. It never changes the handler's result.

pub mod logging;
pub mod telemetry;

pub use logging::{LogTarget, LoggingGuard};
pub use telemetry::{Telemetry, TelemetryError};

use crate::config::TelemetrySettings;
use crate::db::StatementKind;
use crate::error::DbResult;
use crate::registry::Operation;
use serde::Serialize;
use std::future::Future;
use std::time::Instant;
use tracing::{info, warn};

/// Result payloads that know how many rows they carry.
pub trait Measured {
    fn row_count(&self) -> Option<u64> {
        None
    }
}

/// Serialized JSON length of a payload; 0 when it cannot be serialized.
pub fn payload_size<T: Serialize>(payload: &T) -> usize {
    serde_json::to_vec(payload).map(|v| v.len()).unwrap_or(0)
}

pub struct Observability {
    telemetry: Telemetry,
}

impl Observability {
    pub fn new(telemetry: Telemetry) -> Self {
        Self { telemetry }
    }

    /// Logging only, no metric or span export.
    pub fn disabled() -> Self {
        Self::new(Telemetry::disabled())
    }

    /// Set up exporters for the settings. An exporter that cannot be
    /// installed leaves telemetry off and startup continues.
    pub fn from_settings(settings: &TelemetrySettings) -> Self {
        match Telemetry::init(settings) {
            Ok(telemetry) => Self::new(telemetry),
            Err(e) => {
                warn!(error = %e, "Telemetry disabled");
                Self::disabled()
            }
        }
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Run `handler` for `operation`, recording the outcome.
    pub async fn instrument<T, F>(
        &self,
        operation: Operation,
        statement_kind: Option<StatementKind>,
        handler: F,
    ) -> DbResult<T>
    where
        T: Serialize + Measured,
        F: Future<Output = DbResult<T>>,
    {
        let tool = operation.as_str();
        let kind = statement_kind.map(StatementKind::as_str);
        let span = self.telemetry.start(tool, kind);
        let started = Instant::now();

        let result = handler.await;

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.telemetry.record_duration(tool, elapsed_ms);

        match &result {
            Ok(payload) => {
                let rows = payload.row_count();
                let size = payload_size(payload);
                span.succeed(rows, size);
                info!(
                    tool = tool,
                    statement_kind = kind,
                    duration_ms = elapsed_ms,
                    rows = rows,
                    size_bytes = size,
                    "Tool succeeded"
                );
            }
            Err(e) => {
                let message = e.to_string();
                self.telemetry.record_error(tool, &message);
                span.fail(&message);
                warn!(
                    tool = tool,
                    statement_kind = kind,
                    duration_ms = elapsed_ms,
                    error = %message,
                    "Tool failed"
                );
            }
        }

        result
    }

    /// Flush and stop the exporters.
    pub fn shutdown(&self) {
        self.telemetry.shutdown();
    }
}
