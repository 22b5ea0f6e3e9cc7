//! OTLP metrics and spans.
//!
//! When telemetry is disabled every recording call is a no-op. Exporter
//! failures after startup are handled inside the SDK and never reach a tool
//! result.

use crate::config::TelemetrySettings;
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram, MeterProvider as _};
use opentelemetry::trace::{Span as _, Status, Tracer as _, TracerProvider as _};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::runtime;
use opentelemetry_sdk::trace::{Span, Tracer, TracerProvider};
use thiserror::Error;
use tracing::{info, warn};

const INSTRUMENTATION_SCOPE: &str = "pg-mcp-server";

pub const METRIC_INVOCATIONS: &str = "mcp.tool.invocations";
pub const METRIC_DURATION: &str = "mcp.tool.duration";
pub const METRIC_ERRORS: &str = "mcp.tool.errors";

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid OTLP endpoint '{endpoint}': {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    #[error("Failed to install trace exporter: {0}")]
    Trace(#[from] opentelemetry::trace::TraceError),

    #[error("Failed to install metrics exporter: {0}")]
    Metrics(#[from] opentelemetry::metrics::MetricsError),
}

/// Signal URL (`{base}/v1/traces`, `{base}/v1/metrics`) under the collector
/// base endpoint.
pub fn signal_endpoint(base: &str, signal: &str) -> Result<String, TelemetryError> {
    let parsed = url::Url::parse(base).map_err(|e| TelemetryError::InvalidEndpoint {
        endpoint: base.to_string(),
        message: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(TelemetryError::InvalidEndpoint {
            endpoint: base.to_string(),
            message: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(format!("{}/v1/{}", base.trim_end_matches('/'), signal))
}

struct Exporters {
    meter_provider: SdkMeterProvider,
    tracer_provider: TracerProvider,
    tracer: Tracer,
    invocations: Counter<u64>,
    duration: Histogram<f64>,
    errors: Counter<u64>,
}

/// Metric instruments and tracer, or nothing when disabled.
pub struct Telemetry {
    exporters: Option<Exporters>,
}

/// An in-flight tool span. Inert when telemetry is disabled.
pub struct ToolSpan {
    span: Option<Span>,
}

impl Telemetry {
    pub fn disabled() -> Self {
        Self { exporters: None }
    }

    /// Install the OTLP/HTTP exporters. Must run inside a Tokio runtime.
    pub fn init(settings: &TelemetrySettings) -> Result<Self, TelemetryError> {
        if !settings.enabled {
            return Ok(Self::disabled());
        }

        let traces_url = signal_endpoint(&settings.endpoint, "traces")?;
        let metrics_url = signal_endpoint(&settings.endpoint, "metrics")?;
        let resource = Resource::new(vec![KeyValue::new(
            "service.name",
            settings.service_name.clone(),
        )]);

        let tracer_provider = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .http()
                    .with_endpoint(traces_url.clone()),
            )
            .with_trace_config(
                opentelemetry_sdk::trace::Config::default().with_resource(resource.clone()),
            )
            .install_batch(runtime::Tokio)?;

        let meter_provider = opentelemetry_otlp::new_pipeline()
            .metrics(runtime::Tokio)
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .http()
                    .with_endpoint(metrics_url.clone()),
            )
            .with_resource(resource)
            .build()?;

        info!(
            traces = %traces_url,
            metrics = %metrics_url,
            service_name = %settings.service_name,
            "Telemetry export enabled"
        );

        Ok(Self::with_providers(tracer_provider, meter_provider))
    }

    /// Record through already-built providers.
    pub fn with_providers(tracer_provider: TracerProvider, meter_provider: SdkMeterProvider) -> Self {
        let meter = meter_provider.meter(INSTRUMENTATION_SCOPE);
        let invocations = meter
            .u64_counter(METRIC_INVOCATIONS)
            .with_description("Number of tool invocations")
            .init();
        let duration = meter
            .f64_histogram(METRIC_DURATION)
            .with_description("Tool execution time in milliseconds")
            .init();
        let errors = meter
            .u64_counter(METRIC_ERRORS)
            .with_description("Number of failed tool invocations")
            .init();
        let tracer = tracer_provider.tracer(INSTRUMENTATION_SCOPE);

        Self {
            exporters: Some(Exporters {
                meter_provider,
                tracer_provider,
                tracer,
                invocations,
                duration,
                errors,
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.exporters.is_some()
    }

    /// Count the invocation and open a span named after the tool.
    pub fn start(&self, tool: &'static str, statement_kind: Option<&'static str>) -> ToolSpan {
        let Some(exporters) = &self.exporters else {
            return ToolSpan { span: None };
        };

        let mut attributes = vec![KeyValue::new("tool", tool)];
        if let Some(kind) = statement_kind {
            attributes.push(KeyValue::new("statement_kind", kind));
        }
        exporters.invocations.add(1, &attributes);

        let mut span = exporters.tracer.start(tool);
        if let Some(kind) = statement_kind {
            span.set_attribute(KeyValue::new("statement_kind", kind));
        }
        ToolSpan { span: Some(span) }
    }

    pub fn record_duration(&self, tool: &'static str, elapsed_ms: f64) {
        if let Some(exporters) = &self.exporters {
            exporters
                .duration
                .record(elapsed_ms, &[KeyValue::new("tool", tool)]);
        }
    }

    pub fn record_error(&self, tool: &'static str, error: &str) {
        if let Some(exporters) = &self.exporters {
            exporters.errors.add(
                1,
                &[
                    KeyValue::new("tool", tool),
                    KeyValue::new("error", error.to_string()),
                ],
            );
        }
    }

    /// Flush and stop both exporters. Failures are logged only.
    pub fn shutdown(&self) {
        let Some(exporters) = &self.exporters else {
            return;
        };
        if let Err(e) = exporters.tracer_provider.shutdown() {
            warn!(error = %e, "Failed to shut down trace exporter");
        }
        if let Err(e) = exporters.meter_provider.shutdown() {
            warn!(error = %e, "Failed to shut down metrics exporter");
        }
        info!("Telemetry exporters shut down");
    }
}

impl ToolSpan {
    pub fn succeed(self, row_count: Option<u64>, size_bytes: usize) {
        if let Some(mut span) = self.span {
            if let Some(rows) = row_count {
                span.set_attribute(KeyValue::new("result.row_count", rows as i64));
            }
            span.set_attribute(KeyValue::new("result.size_bytes", size_bytes as i64));
            span.set_status(Status::Ok);
            span.end();
        }
    }

    pub fn fail(self, message: &str) {
        if let Some(mut span) = self.span {
            span.set_attribute(KeyValue::new("error.message", message.to_string()));
            span.set_status(Status::error(message.to_string()));
            span.end();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_endpoint() {
        assert_eq!(
            signal_endpoint("http://localhost:4318", "traces").unwrap(),
            "http://localhost:4318/v1/traces"
        );
        assert_eq!(
            signal_endpoint("https://collector:4318/", "metrics").unwrap(),
            "https://collector:4318/v1/metrics"
        );
    }

    #[test]
    fn test_signal_endpoint_rejects_garbage() {
        assert!(matches!(
            signal_endpoint("not a url", "traces"),
            Err(TelemetryError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            signal_endpoint("ftp://collector:21", "traces"),
            Err(TelemetryError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_disabled_telemetry_is_noop() {
        let telemetry = Telemetry::init(&TelemetrySettings::default()).unwrap();
        assert!(!telemetry.is_enabled());

        let span = telemetry.start("execute_query", Some("SELECT"));
        telemetry.record_duration("execute_query", 1.5);
        telemetry.record_error("execute_query", "boom");
        span.fail("boom");
        telemetry.start("onboarding", None).succeed(None, 10);
        telemetry.shutdown();
    }
}
