//! OpenTelemetry export for client traces.
//!
//! Compiled only with the `otel` feature.

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Initialize tracing with console output and OTLP/HTTP export.
///
/// The collector endpoint comes from `OTEL_EXPORTER_OTLP_ENDPOINT`
/// (default `http://localhost:4318`). If the exporter cannot be built the
/// client still logs to the console.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| crate::config::DEFAULT_LOG_FILTER.into());
    let json = crate::config::json_logs_requested();

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(
            std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4318".to_string()),
        )
        .build();

    let otel_layer = match exporter {
        Ok(exporter) => {
            let resource = opentelemetry_sdk::Resource::builder()
                .with_service_name("quorum-client")
                .build();
            let tracer_provider = SdkTracerProvider::builder()
                .with_batch_exporter(exporter)
                .with_resource(resource)
                .build();
            let tracer = tracer_provider.tracer("quorum-client");
            let _ = TRACER_PROVIDER.set(tracer_provider.clone());
            opentelemetry::global::set_tracer_provider(tracer_provider);
            Some(OpenTelemetryLayer::new(tracer))
        }
        Err(e) => {
            eprintln!("OTLP exporter unavailable, console logging only: {e}");
            None
        }
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .with(otel_layer)
        .init();
}

/// Flush remaining spans and shut the exporter down.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get()
        && let Err(e) = provider.shutdown()
    {
        tracing::error!("Error shutting down tracer provider: {e:?}");
    }
}
