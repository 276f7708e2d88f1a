//! # Log pipeline
//!
//! Log records flow through a batching processor to the configured OTLP
//! endpoint, with the same default thresholds as the trace pipeline. The
//! provider is held in the facade's registry rather than a process global;
//! [`crate::get_logger`] delegates to it.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::logs::{BatchConfigBuilder, BatchLogProcessor, SdkLoggerProvider};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::{Layer as _, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::Result;
use crate::config::OtelConfig;
use crate::init::Otel;

/// Build the log pipeline. Registration happens in [`crate::init`].
pub(crate) fn build(config: &OtelConfig, resource: &Resource) -> Result<SdkLoggerProvider> {
    let logs = &config.logs;
    crate::init::check_endpoint("logs", &logs.url)?;
    let batch = logs.batch.resolve();

    let exporter = opentelemetry_otlp::LogExporter::builder()
        .with_http()
        .with_endpoint(&logs.url)
        .with_headers(config.resolved_headers())
        .with_protocol(logs.exporter.protocol())
        .with_timeout(logs.exporter.timeout.unwrap_or(batch.export_timeout))
        .build()?;

    let processor = BatchLogProcessor::builder(exporter)
        .with_batch_config(
            BatchConfigBuilder::default()
                .with_max_queue_size(batch.max_queue_size)
                .with_max_export_batch_size(batch.max_export_batch_size)
                .with_scheduled_delay(batch.scheduled_delay)
                .build(),
        )
        .build();

    let provider = SdkLoggerProvider::builder()
        .with_resource(resource.clone())
        .with_log_processor(processor)
        .build();

    tracing::debug!(endpoint = logs.url, "log pipeline built");
    Ok(provider)
}

/// Install a global `tracing` subscriber wired into the facade.
///
/// The subscriber stacks an environment filter (`RUST_LOG`, default `info`),
/// a console formatter, a span layer feeding the trace pipeline, and a
/// bridge feeding `tracing` events into the log pipeline. The bridge mutes
/// the exporters' own diagnostics so the export path cannot feed itself.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(otel: &Otel) -> Result<()> {
    let tracer = otel.tracer_provider().tracer(env!("CARGO_PKG_NAME"));

    let bridge = OpenTelemetryTracingBridge::new(otel.logger_provider())
        .with_filter(EnvFilter::new("info,opentelemetry=off,hyper=off,reqwest=off,h2=off"));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(bridge)
        .try_init()?;

    Ok(())
}
