//! # Trace pipeline
//!
//! Spans flow through a batching processor to the configured OTLP endpoint
//! and, for local visibility, through a synchronous stdout processor.

use opentelemetry_otlp::{WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{BatchConfigBuilder, BatchSpanProcessor, SdkTracerProvider};

use crate::Result;
use crate::config::OtelConfig;

/// Build the trace pipeline. Registration happens in [`crate::init`].
pub(crate) fn build(config: &OtelConfig, resource: &Resource) -> Result<SdkTracerProvider> {
    let traces = &config.traces;
    crate::init::check_endpoint("traces", &traces.url)?;
    let batch = traces.batch.resolve();

    // the dedicated-thread batch processor owns no timeout knob; the export
    // bound is enforced by the exporter itself
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(&traces.url)
        .with_headers(config.resolved_headers())
        .with_protocol(traces.exporter.protocol())
        .with_timeout(traces.exporter.timeout.unwrap_or(batch.export_timeout))
        .build()?;

    let processor = BatchSpanProcessor::builder(exporter)
        .with_batch_config(
            BatchConfigBuilder::default()
                .with_max_queue_size(batch.max_queue_size)
                .with_max_export_batch_size(batch.max_export_batch_size)
                .with_scheduled_delay(batch.scheduled_delay)
                .build(),
        )
        .build();

    let provider = SdkTracerProvider::builder()
        .with_resource(resource.clone())
        .with_span_processor(processor)
        .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
        .build();

    tracing::debug!(endpoint = traces.url, "trace pipeline built");
    Ok(provider)
}
