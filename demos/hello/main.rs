//! Hello-telemetry demo.
//!
//! Wires the facade against a local collector (`localhost:4318`), emits one
//! signal of each kind plus an instrumented request, then flushes and shuts
//! down. Run a collector first, or watch spans on stdout without one.

use anyhow::Result;
use lumen_otel::config::{
    InstrumentationConfig, LogsConfig, MetricsConfig, OtelConfig, ResourceAttributes,
    TracesConfig,
};
use opentelemetry::KeyValue;
use opentelemetry::trace::{Span, Tracer};

fn main() -> Result<()> {
    let config = OtelConfig {
        resource: ResourceAttributes {
            name: "hello-telemetry".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        traces: TracesConfig::new("http://localhost:4318/v1/traces"),
        metrics: MetricsConfig::new("http://localhost:4318/v1/metrics"),
        logs: LogsConfig::new("http://localhost:4318/v1/logs"),
        instrumentations: InstrumentationConfig {
            event_names: vec!["click".to_string()],
            ..InstrumentationConfig::default()
        },
        headers: None,
    };

    let otel = lumen_otel::init(config)?;
    lumen_otel::init_tracing(&otel)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run())?;

    otel.force_flush()?;
    lumen_otel::shutdown()?;
    Ok(())
}

async fn run() -> Result<()> {
    tracing::info!("demo starting");

    let tracer = lumen_otel::get_tracer("demo", None);
    let mut span = tracer.start("demo_work");
    span.set_attribute(KeyValue::new("demo.step", 1_i64));
    span.end();

    let meter = lumen_otel::get_meter("demo", None);
    let clicks = meter.u64_counter("button_clicks_total").build();
    clicks.add(1, &[KeyValue::new("event.name", "click")]);

    if let Some(instrumentations) = lumen_otel::instrumentations() {
        instrumentations.interactions().record("click", "#demo-button");

        let http = instrumentations.http();
        let request = http.request(reqwest::Method::GET, "https://example.com/").build()?;
        match http.execute(request).await {
            Ok(response) => tracing::info!(status = %response.status(), "request traced"),
            Err(error) => tracing::warn!("request failed: {error}"),
        }
    }

    tracing::info!("demo finished");
    Ok(())
}
