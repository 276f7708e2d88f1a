//! # Metric pipeline
//!
//! The OTLP exporter is wrapped in [`ObservedExporter`] so callers can watch
//! export results without touching what the periodic reader sees. Two views
//! are preregistered: a rename of the click counter and a fixed
//! explicit-bucket histogram for API response times.

use std::fmt::{self, Debug, Formatter};
use std::time::Duration;

use opentelemetry_otlp::{WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::error::OTelSdkResult;
use opentelemetry_sdk::metrics::data::ResourceMetrics;
use opentelemetry_sdk::metrics::exporter::PushMetricExporter;
use opentelemetry_sdk::metrics::{
    Aggregation, Instrument, PeriodicReader, SdkMeterProvider, Stream, Temporality,
};

use crate::Result;
use crate::config::{DEFAULT_EXPORT_TIMEOUT, ExportResultHook, OtelConfig};

/// Instrument whose streams are renamed to [`BUTTON_CLICKS_STREAM`].
pub const BUTTON_CLICKS_INSTRUMENT: &str = "button_clicks_total";

/// Stream name under which button clicks are exported.
pub const BUTTON_CLICKS_STREAM: &str = "app.button.clicks";

/// Instrument carrying API response times, in milliseconds.
pub const API_RESPONSE_TIME_INSTRUMENT: &str = "api_response_time";

/// Fixed bucket boundaries applied to [`API_RESPONSE_TIME_INSTRUMENT`].
pub const API_RESPONSE_TIME_BOUNDARIES: [f64; 8] =
    [0.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0];

/// Build the metric pipeline. Registration happens in [`crate::init`].
pub(crate) fn build(config: &OtelConfig, resource: &Resource) -> Result<SdkMeterProvider> {
    let metrics = &config.metrics;
    crate::init::check_endpoint("metrics", &metrics.url)?;

    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_http()
        .with_endpoint(&metrics.url)
        .with_headers(config.resolved_headers())
        .with_protocol(metrics.exporter.protocol())
        .with_timeout(metrics.exporter.timeout.unwrap_or(DEFAULT_EXPORT_TIMEOUT))
        .build()?;
    let exporter = ObservedExporter::new(exporter, metrics.on_export.clone());

    let reader =
        PeriodicReader::builder(exporter).with_interval(metrics.reader.resolve()).build();

    let provider = SdkMeterProvider::builder()
        .with_resource(resource.clone())
        .with_reader(reader)
        .with_view(rename_button_clicks)
        .with_view(bucket_api_response_time)
        .build();

    tracing::debug!(endpoint = metrics.url, "metric pipeline built");
    Ok(provider)
}

/// Pass-through view renaming the click counter for export.
pub fn rename_button_clicks(instrument: &Instrument) -> Option<Stream> {
    if instrument.name() != BUTTON_CLICKS_INSTRUMENT {
        return None;
    }
    Stream::builder().with_name(BUTTON_CLICKS_STREAM).build().ok()
}

/// Explicit-bucket histogram view for API response times.
pub fn bucket_api_response_time(instrument: &Instrument) -> Option<Stream> {
    if instrument.name() != API_RESPONSE_TIME_INSTRUMENT {
        return None;
    }
    Stream::builder()
        .with_aggregation(Aggregation::ExplicitBucketHistogram {
            boundaries: API_RESPONSE_TIME_BOUNDARIES.to_vec(),
            record_min_max: true,
        })
        .build()
        .ok()
}

/// Decorator around a [`PushMetricExporter`] feeding every export result to
/// an optional callback, leaving the result itself untouched.
///
/// The callback runs exactly once per export, after the wrapped exporter
/// returns, for successes and failures alike.
pub struct ObservedExporter<E> {
    inner: E,
    hook: Option<ExportResultHook>,
}

impl<E> ObservedExporter<E> {
    /// Wrap `inner`, observing results with `hook` when supplied.
    #[must_use]
    pub fn new(inner: E, hook: Option<ExportResultHook>) -> Self {
        Self { inner, hook }
    }
}

impl<E: Debug> Debug for ObservedExporter<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservedExporter")
            .field("inner", &self.inner)
            .field("hook", &self.hook.as_ref().map(|_| "<hook>"))
            .finish()
    }
}

impl<E: PushMetricExporter> PushMetricExporter for ObservedExporter<E> {
    async fn export(&self, metrics: &ResourceMetrics) -> OTelSdkResult {
        let result = self.inner.export(metrics).await;
        if let Some(hook) = &self.hook {
            hook(&result);
        }
        result
    }

    fn force_flush(&self) -> OTelSdkResult {
        self.inner.force_flush()
    }

    fn shutdown(&self) -> OTelSdkResult {
        self.inner.shutdown()
    }

    fn shutdown_with_timeout(&self, timeout: Duration) -> OTelSdkResult {
        self.inner.shutdown_with_timeout(timeout)
    }

    fn temporality(&self) -> Temporality {
        self.inner.temporality()
    }
}
