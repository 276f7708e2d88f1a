//! Startup-timing instrumentation.

use std::time::SystemTime;

use opentelemetry::trace::{Span, SpanKind, Tracer};
use opentelemetry::{KeyValue, global};

pub(crate) const SCOPE: &str = "lumen-otel/startup";

/// Record a span covering facade initialization, from `started` to now.
pub(crate) fn record_load_span(started: SystemTime) {
    let tracer = global::tracer(SCOPE);
    let mut span = tracer
        .span_builder("application_load")
        .with_kind(SpanKind::Internal)
        .with_start_time(started)
        .start(&tracer);
    span.set_attribute(KeyValue::new("process.pid", i64::from(std::process::id())));
    span.end();
}
