//! Instrumented HTTP client and manual request guards.
//!
//! [`HttpInstrumentation::execute`] traces requests made through the bundled
//! `reqwest` client. [`HttpInstrumentation::start_request`] covers requests
//! executed by any other HTTP stack: it hands back the headers to attach and
//! a guard that records the outcome. Both paths inject W3C trace-context
//! headers for every origin matched by the configured targets and record
//! response times into the `api_response_time` histogram.

use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use http::HeaderMap;
use opentelemetry::metrics::{Histogram, Meter};
use opentelemetry::trace::{SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue, global};
use opentelemetry_http::HeaderInjector;
use opentelemetry_semantic_conventions::attribute::{
    HTTP_REQUEST_METHOD, HTTP_RESPONSE_STATUS_CODE, URL_FULL,
};

use crate::config::PropagationTargets;
use crate::metrics::API_RESPONSE_TIME_INSTRUMENT;

pub(crate) const SCOPE: &str = "lumen-otel/http";

/// Client-side HTTP instrumentation.
#[derive(Clone)]
pub struct HttpInstrumentation {
    client: reqwest::Client,
    targets: PropagationTargets,
    keep_timings: bool,
    response_time: Histogram<f64>,
    timings: Arc<Mutex<Vec<RequestTiming>>>,
}

impl HttpInstrumentation {
    /// Build the instrumentation, creating its response-time histogram on
    /// `meter`.
    #[must_use]
    pub fn new(meter: &Meter, targets: PropagationTargets, keep_timings: bool) -> Self {
        let response_time = meter
            .f64_histogram(API_RESPONSE_TIME_INSTRUMENT)
            .with_unit("ms")
            .with_description("End-to-end latency of instrumented requests")
            .build();

        Self {
            client: reqwest::Client::new(),
            targets,
            keep_timings,
            response_time,
            timings: Arc::default(),
        }
    }

    /// Start building a request against the bundled client.
    ///
    /// Run the built request through [`Self::execute`]; sending it directly
    /// bypasses the instrumentation.
    pub fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client.request(method, url)
    }

    /// Execute `request`, tracing it and recording its response time.
    ///
    /// Trace-context headers are injected when the request URL matches the
    /// configured propagation targets.
    pub async fn execute(&self, mut request: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let method = request.method().clone();
        let url = request.url().to_string();

        let tracer = global::tracer(SCOPE);
        let span = tracer
            .span_builder(format!("HTTP {method}"))
            .with_kind(SpanKind::Client)
            .with_attributes([
                KeyValue::new(HTTP_REQUEST_METHOD, method.to_string()),
                KeyValue::new(URL_FULL, url.clone()),
            ])
            .start(&tracer);
        let cx = Context::current_with_span(span);

        if self.targets.matches(&url) {
            inject_context(&cx, request.headers_mut());
        }

        let started = Instant::now();
        let outcome = self.client.execute(request).await;
        let elapsed = started.elapsed();

        let span = cx.span();
        match &outcome {
            Ok(response) => {
                let status = response.status();
                span.set_attribute(KeyValue::new(
                    HTTP_RESPONSE_STATUS_CODE,
                    i64::from(status.as_u16()),
                ));
                if status.is_server_error() {
                    span.set_status(Status::error(status.to_string()));
                }
            }
            Err(error) => span.set_status(Status::error(error.to_string())),
        }
        span.end();

        self.record(RequestTiming {
            url,
            elapsed,
            status: outcome.as_ref().ok().map(|response| response.status().as_u16()),
        });

        outcome
    }

    /// Start a guard for a request executed by another HTTP stack.
    ///
    /// Attach [`RequestGuard::headers`] to the outgoing request and call
    /// [`RequestGuard::finish`] once a response (or failure) is known.
    #[must_use]
    pub fn start_request(&self, method: &str, url: &str) -> RequestGuard {
        let tracer = global::tracer(SCOPE);
        let span = tracer
            .span_builder(format!("HTTP {method}"))
            .with_kind(SpanKind::Client)
            .with_attributes([
                KeyValue::new(HTTP_REQUEST_METHOD, method.to_string()),
                KeyValue::new(URL_FULL, url.to_string()),
            ])
            .start(&tracer);
        let cx = Context::current_with_span(span);

        let mut headers = HeaderMap::new();
        if self.targets.matches(url) {
            inject_context(&cx, &mut headers);
        }

        RequestGuard {
            cx,
            headers,
            url: url.to_string(),
            started: Instant::now(),
            instrumentation: self.clone(),
        }
    }

    /// Timing entries retained since the last call.
    ///
    /// Empty unless retention was enabled; captured entries are otherwise
    /// dropped once recorded into the histogram.
    #[must_use]
    pub fn take_timings(&self) -> Vec<RequestTiming> {
        self.timings
            .lock()
            .map(|mut timings| std::mem::take(&mut *timings))
            .unwrap_or_default()
    }

    fn record(&self, timing: RequestTiming) {
        self.response_time.record(
            timing.elapsed.as_secs_f64() * 1000.0,
            &[KeyValue::new(URL_FULL, timing.url.clone())],
        );
        if self.keep_timings {
            if let Ok(mut timings) = self.timings.lock() {
                timings.push(timing);
            }
        }
    }
}

impl Debug for HttpInstrumentation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpInstrumentation")
            .field("targets", &self.targets)
            .field("keep_timings", &self.keep_timings)
            .finish_non_exhaustive()
    }
}

/// In-flight guard for a manually-instrumented request.
pub struct RequestGuard {
    cx: Context,
    headers: HeaderMap,
    url: String,
    started: Instant,
    instrumentation: HttpInstrumentation,
}

impl RequestGuard {
    /// Headers carrying the trace context for the outgoing request.
    ///
    /// Empty when the URL is outside the configured propagation targets.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Complete the request with `status`, recording timing and closing the
    /// span. `None` marks a transport-level failure.
    pub fn finish(self, status: Option<u16>) {
        let elapsed = self.started.elapsed();

        let span = self.cx.span();
        match status {
            Some(status) => {
                span.set_attribute(KeyValue::new(HTTP_RESPONSE_STATUS_CODE, i64::from(status)));
                if status >= 500 {
                    span.set_status(Status::error(format!("HTTP {status}")));
                }
            }
            None => span.set_status(Status::error("request failed")),
        }
        span.end();

        self.instrumentation.record(RequestTiming { url: self.url, elapsed, status });
    }
}

impl Debug for RequestGuard {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestGuard")
            .field("url", &self.url)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// One captured request timing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestTiming {
    /// Full request URL.
    pub url: String,

    /// Wall-clock duration of the request.
    pub elapsed: Duration,

    /// Response status, or `None` for transport-level failures.
    pub status: Option<u16>,
}

/// Inject `cx` into `headers` through the globally-registered propagator.
pub fn inject_context(cx: &Context, headers: &mut HeaderMap) {
    global::get_text_map_propagator(|propagator| {
        propagator.inject_context(cx, &mut HeaderInjector(headers));
    });
}

#[cfg(test)]
mod tests {
    use opentelemetry_sdk::propagation::TraceContextPropagator;
    use opentelemetry_sdk::trace::SdkTracerProvider;

    use super::*;

    fn sampled_instrumentation(targets: PropagationTargets, keep_timings: bool) -> HttpInstrumentation {
        global::set_tracer_provider(SdkTracerProvider::builder().build());
        global::set_text_map_propagator(TraceContextPropagator::new());
        HttpInstrumentation::new(&global::meter(SCOPE), targets, keep_timings)
    }

    #[test]
    fn guard_injects_traceparent_for_any_origin() {
        let http = sampled_instrumentation(PropagationTargets::All, false);

        let guard = http.start_request("GET", "https://api.external.example/v1/items");
        assert!(guard.headers().contains_key("traceparent"));
        guard.finish(Some(200));
    }

    #[test]
    fn narrowed_targets_stop_injection() {
        let http = sampled_instrumentation(
            PropagationTargets::Prefixes(vec!["https://api.internal.example".to_string()]),
            false,
        );

        let matching = http.start_request("GET", "https://api.internal.example/v1/items");
        assert!(matching.headers().contains_key("traceparent"));
        matching.finish(Some(200));

        let other = http.start_request("GET", "https://elsewhere.example/v1/items");
        assert!(other.headers().is_empty());
        other.finish(Some(200));
    }

    #[test]
    fn timings_drop_unless_retention_enabled() {
        let dropping = sampled_instrumentation(PropagationTargets::All, false);
        dropping.start_request("GET", "https://a.example/").finish(Some(200));
        assert!(dropping.take_timings().is_empty());

        let retaining = sampled_instrumentation(PropagationTargets::All, true);
        retaining.start_request("GET", "https://a.example/").finish(Some(204));
        retaining.start_request("GET", "https://b.example/").finish(None);

        let timings = retaining.take_timings();
        assert_eq!(timings.len(), 2);
        assert_eq!(timings[0].url, "https://a.example/");
        assert_eq!(timings[0].status, Some(204));
        assert_eq!(timings[1].status, None);

        // taking drains the buffer
        assert!(retaining.take_timings().is_empty());
    }
}
