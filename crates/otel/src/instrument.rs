//! # Instrumentation
//!
//! The fixed instrumentation set registered at the end of initialization:
//! a startup-timing span, an instrumented HTTP client with manual request
//! guards for other HTTP stacks, and a user-interaction recorder gated by
//! an event-name allowlist.

mod http;
mod interaction;
mod startup;

use std::time::SystemTime;

use opentelemetry::global;

pub use self::http::{HttpInstrumentation, RequestGuard, RequestTiming};
pub use self::interaction::InteractionInstrumentation;
use crate::config::InstrumentationConfig;

/// Instrumentations constructed during initialization.
///
/// Handles are cheap to clone and share the underlying instruments.
#[derive(Clone, Debug)]
pub struct Instrumentations {
    http: HttpInstrumentation,
    interactions: InteractionInstrumentation,
}

impl Instrumentations {
    /// Build the instrumentation set against the global providers and emit
    /// the startup span covering `started` to now.
    pub(crate) fn register(config: &InstrumentationConfig, started: SystemTime) -> Self {
        startup::record_load_span(started);

        let http = HttpInstrumentation::new(
            &global::meter(http::SCOPE),
            config.propagate_trace_headers.clone(),
            config.keep_timings,
        );
        let interactions = InteractionInstrumentation::new(
            &global::meter(interaction::SCOPE),
            config.event_names.iter().cloned(),
        );

        tracing::debug!(events = config.event_names.len(), "instrumentations registered");
        Self { http, interactions }
    }

    /// The instrumented HTTP client.
    #[must_use]
    pub fn http(&self) -> &HttpInstrumentation {
        &self.http
    }

    /// The user-interaction recorder.
    #[must_use]
    pub fn interactions(&self) -> &InteractionInstrumentation {
        &self.interactions
    }
}
