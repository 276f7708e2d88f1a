//! User-interaction instrumentation.

use std::collections::HashSet;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use opentelemetry::metrics::{Counter, Meter};
use opentelemetry::trace::{Span, SpanKind, Tracer};
use opentelemetry::{KeyValue, global};

use crate::metrics::BUTTON_CLICKS_INSTRUMENT;

pub(crate) const SCOPE: &str = "lumen-otel/interaction";

/// Records spans and the click counter for an allowlisted set of event
/// names. An empty allowlist records nothing.
#[derive(Clone)]
pub struct InteractionInstrumentation {
    event_names: Arc<HashSet<String>>,
    clicks: Counter<u64>,
}

impl InteractionInstrumentation {
    /// Build the instrumentation, creating its counter on `meter`.
    #[must_use]
    pub fn new(meter: &Meter, event_names: impl IntoIterator<Item = String>) -> Self {
        let clicks = meter
            .u64_counter(BUTTON_CLICKS_INSTRUMENT)
            .with_description("User interactions recorded by event name")
            .build();

        Self { event_names: Arc::new(event_names.into_iter().collect()), clicks }
    }

    /// Record one interaction on `target`, returning whether the event name
    /// is in the allowlist. Events outside it are ignored.
    pub fn record(&self, event_name: &str, target: &str) -> bool {
        if !self.event_names.contains(event_name) {
            return false;
        }

        let tracer = global::tracer(SCOPE);
        let mut span = tracer
            .span_builder(event_name.to_string())
            .with_kind(SpanKind::Internal)
            .with_attributes([
                KeyValue::new("event.name", event_name.to_string()),
                KeyValue::new("event.target", target.to_string()),
            ])
            .start(&tracer);
        self.clicks.add(1, &[KeyValue::new("event.name", event_name.to_string())]);
        span.end();

        true
    }
}

impl Debug for InteractionInstrumentation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionInstrumentation")
            .field("event_names", &self.event_names)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_allowlist_records_nothing() {
        let interactions =
            InteractionInstrumentation::new(&global::meter(SCOPE), Vec::new());
        assert!(!interactions.record("click", "#buy"));
    }
}
