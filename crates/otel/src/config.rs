//! # Configuration
//!
//! One record, consumed once by [`crate::init`]. Callers supply the service
//! identity and one OTLP endpoint per signal; everything else is optional
//! and shallow-merged over the facade defaults, field by field.

use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use opentelemetry_otlp::Protocol;
use opentelemetry_sdk::error::OTelSdkResult;
use serde::{Deserialize, Serialize};

/// Default maximum number of records a batching processor will queue.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 100;

/// Default maximum number of records sent in one export batch.
pub const DEFAULT_MAX_EXPORT_BATCH_SIZE: usize = 10;

/// Default delay between scheduled batch flushes.
pub const DEFAULT_SCHEDULED_DELAY: Duration = Duration::from_millis(2000);

/// Default upper bound on a single export call.
pub const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_millis(30000);

/// Default interval between periodic metric collections.
pub const DEFAULT_READER_INTERVAL: Duration = Duration::from_millis(5000);

/// Callback invoked with every metric export result.
///
/// The hook observes the result after the wrapped exporter returns; it
/// cannot alter what the metric reader sees.
pub type ExportResultHook = Arc<dyn Fn(&OTelSdkResult) + Send + Sync>;

/// Top-level facade configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OtelConfig {
    /// Service identity attached to every signal stream.
    pub resource: ResourceAttributes,

    /// Trace pipeline settings.
    pub traces: TracesConfig,

    /// Metric pipeline settings.
    pub metrics: MetricsConfig,

    /// Log pipeline settings.
    pub logs: LogsConfig,

    /// Instrumentation settings.
    #[serde(default)]
    pub instrumentations: InstrumentationConfig,

    /// Headers sent with every OTLP request. `None` applies the default
    /// JSON content type.
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
}

impl OtelConfig {
    /// Headers to attach to every exporter, defaulted when unset.
    pub(crate) fn resolved_headers(&self) -> HashMap<String, String> {
        self.headers.clone().unwrap_or_else(|| {
            HashMap::from([("Content-Type".to_string(), "application/json".to_string())])
        })
    }
}

/// Service identity shared by all three pipelines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAttributes {
    /// Service name, exported as `service.name`.
    pub name: String,

    /// Service version, exported as `service.version`.
    pub version: String,
}

/// Trace pipeline settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TracesConfig {
    /// OTLP endpoint receiving spans.
    pub url: String,

    /// Exporter overrides.
    #[serde(default)]
    pub exporter: ExporterOptions,

    /// Batching-processor overrides.
    #[serde(default)]
    pub batch: BatchOptions,
}

impl TracesConfig {
    /// Settings for `url` with every tunable left at its default.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            exporter: ExporterOptions::default(),
            batch: BatchOptions::default(),
        }
    }
}

/// Metric pipeline settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// OTLP endpoint receiving metrics.
    pub url: String,

    /// Exporter overrides.
    #[serde(default)]
    pub exporter: ExporterOptions,

    /// Periodic-reader overrides.
    #[serde(default)]
    pub reader: ReaderOptions,

    /// Observes every export result, unmodified, after the exporter runs.
    #[serde(skip)]
    pub on_export: Option<ExportResultHook>,
}

impl MetricsConfig {
    /// Settings for `url` with every tunable left at its default.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            exporter: ExporterOptions::default(),
            reader: ReaderOptions::default(),
            on_export: None,
        }
    }
}

impl Debug for MetricsConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsConfig")
            .field("url", &self.url)
            .field("exporter", &self.exporter)
            .field("reader", &self.reader)
            .field("on_export", &self.on_export.as_ref().map(|_| "<hook>"))
            .finish()
    }
}

/// Log pipeline settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogsConfig {
    /// OTLP endpoint receiving log records.
    pub url: String,

    /// Exporter overrides.
    #[serde(default)]
    pub exporter: ExporterOptions,

    /// Batching-processor overrides.
    #[serde(default)]
    pub batch: BatchOptions,
}

impl LogsConfig {
    /// Settings for `url` with every tunable left at its default.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            exporter: ExporterOptions::default(),
            batch: BatchOptions::default(),
        }
    }
}

/// Exporter overrides, merged over the facade defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExporterOptions {
    /// Upper bound on a single export call. Falls back to the batch
    /// export timeout, then to [`DEFAULT_EXPORT_TIMEOUT`].
    pub timeout: Option<Duration>,

    /// OTLP encoding on the wire.
    pub format: Option<WireFormat>,
}

impl ExporterOptions {
    pub(crate) fn protocol(&self) -> Protocol {
        match self.format.unwrap_or_default() {
            WireFormat::Json => Protocol::HttpJson,
            WireFormat::Binary => Protocol::HttpBinary,
        }
    }
}

/// OTLP payload encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// JSON-encoded OTLP, matching the default request headers.
    #[default]
    Json,

    /// Binary protobuf OTLP.
    Binary,
}

/// Batching-processor overrides. Unset fields fall back to the facade
/// defaults; merging is field by field over the whole struct, never nested.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Maximum number of records queued before drops occur.
    pub max_queue_size: Option<usize>,

    /// Maximum number of records per export batch.
    pub max_export_batch_size: Option<usize>,

    /// Delay between scheduled flushes.
    pub scheduled_delay: Option<Duration>,

    /// Upper bound on a single export call.
    pub export_timeout: Option<Duration>,
}

impl BatchOptions {
    /// Merge the overrides over the defaults.
    #[must_use]
    pub fn resolve(&self) -> BatchSettings {
        BatchSettings {
            max_queue_size: self.max_queue_size.unwrap_or(DEFAULT_MAX_QUEUE_SIZE),
            max_export_batch_size: self
                .max_export_batch_size
                .unwrap_or(DEFAULT_MAX_EXPORT_BATCH_SIZE),
            scheduled_delay: self.scheduled_delay.unwrap_or(DEFAULT_SCHEDULED_DELAY),
            export_timeout: self.export_timeout.unwrap_or(DEFAULT_EXPORT_TIMEOUT),
        }
    }
}

/// Fully-resolved batching thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchSettings {
    /// Maximum number of records queued before drops occur.
    pub max_queue_size: usize,

    /// Maximum number of records per export batch.
    pub max_export_batch_size: usize,

    /// Delay between scheduled flushes.
    pub scheduled_delay: Duration,

    /// Upper bound on a single export call.
    pub export_timeout: Duration,
}

/// Periodic-reader overrides.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReaderOptions {
    /// Interval between metric collections.
    pub interval: Option<Duration>,
}

impl ReaderOptions {
    pub(crate) fn resolve(&self) -> Duration {
        self.interval.unwrap_or(DEFAULT_READER_INTERVAL)
    }
}

/// Instrumentation settings consumed at registration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InstrumentationConfig {
    /// Interaction event names to record. Empty records nothing.
    #[serde(default)]
    pub event_names: Vec<String>,

    /// Origins that receive trace-context headers on outgoing requests.
    #[serde(default)]
    pub propagate_trace_headers: PropagationTargets,

    /// Keep per-request timing entries after they are recorded into the
    /// response-time histogram. Off by default; captured entries are
    /// dropped once recorded.
    #[serde(default)]
    pub keep_timings: bool,
}

/// Origin filter for outgoing trace-context propagation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropagationTargets {
    /// Propagate to every origin.
    #[default]
    All,

    /// Propagate only to URLs starting with one of these prefixes.
    Prefixes(Vec<String>),
}

impl PropagationTargets {
    /// Whether requests to `url` should carry trace-context headers.
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::All => true,
            Self::Prefixes(prefixes) => prefixes.iter().any(|prefix| url.starts_with(prefix)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_defaults() {
        let settings = BatchOptions::default().resolve();
        assert_eq!(settings.max_queue_size, 100);
        assert_eq!(settings.max_export_batch_size, 10);
        assert_eq!(settings.scheduled_delay, Duration::from_millis(2000));
        assert_eq!(settings.export_timeout, Duration::from_millis(30000));
    }

    #[test]
    fn batch_merge_is_shallow() {
        let overrides = BatchOptions { max_queue_size: Some(50), ..BatchOptions::default() };

        let settings = overrides.resolve();
        assert_eq!(settings.max_queue_size, 50);
        assert_eq!(settings.max_export_batch_size, 10);
        assert_eq!(settings.scheduled_delay, Duration::from_millis(2000));
        assert_eq!(settings.export_timeout, Duration::from_millis(30000));
    }

    #[test]
    fn reader_interval_default_and_override() {
        assert_eq!(ReaderOptions::default().resolve(), Duration::from_millis(5000));

        let overridden = ReaderOptions { interval: Some(Duration::from_millis(250)) };
        assert_eq!(overridden.resolve(), Duration::from_millis(250));
    }

    #[test]
    fn headers_default_to_json_content_type() {
        let config = OtelConfig {
            resource: ResourceAttributes {
                name: "svc".to_string(),
                version: "0.1.0".to_string(),
            },
            traces: TracesConfig::new("http://localhost:4318/v1/traces"),
            metrics: MetricsConfig::new("http://localhost:4318/v1/metrics"),
            logs: LogsConfig::new("http://localhost:4318/v1/logs"),
            instrumentations: InstrumentationConfig::default(),
            headers: None,
        };

        let headers = config.resolved_headers();
        assert_eq!(headers.get("Content-Type").map(String::as_str), Some("application/json"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn caller_headers_replace_the_default() {
        let mut config = OtelConfig {
            resource: ResourceAttributes {
                name: "svc".to_string(),
                version: "0.1.0".to_string(),
            },
            traces: TracesConfig::new("http://localhost:4318/v1/traces"),
            metrics: MetricsConfig::new("http://localhost:4318/v1/metrics"),
            logs: LogsConfig::new("http://localhost:4318/v1/logs"),
            instrumentations: InstrumentationConfig::default(),
            headers: None,
        };
        config.headers =
            Some(HashMap::from([("X-Tenant".to_string(), "acme".to_string())]));

        let headers = config.resolved_headers();
        assert_eq!(headers.get("X-Tenant").map(String::as_str), Some("acme"));
        assert!(!headers.contains_key("Content-Type"));
    }

    #[test]
    fn propagation_targets() {
        assert!(PropagationTargets::All.matches("https://anywhere.example/path"));

        let narrowed =
            PropagationTargets::Prefixes(vec!["https://api.internal.example".to_string()]);
        assert!(narrowed.matches("https://api.internal.example/v1/items"));
        assert!(!narrowed.matches("https://elsewhere.example/v1/items"));
    }

    #[test]
    fn config_round_trips_through_serde() {
        let config = OtelConfig {
            resource: ResourceAttributes {
                name: "svc".to_string(),
                version: "2.0.0".to_string(),
            },
            traces: TracesConfig {
                url: "http://collector:4318/v1/traces".to_string(),
                exporter: ExporterOptions {
                    timeout: Some(Duration::from_secs(5)),
                    format: Some(WireFormat::Binary),
                },
                batch: BatchOptions { max_queue_size: Some(50), ..BatchOptions::default() },
            },
            metrics: MetricsConfig::new("http://collector:4318/v1/metrics"),
            logs: LogsConfig::new("http://collector:4318/v1/logs"),
            instrumentations: InstrumentationConfig {
                event_names: vec!["click".to_string()],
                ..InstrumentationConfig::default()
            },
            headers: None,
        };

        let json = serde_json::to_string(&config).expect("serialize");
        let parsed: OtelConfig = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(parsed.resource, config.resource);
        assert_eq!(parsed.traces.batch.max_queue_size, Some(50));
        assert_eq!(parsed.traces.exporter.format, Some(WireFormat::Binary));
        assert_eq!(parsed.instrumentations.event_names, vec!["click".to_string()]);
    }
}
