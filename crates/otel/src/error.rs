//! Errors

use thiserror::Error;

/// Result type used across the crate.
pub type Result<T> = anyhow::Result<T, Error>;

/// Errors surfaced while building or tearing down the telemetry pipelines.
///
/// Export-time failures never appear here; they stay inside the wrapped
/// exporters and, for metrics, surface through the export-result hook.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A signal endpoint is not a parseable URI.
    #[error("invalid {signal} endpoint {url:?}: {source}")]
    InvalidEndpoint {
        /// Signal the endpoint was configured for.
        signal: &'static str,
        /// The offending URL.
        url: String,
        /// Parse failure reported by [`http::Uri`].
        #[source]
        source: http::uri::InvalidUri,
    },

    /// A signal endpoint parses but is missing its scheme or host.
    #[error("incomplete {signal} endpoint {url:?}: scheme and host are required")]
    IncompleteEndpoint {
        /// Signal the endpoint was configured for.
        signal: &'static str,
        /// The offending URL.
        url: String,
    },

    /// An OTLP exporter could not be constructed.
    #[error(transparent)]
    Exporter(#[from] opentelemetry_otlp::ExporterBuildError),

    /// The SDK reported a flush or shutdown failure.
    #[error(transparent)]
    Sdk(#[from] opentelemetry_sdk::error::OTelSdkError),

    /// A global `tracing` subscriber is already installed.
    #[error(transparent)]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn endpoint_errors_name_the_signal() {
        let source = "not a uri".parse::<http::Uri>().expect_err("must not parse");
        let err = Error::InvalidEndpoint {
            signal: "traces",
            url: "not a uri".to_string(),
            source,
        };
        assert!(err.to_string().starts_with("invalid traces endpoint"));

        let err = Error::IncompleteEndpoint { signal: "logs", url: "/v1/logs".to_string() };
        assert_eq!(
            err.to_string(),
            "incomplete logs endpoint \"/v1/logs\": scheme and host are required"
        );
    }
}
