//! # Initialization
//!
//! [`init`] consumes the configuration once and builds the three pipelines
//! in signal order (resource, traces, metrics, logs), then registers the
//! instrumentation set. Tracer and meter providers are handed to
//! `opentelemetry::global`; the logger provider and instrumentations live in
//! the crate's own registry. A second `init` replaces the registration
//! (last-writer-wins) and shuts the superseded providers down.

use std::borrow::Cow;
use std::sync::{OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use opentelemetry::global::BoxedTracer;
use opentelemetry::logs::LoggerProvider as _;
use opentelemetry::metrics::Meter;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{InstrumentationScope, KeyValue, global};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::logs::{SdkLogger, SdkLoggerProvider};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_semantic_conventions::attribute::SERVICE_VERSION;

use crate::config::{OtelConfig, ResourceAttributes};
use crate::instrument::Instrumentations;
use crate::{Error, Result, logs, metrics, trace};

static ACTIVE: RwLock<Option<Otel>> = RwLock::new(None);

/// Live handles produced by [`init`], mirroring the global registration.
///
/// Cloning is cheap; all clones share the same providers. Dropping the
/// handle shuts nothing down; teardown is explicit via [`shutdown`].
#[derive(Clone, Debug)]
pub struct Otel {
    resource: Resource,
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
    logger_provider: SdkLoggerProvider,
    instrumentations: Instrumentations,
}

impl Otel {
    /// Resource attributes shared by all three pipelines.
    #[must_use]
    pub const fn resource(&self) -> &Resource {
        &self.resource
    }

    /// The trace pipeline's provider.
    #[must_use]
    pub const fn tracer_provider(&self) -> &SdkTracerProvider {
        &self.tracer_provider
    }

    /// The metric pipeline's provider.
    #[must_use]
    pub const fn meter_provider(&self) -> &SdkMeterProvider {
        &self.meter_provider
    }

    /// The log pipeline's provider.
    #[must_use]
    pub const fn logger_provider(&self) -> &SdkLoggerProvider {
        &self.logger_provider
    }

    /// The registered instrumentation set.
    #[must_use]
    pub const fn instrumentations(&self) -> &Instrumentations {
        &self.instrumentations
    }

    /// Flush pending telemetry on all three pipelines without shutting
    /// down. All pipelines are attempted; the first error is returned.
    pub fn force_flush(&self) -> Result<()> {
        let results = [
            self.tracer_provider.force_flush(),
            self.meter_provider.force_flush(),
            self.logger_provider.force_flush(),
        ];
        for result in results {
            result?;
        }
        Ok(())
    }

    fn shutdown_providers(&self) -> Result<()> {
        let results = [
            self.tracer_provider.shutdown(),
            self.meter_provider.shutdown(),
            self.logger_provider.shutdown(),
        ];
        for result in results {
            result?;
        }
        Ok(())
    }
}

/// Initialize the telemetry pipelines and register them process-wide.
///
/// Returns the live handles; the same handles remain reachable through the
/// module-level accessors. Export failures after this point are the
/// exporters' own concern and never surface here.
///
/// # Errors
///
/// Returns an error when an endpoint is invalid or an exporter cannot be
/// constructed. Nothing is registered on error.
pub fn init(config: OtelConfig) -> Result<Otel> {
    let started = SystemTime::now();

    let resource = build_resource(&config.resource);
    let tracer_provider = trace::build(&config, &resource)?;
    let meter_provider = metrics::build(&config, &resource)?;
    let logger_provider = logs::build(&config, &resource)?;

    // registration only happens once every pipeline has built
    global::set_tracer_provider(tracer_provider.clone());
    global::set_text_map_propagator(TraceContextPropagator::new());
    global::set_meter_provider(meter_provider.clone());

    let instrumentations = Instrumentations::register(&config.instrumentations, started);

    let otel = Otel {
        resource,
        tracer_provider,
        meter_provider,
        logger_provider,
        instrumentations,
    };

    let previous = write_active().replace(otel.clone());
    if let Some(previous) = previous {
        tracing::warn!("replacing an existing telemetry registration");
        if let Err(error) = previous.shutdown_providers() {
            tracing::warn!("superseded providers did not shut down cleanly: {error}");
        }
    }

    tracing::info!(
        service = config.resource.name,
        version = config.resource.version,
        "telemetry initialized"
    );

    Ok(otel)
}

/// Flush and shut down the registered pipelines, clearing the registration.
///
/// Accessors revert to their pre-init defaults afterwards, although the
/// `opentelemetry` globals keep handing out the shut-down tracer and meter
/// providers. A no-op when nothing is registered.
///
/// # Errors
///
/// Returns the first shutdown failure after attempting all three pipelines.
pub fn shutdown() -> Result<()> {
    let previous = write_active().take();
    match previous {
        Some(otel) => otel.shutdown_providers(),
        None => Ok(()),
    }
}

/// Tracer scoped to `name`/`version` from the global registry.
///
/// Before [`init`] this is the registry's no-op default.
pub fn get_tracer(name: impl Into<Cow<'static, str>>, version: Option<&str>) -> BoxedTracer {
    global::tracer_provider().tracer_with_scope(scope(name, version))
}

/// Meter scoped to `name`/`version` from the global registry.
///
/// Before [`init`] this is the registry's no-op default.
pub fn get_meter(name: impl Into<Cow<'static, str>>, version: Option<&str>) -> Meter {
    global::meter_with_scope(scope(name, version))
}

/// Logger scoped to `name`/`version` from the facade's registry.
///
/// Before [`init`] this comes from a processor-less provider: records are
/// accepted and dropped.
pub fn get_logger(name: impl Into<Cow<'static, str>>, version: Option<&str>) -> SdkLogger {
    let scope = scope(name, version);
    match &*read_active() {
        Some(otel) => otel.logger_provider.logger_with_scope(scope),
        None => default_logger_provider().logger_with_scope(scope),
    }
}

/// The registered tracer provider, if any.
#[must_use]
pub fn tracer_provider() -> Option<SdkTracerProvider> {
    read_active().as_ref().map(|otel| otel.tracer_provider.clone())
}

/// The registered meter provider, if any.
#[must_use]
pub fn meter_provider() -> Option<SdkMeterProvider> {
    read_active().as_ref().map(|otel| otel.meter_provider.clone())
}

/// The registered logger provider, if any.
#[must_use]
pub fn logger_provider() -> Option<SdkLoggerProvider> {
    read_active().as_ref().map(|otel| otel.logger_provider.clone())
}

/// The registered instrumentation set, if any.
#[must_use]
pub fn instrumentations() -> Option<Instrumentations> {
    read_active().as_ref().map(|otel| otel.instrumentations.clone())
}

/// Shared resource descriptor; identical for all three pipelines.
fn build_resource(attributes: &ResourceAttributes) -> Resource {
    Resource::builder()
        .with_service_name(attributes.name.clone())
        .with_attribute(KeyValue::new(SERVICE_VERSION, attributes.version.clone()))
        .build()
}

fn scope(name: impl Into<Cow<'static, str>>, version: Option<&str>) -> InstrumentationScope {
    let builder = InstrumentationScope::builder(name);
    match version {
        Some(version) => builder.with_version(version.to_string()).build(),
        None => builder.build(),
    }
}

/// Validate that a signal endpoint is an absolute URI.
pub(crate) fn check_endpoint(signal: &'static str, url: &str) -> Result<()> {
    let uri: http::Uri = url
        .parse()
        .map_err(|source| Error::InvalidEndpoint { signal, url: url.to_string(), source })?;
    if uri.scheme().is_none() || uri.authority().is_none() {
        return Err(Error::IncompleteEndpoint { signal, url: url.to_string() });
    }
    Ok(())
}

fn default_logger_provider() -> &'static SdkLoggerProvider {
    static DEFAULT: OnceLock<SdkLoggerProvider> = OnceLock::new();
    DEFAULT.get_or_init(|| SdkLoggerProvider::builder().build())
}

fn read_active() -> RwLockReadGuard<'static, Option<Otel>> {
    ACTIVE.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_active() -> RwLockWriteGuard<'static, Option<Otel>> {
    ACTIVE.write().unwrap_or_else(PoisonError::into_inner)
}
