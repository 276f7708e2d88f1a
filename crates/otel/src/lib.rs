#![doc = include_str!("../README.md")]

//! # Telemetry
//!
//! One `init` call wires the OpenTelemetry SDK into three OTLP-over-HTTP
//! pipelines sharing a single resource identity, registers the application
//! instrumentations, and exposes per-signal accessors that stay safe to
//! call before initialization.

#![forbid(unsafe_code)]

pub mod config;
mod error;
pub mod init;
pub mod instrument;
pub mod logs;
pub mod metrics;
pub mod trace;

pub use opentelemetry::logs::Severity;
pub use {opentelemetry, opentelemetry_sdk};

pub use self::error::{Error, Result};
pub use self::init::{
    Otel, get_logger, get_meter, get_tracer, init, instrumentations, logger_provider,
    meter_provider, shutdown, tracer_provider,
};
pub use self::instrument::{
    HttpInstrumentation, Instrumentations, InteractionInstrumentation, RequestGuard,
    RequestTiming,
};
pub use self::logs::init_tracing;
pub use self::metrics::ObservedExporter;
