//! # Telemetry Features
//!
//! Structured logging via `tracing` is always on: spans and events are
//! printed to the console through `tracing_subscriber::fmt`, filtered with
//! the standard `RUST_LOG` environment variable (default level: `info`).
//!
//! Submission metrics are optional and exported via OpenTelemetry.
//!
//! ## Feature matrix
//!
//! - `metrics`: Enables OpenTelemetry counters for the submission path.
//! - `stdout`: Enables the stdout metric exporter (requires `metrics`).
//!
//! ## Example usage
//!
//! Enable metrics with local stdout export:
//!
//! ```bash
//! cargo run --features metrics,stdout
//! ```

// Disallow using `stdout` without `metrics`
#[cfg(all(feature = "stdout", not(feature = "metrics")))]
compile_error!("The 'stdout' feature requires the 'metrics' feature to be enabled.");

// Core imports - always needed
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

// Metrics-specific imports
#[cfg(feature = "metrics")]
use opentelemetry::InstrumentationScope;
#[cfg(feature = "metrics")]
use opentelemetry::metrics::{Counter, Meter};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::Resource;
#[cfg(feature = "metrics")]
use opentelemetry_sdk::metrics as sdkmetrics;
#[cfg(feature = "metrics")]
use std::sync::OnceLock;

pub struct TelemetryProviders {
    #[cfg(feature = "metrics")]
    pub meter_provider: sdkmetrics::SdkMeterProvider,
}

pub fn init_telemetry() -> anyhow::Result<TelemetryProviders> {
    // Always subscribe to standard tracing logs printed to the console via
    // `tracing_subscriber::fmt`.
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_file(true)
                .pretty(),
        );

    #[cfg(feature = "metrics")]
    let meter_provider = {
        let meter_provider = init_metrics();
        opentelemetry::global::set_meter_provider(meter_provider.clone());

        let scope = InstrumentationScope::builder("stoker")
            .with_version(env!("CARGO_PKG_VERSION"))
            .build();
        let meter = opentelemetry::global::meter_with_scope(scope);
        init_metric_handles(meter);

        meter_provider
    };

    registry.init();

    Ok(TelemetryProviders {
        #[cfg(feature = "metrics")]
        meter_provider,
    })
}

#[cfg(feature = "metrics")]
fn resource() -> Resource {
    Resource::builder().with_service_name("stoker").build()
}

#[cfg(feature = "metrics")]
fn init_metrics() -> sdkmetrics::SdkMeterProvider {
    let builder = sdkmetrics::SdkMeterProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        use opentelemetry_stdout::MetricExporter;
        let exporter = MetricExporter::default();
        let reader = sdkmetrics::PeriodicReader::builder(exporter)
            .with_interval(std::time::Duration::from_secs(5))
            .build();

        builder.with_reader(reader)
    };

    builder.build()
}

// Metric handles - only compiled when metrics feature is enabled
#[cfg(feature = "metrics")]
static REQUESTS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static TASKS_QUEUED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static TASKS_REJECTED: OnceLock<Counter<u64>> = OnceLock::new();

#[cfg(feature = "metrics")]
fn init_metric_handles(meter: Meter) {
    let _ = REQUESTS.set(
        meter
            .u64_counter("requests")
            .with_description("Total task submission requests")
            .build(),
    );

    let _ = TASKS_QUEUED.set(
        meter
            .u64_counter("tasks_queued")
            .with_description("Submissions admitted to the queue")
            .build(),
    );

    let _ = TASKS_REJECTED.set(
        meter
            .u64_counter("tasks_rejected")
            .with_description("Submissions rejected with backpressure")
            .build(),
    );
}

// Convenience functions that compile to no-ops when metrics are disabled
#[cfg(feature = "metrics")]
pub fn increment_requests() {
    if let Some(counter) = REQUESTS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_requests() {}

#[cfg(feature = "metrics")]
pub fn increment_tasks_queued() {
    if let Some(counter) = TASKS_QUEUED.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_tasks_queued() {}

#[cfg(feature = "metrics")]
pub fn increment_tasks_rejected() {
    if let Some(counter) = TASKS_REJECTED.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_tasks_rejected() {}
