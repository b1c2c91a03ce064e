use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

pub(crate) const METRIC_BACKEND_ERROR_TOTAL: &str = "cccache_backend_error_total";
pub(crate) const METRIC_BACKEND_REQUEST_MS: &str = "cccache_backend_request_ms";

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            crate::cache::METRIC_CACHE_HIT_TOTAL,
            Unit::Count,
            "Total number of document cache hits."
        );
        describe_counter!(
            crate::cache::METRIC_CACHE_MISS_TOTAL,
            Unit::Count,
            "Total number of document cache misses, including failed lookups."
        );
        describe_counter!(
            crate::cache::METRIC_CACHE_ERROR_TOTAL,
            Unit::Count,
            "Total number of cache store failures absorbed by the adapter, by operation."
        );
        describe_counter!(
            METRIC_BACKEND_ERROR_TOTAL,
            Unit::Count,
            "Total number of failed document backend calls, by error kind."
        );
        describe_histogram!(
            METRIC_BACKEND_REQUEST_MS,
            Unit::Milliseconds,
            "Document backend request latency in milliseconds."
        );
    });
}
