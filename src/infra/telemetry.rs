use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the global tracing subscriber and register metric descriptions.
///
/// `RUST_LOG` directives take precedence over the configured level.
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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "nuxtpress_cache_hit_total",
            Unit::Count,
            "Read-through cache lookups answered from the key-value store."
        );
        describe_counter!(
            "nuxtpress_cache_miss_total",
            Unit::Count,
            "Read-through cache lookups that fell back to the database."
        );
        describe_counter!(
            "nuxtpress_cache_invalidation_total",
            Unit::Count,
            "Cache keys deleted after post writes."
        );
        describe_counter!(
            "nuxtpress_cache_invalidation_failure_total",
            Unit::Count,
            "Cache key deletions that failed after post writes."
        );
        describe_counter!(
            "nuxtpress_auth_login_failure_total",
            Unit::Count,
            "Login attempts rejected for a wrong password."
        );
    });
}
