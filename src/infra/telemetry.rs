//! Log subscriber installation and metric names.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing::Subscriber;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer, fmt, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

pub const PAGE_CACHE_HIT_TOTAL: &str = "yatube_page_cache_hit_total";
pub const PAGE_CACHE_MISS_TOTAL: &str = "yatube_page_cache_miss_total";
pub const PAGE_CACHE_EVICT_TOTAL: &str = "yatube_page_cache_evict_total";
pub const PAGE_RENDER_MS: &str = "yatube_page_render_ms";

enum MetricKind {
    Counter,
    Histogram(Unit),
}

const METRICS: &[(&str, MetricKind, &str)] = &[
    (
        PAGE_CACHE_HIT_TOTAL,
        MetricKind::Counter,
        "Home page requests answered from the page cache.",
    ),
    (
        PAGE_CACHE_MISS_TOTAL,
        MetricKind::Counter,
        "Home page requests that had to be rendered.",
    ),
    (
        PAGE_CACHE_EVICT_TOTAL,
        MetricKind::Counter,
        "Cached pages dropped to stay within capacity.",
    ),
    (
        PAGE_RENDER_MS,
        MetricKind::Histogram(Unit::Milliseconds),
        "Time spent rendering a cacheable page on a miss.",
    ),
];

static DESCRIBED: Once = Once::new();

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    DESCRIBED.call_once(|| {
        for (name, kind, help) in METRICS {
            match kind {
                MetricKind::Counter => describe_counter!(*name, Unit::Count, *help),
                MetricKind::Histogram(unit) => describe_histogram!(*name, *unit, *help),
            }
        }
    });

    let filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default())
        .with(output_layer(logging.format))
        .try_init()
        .map_err(|err| InfraError::Logging(err.to_string()))
}

fn output_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    }
}
