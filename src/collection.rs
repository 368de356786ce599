//! The four Prometheus collectors the middleware records into
//!
//! One counter plus three histograms, all keyed by the
//! `{status_code, method, path}` label tuple. Collections are built once at
//! middleware setup; a process-wide default exists for the common
//! single-tenant case, while independent collections can be bound to their
//! own registries to avoid name collisions.

use std::sync::OnceLock;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use prometheus::{
    exponential_buckets, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
};

use crate::error::Error;
use crate::policy::MetricsPolicy;

/// Label names shared by all four collectors.
pub const LABEL_NAMES: [&str; 3] = ["status_code", "method", "path"];

/// Default request-latency buckets: 1 ms to ~16 s in 15 exponential steps.
pub fn default_duration_buckets() -> Vec<f64> {
    exponential_buckets(0.001, 2.0, 15).expect("static bucket parameters are valid")
}

/// Default payload-size buckets: 100 B to ~51 KB in 10 exponential steps.
pub fn default_size_buckets() -> Vec<f64> {
    exponential_buckets(100.0, 2.0, 10).expect("static bucket parameters are valid")
}

/// The collectors updated for every instrumented request.
///
/// All four use the label tuple `{status_code, method, path}`. Fields are
/// public so pre-built collectors can be inspected or swapped in through
/// [`MetricsCollection::builder`].
///
/// # Example
///
/// ```
/// use axum_http_metrics::MetricsCollection;
/// use prometheus::Registry;
///
/// let registry = Registry::new();
/// let collection = MetricsCollection::builder()
///     .registry(registry.clone())
///     .metric_prefix("myservice")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct MetricsCollection {
    /// `..._requests_total`, incremented exactly once per completed request.
    pub total_requests: IntCounterVec,
    /// `..._request_duration_seconds`.
    pub request_duration: HistogramVec,
    /// `..._request_size_bytes`.
    pub request_size: HistogramVec,
    /// `..._response_size_bytes`.
    pub response_size: HistogramVec,
}

static GLOBAL: OnceLock<MetricsCollection> = OnceLock::new();

impl MetricsCollection {
    /// Create a new builder.
    pub fn builder() -> MetricsCollectionBuilder {
        MetricsCollectionBuilder::default()
    }

    /// Process-wide default collection, registered with the Prometheus
    /// default registry on first use.
    ///
    /// Initialization is lazy and idempotent. It panics if the default
    /// metric names were already registered elsewhere; that is a setup-time
    /// programming error, not a runtime condition.
    pub fn global() -> &'static MetricsCollection {
        GLOBAL.get_or_init(|| {
            Self::builder()
                .registry(prometheus::default_registry().clone())
                .build()
                .expect("default collectors conflict with the default registry")
        })
    }

    /// Record one completed request.
    ///
    /// The counter is always incremented; each histogram observation is
    /// skipped when the corresponding policy flag is off.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn record(
        &self,
        policy: &MetricsPolicy,
        status: StatusCode,
        method: &Method,
        path_label: &str,
        elapsed: Duration,
        request_size: u64,
        response_size: u64,
    ) {
        let status = status_label(status, policy.aggregate_status_code);
        let labels = [status.as_str(), method.as_str(), path_label];

        self.total_requests.with_label_values(&labels).inc();

        if policy.record_response_size {
            self.response_size
                .with_label_values(&labels)
                .observe(response_size as f64);
        }
        if policy.record_request_size {
            self.request_size
                .with_label_values(&labels)
                .observe(request_size as f64);
        }
        if policy.record_duration {
            self.request_duration
                .with_label_values(&labels)
                .observe(elapsed.as_secs_f64());
        }
    }
}

/// Literal numeric status, or the hundreds-digit class (`"5xx"`) when
/// aggregation is on.
pub(crate) fn status_label(status: StatusCode, aggregate: bool) -> String {
    if aggregate {
        format!("{}xx", status.as_u16() / 100)
    } else {
        status.as_u16().to_string()
    }
}

/// Builder for [`MetricsCollection`].
///
/// Supports a custom registry, a uniform metric-name prefix, custom bucket
/// boundaries, and injection of individually pre-built collectors. Any
/// collector not supplied is created with defaults; everything is registered
/// by [`build`](Self::build), which fails fast on registration conflicts.
#[derive(Default)]
pub struct MetricsCollectionBuilder {
    registry: Option<Registry>,
    prefix: Option<String>,
    duration_buckets: Option<Vec<f64>>,
    size_buckets: Option<Vec<f64>>,
    total_requests: Option<IntCounterVec>,
    request_duration: Option<HistogramVec>,
    request_size: Option<HistogramVec>,
    response_size: Option<HistogramVec>,
}

impl MetricsCollectionBuilder {
    /// Register the collectors with the given registry instead of the
    /// Prometheus default registry. Useful in tests and for independent
    /// per-tenant metric namespaces.
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Prepend `prefix` to all default metric names, producing e.g.
    /// `myapp_http_requests_total`. Collectors injected explicitly keep
    /// their own names.
    pub fn metric_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Replace the bucket boundaries of the duration histogram.
    pub fn duration_buckets(mut self, buckets: Vec<f64>) -> Self {
        self.duration_buckets = Some(buckets);
        self
    }

    /// Replace the bucket boundaries of both size histograms.
    pub fn size_buckets(mut self, buckets: Vec<f64>) -> Self {
        self.size_buckets = Some(buckets);
        self
    }

    /// Use a pre-built request counter. It must carry the
    /// `{status_code, method, path}` label set.
    pub fn total_requests(mut self, counter: IntCounterVec) -> Self {
        self.total_requests = Some(counter);
        self
    }

    /// Use a pre-built duration histogram (same label set).
    pub fn request_duration(mut self, histogram: HistogramVec) -> Self {
        self.request_duration = Some(histogram);
        self
    }

    /// Use a pre-built request-size histogram (same label set).
    pub fn request_size(mut self, histogram: HistogramVec) -> Self {
        self.request_size = Some(histogram);
        self
    }

    /// Use a pre-built response-size histogram (same label set).
    pub fn response_size(mut self, histogram: HistogramVec) -> Self {
        self.response_size = Some(histogram);
        self
    }

    /// Create any missing collectors with defaults and register all four.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Collector`] when a collector cannot be constructed
    /// or registered (typically a duplicate name in the target registry).
    pub fn build(self) -> Result<MetricsCollection, Error> {
        let Self {
            registry,
            prefix,
            duration_buckets,
            size_buckets,
            total_requests,
            request_duration,
            request_size,
            response_size,
        } = self;

        let name = |base: &str| match &prefix {
            Some(prefix) => format!("{prefix}_{base}"),
            None => base.to_string(),
        };
        let duration_buckets = duration_buckets.unwrap_or_else(default_duration_buckets);
        let size_buckets = size_buckets.unwrap_or_else(default_size_buckets);

        let total_requests = match total_requests {
            Some(counter) => counter,
            None => IntCounterVec::new(
                Opts::new(name("http_requests_total"), "Number of requests."),
                &LABEL_NAMES,
            )?,
        };
        let request_duration = match request_duration {
            Some(histogram) => histogram,
            None => HistogramVec::new(
                HistogramOpts::new(
                    name("http_request_duration_seconds"),
                    "Duration of HTTP requests in seconds.",
                )
                .buckets(duration_buckets),
                &LABEL_NAMES,
            )?,
        };
        let request_size = match request_size {
            Some(histogram) => histogram,
            None => HistogramVec::new(
                HistogramOpts::new(
                    name("http_request_size_bytes"),
                    "Size of HTTP request in bytes.",
                )
                .buckets(size_buckets.clone()),
                &LABEL_NAMES,
            )?,
        };
        let response_size = match response_size {
            Some(histogram) => histogram,
            None => HistogramVec::new(
                HistogramOpts::new(
                    name("http_response_size_bytes"),
                    "Size of HTTP response in bytes.",
                )
                .buckets(size_buckets),
                &LABEL_NAMES,
            )?,
        };

        let registry = registry.unwrap_or_else(|| prometheus::default_registry().clone());
        registry.register(Box::new(total_requests.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(request_size.clone()))?;
        registry.register(Box::new(response_size.clone()))?;

        Ok(MetricsCollection {
            total_requests,
            request_duration,
            request_size,
            response_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_collection(registry: &Registry) -> MetricsCollection {
        MetricsCollection::builder()
            .registry(registry.clone())
            .build()
            .unwrap()
    }

    fn family_names(registry: &Registry) -> Vec<String> {
        registry
            .gather()
            .into_iter()
            .map(|family| family.get_name().to_string())
            .collect()
    }

    #[test]
    fn builds_all_four_collectors_with_default_names() {
        let registry = Registry::new();
        let collection = test_collection(&registry);

        let labels = ["200", "GET", "/ping"];
        collection.total_requests.with_label_values(&labels).inc();
        collection
            .request_duration
            .with_label_values(&labels)
            .observe(0.01);
        collection
            .request_size
            .with_label_values(&labels)
            .observe(128.0);
        collection
            .response_size
            .with_label_values(&labels)
            .observe(256.0);

        let names = family_names(&registry);
        for expected in [
            "http_requests_total",
            "http_request_duration_seconds",
            "http_request_size_bytes",
            "http_response_size_bytes",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
    }

    #[test]
    fn metric_prefix_applies_to_all_names() {
        let registry = Registry::new();
        let collection = MetricsCollection::builder()
            .registry(registry.clone())
            .metric_prefix("myapp")
            .build()
            .unwrap();

        collection
            .total_requests
            .with_label_values(&["200", "GET", "/"])
            .inc();
        let names = family_names(&registry);
        assert!(names.iter().any(|n| n == "myapp_http_requests_total"));
    }

    #[test]
    fn duplicate_registration_fails_fast() {
        let registry = Registry::new();
        let _first = test_collection(&registry);
        let second = MetricsCollection::builder()
            .registry(registry.clone())
            .build();
        assert!(second.is_err());
    }

    #[test]
    fn injected_counter_is_used_verbatim() {
        let registry = Registry::new();
        let counter = IntCounterVec::new(
            Opts::new("custom_requests_total", "custom"),
            &LABEL_NAMES,
        )
        .unwrap();

        let collection = MetricsCollection::builder()
            .registry(registry.clone())
            .total_requests(counter.clone())
            .build()
            .unwrap();

        collection
            .total_requests
            .with_label_values(&["200", "GET", "/"])
            .inc();
        assert_eq!(counter.with_label_values(&["200", "GET", "/"]).get(), 1);
        assert!(family_names(&registry).iter().any(|n| n == "custom_requests_total"));
    }

    #[test]
    fn custom_buckets_are_accepted() {
        let registry = Registry::new();
        let collection = MetricsCollection::builder()
            .registry(registry.clone())
            .duration_buckets(vec![0.01, 0.1, 1.0])
            .size_buckets(vec![512.0, 1024.0, 4096.0])
            .build()
            .unwrap();

        collection
            .request_duration
            .with_label_values(&["200", "GET", "/"])
            .observe(0.05);
    }

    #[test]
    fn record_increments_counter_and_honors_flags() {
        let registry = Registry::new();
        let collection = test_collection(&registry);
        let policy = MetricsPolicy::builder()
            .record_request_size(false)
            .record_response_size(false)
            .build();

        collection.record(
            &policy,
            StatusCode::OK,
            &Method::GET,
            "/ping",
            Duration::from_millis(5),
            100,
            200,
        );

        let labels = ["200", "GET", "/ping"];
        assert_eq!(collection.total_requests.with_label_values(&labels).get(), 1);
        assert_eq!(
            collection
                .request_size
                .with_label_values(&labels)
                .get_sample_count(),
            0
        );
        assert_eq!(
            collection
                .response_size
                .with_label_values(&labels)
                .get_sample_count(),
            0
        );
        assert_eq!(
            collection
                .request_duration
                .with_label_values(&labels)
                .get_sample_count(),
            1
        );
    }

    #[test]
    fn status_label_aggregation_is_idempotent_per_class() {
        assert_eq!(status_label(StatusCode::CREATED, true), "2xx");
        assert_eq!(status_label(StatusCode::NO_CONTENT, true), "2xx");
        assert_eq!(status_label(StatusCode::INTERNAL_SERVER_ERROR, true), "5xx");
        assert_eq!(status_label(StatusCode::NOT_FOUND, false), "404");
    }

    #[test]
    fn default_buckets_have_documented_shape() {
        let duration = default_duration_buckets();
        assert_eq!(duration.len(), 15);
        assert!((duration[0] - 0.001).abs() < f64::EPSILON);

        let size = default_size_buckets();
        assert_eq!(size.len(), 10);
        assert!((size[0] - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn global_collection_is_initialized_once() {
        let first = MetricsCollection::global();
        let second = MetricsCollection::global();
        assert!(std::ptr::eq(first, second));
    }
}
