//! Recording policy for the metrics middleware
//!
//! Provides a builder-pattern configuration for everything the middleware
//! measures, aggregates, and filters. A policy is built once when the
//! middleware is installed and is read-only afterwards, so it can be shared
//! freely across concurrent requests.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Decides whether a request is excluded from metrics collection.
///
/// Receives the resolved route pattern and the raw URL path; returns `true`
/// to skip recording entirely.
pub type PathFilter = Arc<dyn Fn(&str, &str) -> bool + Send + Sync>;

/// Maps a `(route, path, status_code)` triple to the `path` label value used
/// by all four collectors.
pub type PathAggregator = Arc<dyn Fn(&str, &str, u16) -> String + Send + Sync>;

/// Recording policy applied to every instrumented request.
///
/// Immutable after construction. Build one with [`MetricsPolicy::builder`];
/// later builder calls override earlier ones on the same field.
///
/// # Defaults
///
/// - request size, response size, and duration are all recorded
/// - status codes are labeled with their literal numeric value
/// - no routes are filtered
/// - unmatched routes are handled and grouped under a single
///   `"/unmatched/*"` label
///
/// # Example
///
/// ```
/// use axum_http_metrics::MetricsPolicy;
///
/// let policy = MetricsPolicy::builder()
///     .aggregate_status_code(true)
///     .filter_routes(["/healthz", "/readyz"])
///     .build();
/// ```
#[derive(Clone)]
pub struct MetricsPolicy {
    pub(crate) record_request_size: bool,
    pub(crate) record_response_size: bool,
    pub(crate) record_duration: bool,
    pub(crate) aggregate_status_code: bool,
    pub(crate) filter_path: PathFilter,
    pub(crate) path_aggregator: PathAggregator,
    pub(crate) handle_unmatched_routes: bool,
    pub(crate) group_unmatched_routes: bool,
}

impl Default for MetricsPolicy {
    fn default() -> Self {
        Self {
            record_request_size: true,
            record_response_size: true,
            record_duration: true,
            aggregate_status_code: false,
            filter_path: Arc::new(|_, _| false),
            path_aggregator: Arc::new(default_path_aggregator),
            handle_unmatched_routes: true,
            group_unmatched_routes: true,
        }
    }
}

impl MetricsPolicy {
    /// Create a new builder initialized with the defaults above.
    pub fn builder() -> MetricsPolicyBuilder {
        MetricsPolicyBuilder::default()
    }
}

impl fmt::Debug for MetricsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsPolicy")
            .field("record_request_size", &self.record_request_size)
            .field("record_response_size", &self.record_response_size)
            .field("record_duration", &self.record_duration)
            .field("aggregate_status_code", &self.aggregate_status_code)
            .field("handle_unmatched_routes", &self.handle_unmatched_routes)
            .field("group_unmatched_routes", &self.group_unmatched_routes)
            .finish_non_exhaustive()
    }
}

/// Default `path` label: the route pattern when one matched, otherwise a
/// status-class bucket so unmatched requests cannot blow up cardinality.
fn default_path_aggregator(route: &str, _path: &str, status_code: u16) -> String {
    if route.is_empty() {
        return match status_code {
            400..=499 => "path_4xx".to_string(),
            500..=599 => "path_5xx".to_string(),
            _ => "missing_route".to_string(),
        };
    }
    route.to_string()
}

/// Builder for [`MetricsPolicy`].
#[derive(Clone, Default)]
pub struct MetricsPolicyBuilder {
    policy: MetricsPolicy,
}

impl MetricsPolicyBuilder {
    /// Enable or disable the `http_request_size_bytes` histogram.
    pub fn record_request_size(mut self, record: bool) -> Self {
        self.policy.record_request_size = record;
        self
    }

    /// Enable or disable the `http_response_size_bytes` histogram.
    pub fn record_response_size(mut self, record: bool) -> Self {
        self.policy.record_response_size = record;
        self
    }

    /// Enable or disable the `http_request_duration_seconds` histogram.
    pub fn record_duration(mut self, record: bool) -> Self {
        self.policy.record_duration = record;
        self
    }

    /// When enabled, bucket individual status codes into class labels such
    /// as `"2xx"` and `"5xx"`, trading alerting granularity for lower
    /// cardinality. Disabled by default.
    pub fn aggregate_status_code(mut self, aggregate: bool) -> Self {
        self.policy.aggregate_status_code = aggregate;
        self
    }

    /// Install a custom filter that decides, per request, whether metrics
    /// are skipped. The filter receives the resolved route pattern and the
    /// raw URL path and returns `true` to exclude the request.
    ///
    /// Overwrites any filter installed earlier, including one from
    /// [`filter_routes`](Self::filter_routes).
    pub fn filter_path<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str, &str) -> bool + Send + Sync + 'static,
    {
        self.policy.filter_path = Arc::new(filter);
        self
    }

    /// Exclude a list of exact route patterns from metrics collection.
    ///
    /// The match is performed against the registered pattern (for example
    /// `"/health"`), not the raw request URL. This installs a path filter,
    /// so it overwrites any predicate set via
    /// [`filter_path`](Self::filter_path) and vice versa.
    pub fn filter_routes<I, S>(self, routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let filtered: HashSet<String> = routes.into_iter().map(Into::into).collect();
        self.filter_path(move |route, _path| filtered.contains(route))
    }

    /// Install a custom mapping from `(route, path, status_code)` to the
    /// `path` label value. Use this to normalize dynamic segments the router
    /// does not capture as named parameters, or to further reduce
    /// cardinality.
    pub fn path_aggregator<F>(mut self, aggregator: F) -> Self
    where
        F: Fn(&str, &str, u16) -> String + Send + Sync + 'static,
    {
        self.policy.path_aggregator = Arc::new(aggregator);
        self
    }

    /// Control whether requests that match no registered route receive
    /// special treatment. When disabled, the raw request path is used
    /// verbatim as the route label and no cardinality control is applied.
    /// Enabled by default.
    pub fn handle_unmatched_routes(mut self, enabled: bool) -> Self {
        self.policy.handle_unmatched_routes = enabled;
        self
    }

    /// Control whether all unmatched routes collapse into the single
    /// `"/unmatched/*"` label (`true`, the default) or are recorded
    /// individually as `"/unmatched<original-path>"` (`false`). Grouping is
    /// the safer choice because random or attacker-supplied paths otherwise
    /// create one time series each.
    pub fn group_unmatched_routes(mut self, enabled: bool) -> Self {
        self.policy.group_unmatched_routes = enabled;
        self
    }

    /// Finish building the policy.
    pub fn build(self) -> MetricsPolicy {
        self.policy
    }
}
