//! # axum-http-metrics
//!
//! Prometheus request metrics middleware for [axum] with cardinality
//! control.
//!
//! Every instrumented request updates four collectors, all labeled
//! `{status_code, method, path}`:
//!
//! - `http_requests_total` (counter)
//! - `http_request_duration_seconds` (histogram)
//! - `http_request_size_bytes` (histogram)
//! - `http_response_size_bytes` (histogram)
//!
//! The `path` label is derived from the router's matched pattern (for
//! example `/users/:id`), never the raw URL, and unmatched routes are
//! collapsed into a single `"/unmatched/*"` label by default, so adversarial
//! or highly dynamic paths cannot explode the label set.
//!
//! ## Quick start
//!
//! ```ignore
//! use axum::{routing::get, Router};
//! use axum_http_metrics::{default_metrics_router, MeteredRouter, MetricsPolicy};
//!
//! let policy = MetricsPolicy::builder()
//!     .filter_routes(["/healthz", "/metrics"])
//!     .aggregate_status_code(true)
//!     .build();
//!
//! let app = Router::new()
//!     .route("/users/:id", get(|| async { "hello" }))
//!     .merge(default_metrics_router())
//!     .with_http_metrics(policy);
//! ```
//!
//! ## Independent collections
//!
//! Multiple [`MetricsCollection`]s can coexist, each bound to its own
//! [`prometheus::Registry`]:
//!
//! ```ignore
//! use axum_http_metrics::{metrics_router_with_auth, BasicAuth, MetricsCollection};
//! use prometheus::Registry;
//!
//! let registry = Registry::new();
//! let collection = MetricsCollection::builder()
//!     .registry(registry.clone())
//!     .metric_prefix("myservice")
//!     .build()?;
//!
//! let app = Router::new()
//!     .merge(metrics_router_with_auth(registry, BasicAuth::new("scraper", "s3cr3t")))
//!     .with_http_metrics_collection(collection, MetricsPolicy::default());
//! ```
//!
//! Telemetry is strictly best-effort: sizing never consumes the request body
//! irreversibly (unknown-length bodies are buffered and replayed for the
//! downstream handler), and no measurement failure can alter the
//! application's response.
//!
//! [axum]: https://docs.rs/axum

mod collection;
mod error;
mod exposition;
mod middleware;
mod path;
mod policy;
mod size;

pub use collection::{
    default_duration_buckets, default_size_buckets, MetricsCollection,
    MetricsCollectionBuilder, LABEL_NAMES,
};
pub use error::Error;
pub use exposition::{
    default_metrics_router, metrics_router, metrics_router_with_auth, BasicAuth,
};
pub use middleware::{track_metrics, MeteredRouter};
pub use path::{UNKNOWN_PATH, UNMATCHED_GROUP_LABEL, UNMATCHED_PREFIX};
pub use policy::{MetricsPolicy, MetricsPolicyBuilder, PathAggregator, PathFilter};
