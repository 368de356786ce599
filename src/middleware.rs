//! Per-request orchestration
//!
//! The middleware resolves the route label, applies the filter, measures the
//! request, runs the downstream handler, and records into the collectors
//! exactly once per request. Filtered routes never touch a collector.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;

use crate::collection::MetricsCollection;
use crate::path::resolve_path;
use crate::policy::MetricsPolicy;
use crate::size;

/// Record metrics for one request.
///
/// Wire this through [`axum::middleware::from_fn`], or use the
/// [`MeteredRouter`] extension trait which does so for you. The matched
/// route pattern is read from the [`MatchedPath`] request extension, so the
/// middleware must be layered on the [`Router`] that did the matching.
///
/// Duration spans from middleware entry to finalization, covering the full
/// handler latency. Finalization runs exactly once per request: on normal
/// completion it records the real status and response size, and if the
/// request future is dropped first (client disconnect, downstream panic) a
/// guard records with the last known state instead.
pub async fn track_metrics(
    collection: MetricsCollection,
    policy: MetricsPolicy,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    let matched_route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned());
    let (route, path) = resolve_path(matched_route.as_deref(), request.uri().path(), &policy);

    if (policy.filter_path)(&route, &path) {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let (parts, body) = request.into_parts();
    let (request_size, body) = if policy.record_request_size {
        size::request_size(&parts, body).await
    } else {
        (0, body)
    };
    let request = Request::from_parts(parts, body);

    let mut guard = RecordGuard::new(collection, policy, method, route, path, start, request_size);
    let response = next.run(request).await;
    guard.finish(response.status(), size::response_size(&response));
    response
}

/// Finalizes metric recording exactly once.
///
/// Armed before the downstream handler runs; disarmed by [`finish`] on the
/// normal path. If the future is dropped before a response exists, `Drop`
/// records with status 200 and response size 0, matching a response writer
/// that never reported a status.
struct RecordGuard {
    collection: MetricsCollection,
    policy: MetricsPolicy,
    method: Method,
    route: String,
    path: String,
    start: Instant,
    request_size: u64,
    recorded: bool,
}

impl RecordGuard {
    #[allow(clippy::too_many_arguments)]
    fn new(
        collection: MetricsCollection,
        policy: MetricsPolicy,
        method: Method,
        route: String,
        path: String,
        start: Instant,
        request_size: u64,
    ) -> Self {
        Self {
            collection,
            policy,
            method,
            route,
            path,
            start,
            request_size,
            recorded: false,
        }
    }

    fn finish(&mut self, status: StatusCode, response_size: u64) {
        self.record(status, response_size);
    }

    fn record(&mut self, status: StatusCode, response_size: u64) {
        if self.recorded {
            return;
        }
        self.recorded = true;

        // The label tuple is computed once here so all four collectors see
        // identical labels.
        let path_label = (self.policy.path_aggregator)(&self.route, &self.path, status.as_u16());
        self.collection.record(
            &self.policy,
            status,
            &self.method,
            &path_label,
            self.start.elapsed(),
            self.request_size,
            response_size,
        );
    }
}

impl Drop for RecordGuard {
    fn drop(&mut self) {
        self.record(StatusCode::OK, 0);
    }
}

/// Extension trait that instruments an axum [`Router`] with request metrics.
///
/// # Example
///
/// ```ignore
/// use axum::{routing::get, Router};
/// use axum_http_metrics::{MeteredRouter, MetricsPolicy};
///
/// let app = Router::new()
///     .route("/users/:id", get(|| async { "hello" }))
///     .with_http_metrics(MetricsPolicy::default());
/// ```
pub trait MeteredRouter {
    /// Instrument every request (including unmatched ones) using the
    /// process-wide default [`MetricsCollection`].
    fn with_http_metrics(self, policy: MetricsPolicy) -> Self;

    /// Like [`with_http_metrics`](Self::with_http_metrics) but records into
    /// the provided collection. Use this for independent metric namespaces
    /// or custom registries.
    fn with_http_metrics_collection(
        self,
        collection: MetricsCollection,
        policy: MetricsPolicy,
    ) -> Self;
}

impl<S> MeteredRouter for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_http_metrics(self, policy: MetricsPolicy) -> Self {
        self.with_http_metrics_collection(MetricsCollection::global().clone(), policy)
    }

    fn with_http_metrics_collection(
        self,
        collection: MetricsCollection,
        policy: MetricsPolicy,
    ) -> Self {
        self.layer(middleware::from_fn(move |request: Request, next: Next| {
            track_metrics(collection.clone(), policy.clone(), request, next)
        }))
    }
}
