//! The `/metrics` scrape endpoint
//!
//! Serializes a [`prometheus::Registry`] in the standard text exposition
//! format, optionally behind an HTTP Basic Authentication gate. The gate
//! compares credentials in constant time so response timing does not leak
//! where a guess diverges from the configured secret.

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use prometheus::{Encoder, Registry, TextEncoder};
use subtle::ConstantTimeEq;
use tracing::error;

/// Exact-match credentials protecting the metrics endpoint.
///
/// The gate only engages when both username and password are non-empty;
/// otherwise the endpoint is served unauthenticated.
#[derive(Clone)]
pub struct BasicAuth {
    username: String,
    password: String,
}

impl BasicAuth {
    /// Create a credential pair for [`metrics_router_with_auth`].
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn is_enabled(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    fn verify(&self, headers: &HeaderMap) -> bool {
        let Some(value) = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
        else {
            return false;
        };
        let Some(encoded) = value.strip_prefix("Basic ") else {
            return false;
        };
        let Ok(decoded) = BASE64.decode(encoded.trim()) else {
            return false;
        };
        let Ok(credentials) = String::from_utf8(decoded) else {
            return false;
        };
        let Some((username, password)) = credentials.split_once(':') else {
            return false;
        };

        let username_ok = constant_time_eq(username.as_bytes(), self.username.as_bytes());
        let password_ok = constant_time_eq(password.as_bytes(), self.password.as_bytes());
        username_ok & password_ok
    }
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never prints the password.
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Constant-time byte comparison. A plain `==` short-circuits on the first
/// mismatching byte, which leaks how much of a secret matched.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// A router exposing `GET /metrics` for the given registry.
///
/// Merge it into your application router:
///
/// ```ignore
/// let app = Router::new()
///     .route("/", get(handler))
///     .merge(metrics_router(registry));
/// ```
pub fn metrics_router(registry: Registry) -> Router {
    build_router(registry, None)
}

/// Like [`metrics_router`] but requires matching Basic-Auth credentials.
/// Mismatch or absence yields `401 Unauthorized` with a
/// `WWW-Authenticate` challenge.
pub fn metrics_router_with_auth(registry: Registry, auth: BasicAuth) -> Router {
    build_router(registry, Some(auth))
}

/// Convenience router over the Prometheus default registry, matching the
/// process-wide default [`MetricsCollection`](crate::MetricsCollection).
pub fn default_metrics_router() -> Router {
    build_router(prometheus::default_registry().clone(), None)
}

fn build_router(registry: Registry, auth: Option<BasicAuth>) -> Router {
    Router::new().route(
        "/metrics",
        get(move |headers: HeaderMap| serve_metrics(registry.clone(), auth.clone(), headers)),
    )
}

async fn serve_metrics(
    registry: Registry,
    auth: Option<BasicAuth>,
    headers: HeaderMap,
) -> Response {
    if let Some(auth) = auth.as_ref().filter(|auth| auth.is_enabled()) {
        if !auth.verify(&headers) {
            return (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"restricted\"")],
                "Unauthorized",
            )
                .into_response();
        }
    }

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&registry.gather(), &mut buffer) {
        error!(error = %err, "failed to encode metrics for scraping");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    ([(header::CONTENT_TYPE, encoder.format_type())], buffer).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_basic(username: &str, password: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let encoded = BASE64.encode(format!("{username}:{password}"));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {encoded}")).unwrap(),
        );
        headers
    }

    #[test]
    fn verify_accepts_matching_credentials() {
        let auth = BasicAuth::new("prometheus", "s3cr3t");
        assert!(auth.verify(&headers_with_basic("prometheus", "s3cr3t")));
    }

    #[test]
    fn verify_rejects_wrong_credentials() {
        let auth = BasicAuth::new("prometheus", "s3cr3t");
        assert!(!auth.verify(&headers_with_basic("prometheus", "wrong")));
        assert!(!auth.verify(&headers_with_basic("intruder", "s3cr3t")));
    }

    #[test]
    fn verify_rejects_missing_or_malformed_header() {
        let auth = BasicAuth::new("prometheus", "s3cr3t");
        assert!(!auth.verify(&HeaderMap::new()));

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer token"),
        );
        assert!(!auth.verify(&headers));

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic not-base64!!"),
        );
        assert!(!auth.verify(&headers));
    }

    #[test]
    fn empty_credentials_disable_the_gate() {
        assert!(!BasicAuth::new("", "password").is_enabled());
        assert!(!BasicAuth::new("user", "").is_enabled());
        assert!(BasicAuth::new("user", "password").is_enabled());
    }

    #[test]
    fn debug_never_shows_the_password() {
        let auth = BasicAuth::new("user", "hunter2");
        let rendered = format!("{auth:?}");
        assert!(!rendered.contains("hunter2"));
    }
}
