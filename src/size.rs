//! Best-effort request and response size measurement
//!
//! Sizing must never disturb the byte stream the application handler sees:
//! when the body has to be read to be measured, it is buffered and handed
//! back as a fresh body over the same bytes. Measurement failures degrade to
//! a zero observation instead of failing the request.

use axum::body::{to_bytes, Body};
use axum::http::header;
use axum::http::request::Parts;
use axum::response::Response;
use tracing::warn;

/// Estimate the size of an incoming request in bytes.
///
/// The declared `Content-Length` is preferred when present; the body is then
/// never touched and the estimate equals the declared length exactly. When
/// the length is unknown (chunked/streaming transfer), the request line and
/// headers are counted explicitly and the body is buffered through memory to
/// measure it. The returned [`Body`] replays the buffered bytes so the
/// downstream handler still reads the full original body.
///
/// If buffering fails, the estimate is 0 and the request proceeds with
/// whatever could be salvaged; telemetry never fails the request it
/// instruments.
pub(crate) async fn request_size(parts: &Parts, body: Body) -> (u64, Body) {
    if let Some(declared) = declared_content_length(parts) {
        return (declared, body);
    }

    let envelope = envelope_size(parts);
    match to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            let total = envelope + bytes.len() as u64;
            (total, Body::from(bytes))
        }
        Err(err) => {
            warn!(error = %err, "failed to buffer request body for size estimation");
            (0, Body::empty())
        }
    }
}

/// Size of the response already produced by the downstream handler.
///
/// Fixed bodies report their exact size; streaming bodies fall back to the
/// `Content-Length` header when one was set, and to 0 otherwise.
pub(crate) fn response_size(response: &Response) -> u64 {
    use http_body::Body as _;

    if let Some(exact) = response.body().size_hint().exact() {
        return exact;
    }
    response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

fn declared_content_length(parts: &Parts) -> Option<u64> {
    parts
        .headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Approximate wire size of the request line and headers:
/// `method SP uri SP version CRLF`, then `name ": " value CRLF` per header,
/// then the terminating CRLF.
fn envelope_size(parts: &Parts) -> u64 {
    let mut size = parts.method.as_str().len() as u64 + 1;
    size += parts.uri.to_string().len() as u64 + 1;
    size += format!("{:?}", parts.version).len() as u64 + 2;

    for (name, value) in &parts.headers {
        size += name.as_str().len() as u64 + 2;
        size += value.len() as u64 + 2;
    }

    size + 2
}
