//! API middleware layers.

use axum::http::{header, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

/// Mark API responses as uncacheable; they carry per-user data.
pub async fn no_store(request: axum::extract::Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
