use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, error, info_span, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Identifier minted for each incoming request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

/// Tag the request with a fresh id, run it inside a span carrying that id,
/// and echo the id back as `x-request-id`.
pub async fn assign_request_id(mut request: Request<Body>, next: Next) -> Response {
    let id = RequestId(Uuid::new_v4());
    request.extensions_mut().insert(id);

    let span = info_span!("request", request_id = %id.0);
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&id.0.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(id);
    response
}

/// Log failed responses along with the error chain the handler attached.
pub async fn log_failures(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status();
    if status.as_u16() < 400 {
        return response;
    }

    let report = response.extensions_mut().remove::<ErrorReport>();
    let source = report.as_ref().map_or("unreported", |report| report.source);
    let chain = report.map(|report| report.messages).unwrap_or_default();
    let elapsed_ms = started.elapsed().as_millis();

    if status.is_server_error() {
        error!(
            target: "yatube::http::response",
            status = status.as_u16(),
            %method,
            %path,
            elapsed_ms,
            source,
            ?chain,
            "request failed"
        );
    } else {
        warn!(
            target: "yatube::http::response",
            status = status.as_u16(),
            %method,
            %path,
            elapsed_ms,
            source,
            reason = chain.first().map(String::as_str).unwrap_or("-"),
            "request rejected"
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use axum::{Router, http::StatusCode, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn responses_carry_the_request_id() {
        let app = Router::new()
            .route("/", get(|| async { StatusCode::NOT_FOUND }))
            .layer(middleware::from_fn(log_failures))
            .layer(middleware::from_fn(assign_request_id));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let id = response.extensions().get::<RequestId>().expect("request id");
        let header = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .expect("header");
        assert_eq!(header, id.0.to_string());
    }
}
