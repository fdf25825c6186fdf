//! Page cache middleware.
//!
//! Mounted on the all-posts listing only. Successful responses without a
//! `Set-Cookie` header are stored; everything else passes through untouched.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, to_bytes},
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{instrument, warn};

use super::{CachedPage, PageCache, keys::page_key};

const MAX_CACHED_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Shared cache state for the middleware.
#[derive(Clone)]
pub struct PageCacheState {
    pub cache: Arc<PageCache>,
    pub ttl: Duration,
    pub enabled: bool,
    pub session_cookie: Arc<str>,
}

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn page_cache_layer(
    State(state): State<PageCacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.enabled || request.method() != Method::GET {
        return next.run(request).await;
    }

    let session = CookieJar::from_headers(request.headers())
        .get(&state.session_cookie)
        .map(|cookie| cookie.value().to_string());
    let key = page_key(
        request.uri().path(),
        request.uri().query(),
        session.as_deref(),
    );

    let outcome = state
        .cache
        .get_or_render(&key, state.ttl, || async move {
            into_cacheable(next.run(request).await).await
        })
        .await;

    match outcome {
        Ok(page) => build_response(page),
        Err(response) => response,
    }
}

/// Collect a cacheable response, or hand back the original one.
async fn into_cacheable(response: Response) -> Result<CachedPage, Response> {
    if response.status() != StatusCode::OK || response.headers().contains_key(SET_COOKIE) {
        return Err(response);
    }

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_CACHED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(
                target = "yatube::cache",
                error = %err,
                "failed to collect response body for caching"
            );
            return Err(StatusCode::INTERNAL_SERVER_ERROR.into_response());
        }
    };

    Ok(CachedPage {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect(),
        body: bytes,
    })
}

fn build_response(page: CachedPage) -> Response {
    let mut builder = Response::builder().status(page.status);

    for (name, value) in page.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    builder
        .body(Body::from(page.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
