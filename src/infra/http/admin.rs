//! Operator endpoints served on `server.admin_addr`, never on the public listener.

use std::sync::Arc;

use axum::{
    Form, Router,
    extract::State,
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    application::{error::HttpError, groups::GroupService},
    cache::PageCache,
};

#[derive(Clone)]
pub struct AdminState {
    pub page_cache: Arc<PageCache>,
    pub groups: Arc<GroupService>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateGroupForm {
    title: String,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    description: String,
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/cache/invalidate", post(invalidate_cache))
        .route("/groups", post(create_group))
        .with_state(state)
}

pub(super) async fn invalidate_cache(State(state): State<AdminState>) -> Response {
    let dropped = state.page_cache.len();
    state.page_cache.clear();
    info!(target = "yatube::http::admin", dropped, "page cache invalidated");
    StatusCode::NO_CONTENT.into_response()
}

pub(super) async fn create_group(
    State(state): State<AdminState>,
    Form(form): Form<CreateGroupForm>,
) -> Response {
    let slug = form.slug.as_deref().filter(|slug| !slug.trim().is_empty());
    let created = state
        .groups
        .create_group(&form.title, slug, &form.description)
        .await;
    match created {
        Ok(group) => (
            StatusCode::CREATED,
            [(LOCATION, format!("/group/{}/", group.slug))],
            format!("{}\t{}\t{}\n", group.id, group.slug, group.title),
        )
            .into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}
