mod admin;
mod auth;
mod middleware;
mod posts;
mod public;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::{
    application::{
        accounts::AccountService,
        error::ErrorReport,
        feed::FeedService,
        follows::FollowService,
        groups::GroupService,
        pagination::Paginator,
        posts::PostService,
        repos::{
            CommentsRepo, FollowsRepo, GroupsRepo, HealthRepo, PostsRepo, PostsWriteRepo,
            RepoError, SessionsRepo, UsersRepo,
        },
    },
    cache::{PageCache, PageCacheState, page_cache_layer},
    config::Settings,
    infra::{error::InfraError, uploads::UploadStorage},
};

pub use admin::{AdminState, build_admin_router};
pub use auth::CurrentUser;
pub use middleware::{REQUEST_ID_HEADER, RequestId};

/// Name and flags of the session cookie.
#[derive(Clone)]
pub struct SessionCookie {
    pub name: Arc<str>,
    pub secure: bool,
}

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub follows: Arc<FollowService>,
    pub accounts: Arc<AccountService>,
    pub health: Arc<dyn HealthRepo>,
    pub uploads: Arc<UploadStorage>,
    pub page_cache: PageCacheState,
    pub session: SessionCookie,
}

/// Wire the services over one storage backend.
pub fn build_state<R>(repos: Arc<R>, settings: &Settings) -> Result<HttpState, InfraError>
where
    R: UsersRepo
        + GroupsRepo
        + PostsRepo
        + PostsWriteRepo
        + CommentsRepo
        + FollowsRepo
        + SessionsRepo
        + HealthRepo
        + 'static,
{
    let uploads = Arc::new(UploadStorage::new(settings.uploads.directory.clone())?);
    let paginator = Paginator::new(settings.pagination.page_size);

    let feed = FeedService::new(
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        paginator,
    );
    let posts = PostService::new(
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        uploads.clone(),
    );
    let follows = FollowService::new(repos.clone(), repos.clone());
    let accounts = AccountService::new(repos.clone(), repos.clone(), settings.session.ttl);

    let session_name: Arc<str> = Arc::from(settings.session.cookie_name.as_str());
    let page_cache = PageCacheState {
        cache: Arc::new(PageCache::new(settings.cache.max_entries)),
        ttl: settings.cache.ttl,
        enabled: settings.cache.enabled,
        session_cookie: session_name.clone(),
    };

    Ok(HttpState {
        feed: Arc::new(feed),
        posts: Arc::new(posts),
        follows: Arc::new(follows),
        accounts: Arc::new(accounts),
        health: repos,
        uploads,
        page_cache,
        session: SessionCookie {
            name: session_name,
            secure: settings.session.secure_cookie,
        },
    })
}

/// Operator state sharing the public listener's page cache.
pub fn build_admin_state(groups: Arc<dyn GroupsRepo>, state: &HttpState) -> AdminState {
    AdminState {
        page_cache: state.page_cache.cache.clone(),
        groups: Arc::new(GroupService::new(groups)),
    }
}

pub fn build_router(state: HttpState, max_request_bytes: usize) -> Router {
    let cached = Router::new()
        .route("/", get(public::index))
        .route_layer(axum_middleware::from_fn_with_state(
            state.page_cache.clone(),
            page_cache_layer,
        ));

    let pages = Router::new()
        .route("/group/{slug}/", get(public::group_posts))
        .route("/profile/{username}/", get(public::profile))
        .route("/profile/{username}/follow/", get(posts::profile_follow))
        .route("/profile/{username}/unfollow/", get(posts::profile_unfollow))
        .route("/posts/{post_id}/", get(public::post_detail))
        .route(
            "/posts/{post_id}/edit/",
            get(posts::edit_form).post(posts::edit_submit),
        )
        .route("/posts/{post_id}/comment/", axum::routing::post(posts::add_comment))
        .route("/create/", get(posts::create_form).post(posts::create_submit))
        .route("/follow/", get(public::follow_index))
        .route("/about/author/", get(public::about_author))
        .route("/about/tech/", get(public::about_tech))
        .route(
            "/auth/signup/",
            get(auth::signup_form).post(auth::signup_submit),
        )
        .route("/auth/login/", get(auth::login_form).post(auth::login_submit))
        .route("/auth/logout/", get(auth::logout))
        .route("/media/{*path}", get(public::serve_media))
        .route("/static/{*path}", get(crate::infra::assets::serve_static))
        .route("/_health/db", get(public::db_health))
        .fallback(public::not_found);

    cached
        .merge(pages)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_request_bytes))
        .layer(axum_middleware::from_fn(middleware::log_failures))
        .layer(axum_middleware::from_fn(middleware::assign_request_id))
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
