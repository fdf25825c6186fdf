//! In-process application fixture shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;
use yatube::{
    application::repos::{CreateGroupParams, CreateUserParams, GroupsRepo, UsersRepo},
    config::Settings,
    domain::entities::{GroupRecord, PostRecord, UserRecord},
    infra::{
        http::{self, HttpState},
        memory::MemoryRepositories,
    },
};

pub const TINY_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

pub struct TestApp {
    pub router: Router,
    pub admin: Router,
    pub state: HttpState,
    pub repos: Arc<MemoryRepositories>,
    media: TempDir,
    clock: OffsetDateTime,
}

impl TestApp {
    /// App with the page cache switched off.
    pub fn new() -> Self {
        Self::with_settings(|settings| settings.cache.enabled = false)
    }

    pub fn with_settings(adjust: impl FnOnce(&mut Settings)) -> Self {
        let media = tempfile::tempdir().expect("media dir");
        let mut settings = Settings::defaults().expect("default settings");
        settings.uploads.directory = media.path().to_path_buf();
        adjust(&mut settings);

        let repos = Arc::new(MemoryRepositories::new());
        let state = http::build_state(repos.clone(), &settings).expect("state");
        let max_request_bytes = settings.uploads.max_request_bytes.get() as usize;
        let router = http::build_router(state.clone(), max_request_bytes);
        let admin = http::build_admin_router(http::build_admin_state(repos.clone(), &state));

        Self {
            router,
            admin,
            state,
            repos,
            media,
            clock: OffsetDateTime::now_utc() - Duration::days(1),
        }
    }

    pub fn media_root(&self) -> &std::path::Path {
        self.media.path()
    }

    /// A user that can only sign in through [`TestApp::session_cookie`].
    pub async fn user(&self, username: &str) -> UserRecord {
        self.repos
            .create_user(CreateUserParams {
                username: username.to_string(),
                first_name: String::new(),
                last_name: String::new(),
                email: format!("{username}@example.com"),
                password_hash: "!".to_string(),
            })
            .await
            .expect("create user")
    }

    pub async fn group(&self, title: &str, slug: &str) -> GroupRecord {
        self.repos
            .create_group(CreateGroupParams {
                title: title.to_string(),
                slug: slug.to_string(),
                description: format!("All about {title}"),
            })
            .await
            .expect("create group")
    }

    /// Insert a post one minute after the previous one, so listing order is deterministic.
    pub async fn post(
        &mut self,
        author: &UserRecord,
        text: &str,
        group: Option<i64>,
    ) -> PostRecord {
        self.clock += Duration::minutes(1);
        self.repos
            .insert_post_at(author.id, text, group, self.clock)
            .await
    }

    pub async fn session_cookie(&self, user: &UserRecord) -> String {
        let session = self
            .state
            .accounts
            .issue_session(user.clone())
            .await
            .expect("issue session");
        format!("{}={}", self.state.session.name, session.token)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond")
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).expect("request")).await
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).expect("request"))
            .await
    }

    /// POST a form to the operator listener.
    pub async fn admin_form(&self, uri: &str, body: &str) -> Response<Body> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("request");
        self.admin
            .clone()
            .oneshot(request)
            .await
            .expect("admin router should respond")
    }

    pub async fn page(&self, uri: &str, cookie: Option<&str>) -> String {
        let response = self.get(uri, cookie).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {uri}");
        body_text(response).await
    }
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header")
        .to_string()
}

/// Number of rendered post cards in a listing page.
pub fn card_count(html: &str) -> usize {
    html.matches("class=\"post-card\"").count()
}

pub fn multipart_body(
    boundary: &str,
    fields: &[(&str, &str)],
    image: Option<(&str, &[u8])>,
) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, data)) = image {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: image/gif\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}
