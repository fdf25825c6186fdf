//! Session extraction and the signup/login/logout pages.

use axum::{
    Form,
    extract::{FromRequestParts, Query, State},
    http::{
        StatusCode, Uri,
        header::LOCATION,
        request::Parts,
    },
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use tracing::warn;

use crate::{
    application::{
        accounts::AccountError,
        error::HttpError,
        forms::{FieldErrors, LoginInput, SignupInput, safe_next},
    },
    domain::entities::UserRecord,
    presentation::views::{
        LayoutChrome, LayoutContext, LoggedOutTemplate, LoginContext, LoginTemplate,
        SignupContext, SignupField, SignupTemplate, render_template_response,
    },
};

use super::HttpState;

const LOGIN_PATH: &str = "/auth/login/";

/// The viewer behind the request's session cookie, if any.
pub struct CurrentUser {
    pub user: Option<UserRecord>,
    pub token: Option<String>,
}

impl CurrentUser {
    pub fn chrome(&self) -> LayoutChrome {
        LayoutChrome::new(self.user.as_ref())
    }
}

impl FromRequestParts<HttpState> for CurrentUser {
    type Rejection = HttpError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(token) = jar
            .get(&state.session.name)
            .map(|cookie| cookie.value().to_string())
        else {
            return Ok(Self {
                user: None,
                token: None,
            });
        };

        let user = state.accounts.authenticate(&token).await?;
        Ok(Self {
            user,
            token: Some(token),
        })
    }
}

/// `302 Found` to `location`.
pub(super) fn found(location: impl Into<String>) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.into())]).into_response()
}

/// Send an anonymous visitor to the login page, remembering where they were going.
pub(super) fn login_redirect(uri: &Uri) -> Response {
    let next = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    found(format!("{LOGIN_PATH}?next={}", encoded.replace("%2F", "/")))
}

fn signup_fields(input: &SignupInput) -> Vec<SignupField> {
    vec![
        ("first_name", "First name", "text", input.first_name.clone()),
        ("last_name", "Last name", "text", input.last_name.clone()),
        ("username", "Username", "text", input.username.clone()),
        ("email", "Email address", "email", input.email.clone()),
        ("password1", "Password", "password", String::new()),
        ("password2", "Password confirmation", "password", String::new()),
    ]
}

fn signup_page(viewer: &CurrentUser, input: &SignupInput, errors: &FieldErrors) -> Response {
    let content = SignupContext::new(signup_fields(input), errors);
    let view = LayoutContext::new(viewer.chrome().with_title("Sign up"), content);
    render_template_response(SignupTemplate { view }, StatusCode::OK)
}

pub(super) async fn signup_form(viewer: CurrentUser) -> Response {
    signup_page(&viewer, &SignupInput::default(), &FieldErrors::new())
}

pub(super) async fn signup_submit(
    State(state): State<HttpState>,
    viewer: CurrentUser,
    Form(input): Form<SignupInput>,
) -> Response {
    match state.accounts.signup(input.clone()).await {
        Ok(_) => found("/"),
        Err(AccountError::Validation(errors)) => signup_page(&viewer, &input, &errors),
        Err(err) => HttpError::from(err).into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct NextQuery {
    next: Option<String>,
}

fn login_page(viewer: &CurrentUser, username: &str, next: &str, errors: &FieldErrors) -> Response {
    let content = LoginContext::new(username.to_string(), next.to_string(), errors);
    let view = LayoutContext::new(viewer.chrome().with_title("Log in"), content);
    render_template_response(LoginTemplate { view }, StatusCode::OK)
}

pub(super) async fn login_form(viewer: CurrentUser, Query(query): Query<NextQuery>) -> Response {
    let next = safe_next(query.next.as_deref()).unwrap_or_default();
    login_page(&viewer, "", &next, &FieldErrors::new())
}

pub(super) async fn login_submit(
    State(state): State<HttpState>,
    viewer: CurrentUser,
    jar: CookieJar,
    Form(input): Form<LoginInput>,
) -> Response {
    let session = match state.accounts.login(&input).await {
        Ok(session) => session,
        Err(AccountError::Validation(errors)) => {
            return login_page(&viewer, &input.username, &input.next, &errors);
        }
        Err(err) => return HttpError::from(err).into_response(),
    };

    if let Some(previous) = viewer.token.as_deref()
        && let Err(err) = state.accounts.logout(previous).await
    {
        warn!(
            target = "yatube::http::auth",
            error = %err,
            "failed to revoke previous session"
        );
    }

    let max_age = time::Duration::seconds(
        i64::try_from(state.accounts.session_ttl().as_secs()).unwrap_or(i64::MAX),
    );
    let cookie = Cookie::build((state.session.name.to_string(), session.token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.session.secure)
        .max_age(max_age);

    let target = safe_next(Some(&input.next)).unwrap_or_else(|| "/".to_string());
    (jar.add(cookie), found(target)).into_response()
}

pub(super) async fn logout(
    State(state): State<HttpState>,
    viewer: CurrentUser,
    jar: CookieJar,
) -> Response {
    if let Some(token) = viewer.token.as_deref()
        && let Err(err) = state.accounts.logout(token).await
    {
        return HttpError::from(err).into_response();
    }

    let jar = jar.remove(Cookie::build((state.session.name.to_string(), "")).path("/"));
    let view = LayoutContext::new(LayoutChrome::new(None).with_title("Logged out"), ());
    (
        jar,
        render_template_response(LoggedOutTemplate { view }, StatusCode::OK),
    )
        .into_response()
}
