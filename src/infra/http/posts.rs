//! Write-side handlers: post create/edit, comments and follows.

use axum::{
    Form,
    body::Body,
    extract::{FromRequest, Path, State},
    http::{Request, StatusCode, Uri, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use axum_extra::extract::Multipart;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    application::{
        error::HttpError,
        follows::FollowError,
        forms::{CommentInput, FieldErrors, ImageUpload, PostFields, PostInput},
        posts::PostError,
    },
    domain::entities::UserRecord,
    presentation::views::{
        LayoutChrome, LayoutContext, PostFormContext, PostFormTemplate,
        render_not_found_response, render_template_response,
    },
};

use super::{
    HttpState,
    auth::{CurrentUser, found, login_redirect},
    public::feed_error_to_response,
};

const SOURCE: &str = "infra::http::posts";

pub(super) async fn create_form(
    State(state): State<HttpState>,
    viewer: CurrentUser,
    uri: Uri,
) -> Response {
    if viewer.user.is_none() {
        return login_redirect(&uri);
    }
    post_form_page(
        &state,
        viewer.chrome(),
        None,
        &PostInput::default(),
        None,
        &FieldErrors::new(),
    )
    .await
}

pub(super) async fn create_submit(
    State(state): State<HttpState>,
    viewer: CurrentUser,
    request: Request<Body>,
) -> Response {
    let Some(user) = viewer.user.as_ref() else {
        return login_redirect(request.uri());
    };
    let input = match read_post_input(request, &state).await {
        Ok(input) => input,
        Err(response) => return response,
    };

    match state.posts.create_post(Some(user), input.clone()).await {
        Ok(_) => found(format!("/profile/{}/", user.username)),
        Err(PostError::Validation(errors)) => {
            post_form_page(&state, viewer.chrome(), None, &input, None, &errors).await
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn edit_form(
    State(state): State<HttpState>,
    viewer: CurrentUser,
    uri: Uri,
    Path(post_id): Path<String>,
) -> Response {
    let Some(post_id) = parse_post_id(&post_id) else {
        return malformed_post_id(&viewer, &post_id);
    };

    match state.posts.load_for_edit(viewer.user.as_ref(), post_id).await {
        Ok(item) => {
            let input = PostInput {
                text: item.post.text.clone(),
                group: item
                    .post
                    .group_id
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
                image: None,
            };
            post_form_page(
                &state,
                viewer.chrome(),
                Some(post_id),
                &input,
                item.post.image.as_deref(),
                &FieldErrors::new(),
            )
            .await
        }
        Err(err) => post_error_to_response(err, &viewer, &uri),
    }
}

pub(super) async fn edit_submit(
    State(state): State<HttpState>,
    viewer: CurrentUser,
    Path(post_id): Path<String>,
    request: Request<Body>,
) -> Response {
    let uri = request.uri().clone();
    let Some(user) = viewer.user.as_ref() else {
        return login_redirect(&uri);
    };
    let Some(post_id) = parse_post_id(&post_id) else {
        return malformed_post_id(&viewer, &post_id);
    };

    // Authorship is settled before the body is read.
    let existing = match state.posts.load_for_edit(Some(user), post_id).await {
        Ok(existing) => existing,
        Err(err) => return post_error_to_response(err, &viewer, &uri),
    };
    let input = match read_post_input(request, &state).await {
        Ok(input) => input,
        Err(response) => return response,
    };

    match state.posts.edit_post(Some(user), post_id, input.clone()).await {
        Ok(_) => found(format!("/posts/{post_id}/")),
        Err(PostError::Validation(errors)) => {
            post_form_page(
                &state,
                viewer.chrome(),
                Some(post_id),
                &input,
                existing.post.image.as_deref(),
                &errors,
            )
            .await
        }
        Err(err) => post_error_to_response(err, &viewer, &uri),
    }
}

pub(super) async fn add_comment(
    State(state): State<HttpState>,
    viewer: CurrentUser,
    Path(post_id): Path<String>,
    request: Request<Body>,
) -> Response {
    let uri = request.uri().clone();
    let Some(user) = viewer.user.as_ref() else {
        return login_redirect(&uri);
    };
    let Some(post_id) = parse_post_id(&post_id) else {
        return malformed_post_id(&viewer, &post_id);
    };
    let input: CommentInput = match read_form(request, &state).await {
        Ok(input) => input,
        Err(response) => return response,
    };

    match state.posts.add_comment(Some(user), post_id, input).await {
        Ok(_) => found(format!("/posts/{post_id}/")),
        Err(PostError::Validation(errors)) => {
            debug!(
                target = "yatube::http::posts",
                post_id,
                errors = %errors,
                "comment rejected"
            );
            found(format!("/posts/{post_id}/"))
        }
        Err(err) => post_error_to_response(err, &viewer, &uri),
    }
}

pub(super) async fn profile_follow(
    State(state): State<HttpState>,
    viewer: CurrentUser,
    uri: Uri,
    Path(username): Path<String>,
) -> Response {
    let Some(user) = viewer.user.as_ref() else {
        return login_redirect(&uri);
    };
    match state.follows.follow(user, &username).await {
        Ok(_) => found(format!("/profile/{username}/")),
        Err(err) => follow_error_to_response(err, user),
    }
}

pub(super) async fn profile_unfollow(
    State(state): State<HttpState>,
    viewer: CurrentUser,
    uri: Uri,
    Path(username): Path<String>,
) -> Response {
    let Some(user) = viewer.user.as_ref() else {
        return login_redirect(&uri);
    };
    match state.follows.unfollow(user, &username).await {
        Ok(()) => found(format!("/profile/{username}/")),
        Err(err) => follow_error_to_response(err, user),
    }
}

fn parse_post_id(raw: &str) -> Option<i64> {
    raw.parse().ok()
}

fn malformed_post_id(viewer: &CurrentUser, raw: &str) -> Response {
    render_not_found_response(viewer.chrome(), format!("malformed post id `{raw}`"))
}

fn follow_error_to_response(err: FollowError, user: &UserRecord) -> Response {
    match err {
        FollowError::UnknownAuthor(_) | FollowError::NotFollowing { .. } => {
            render_not_found_response(LayoutChrome::new(Some(user)), err.to_string())
        }
        err => HttpError::from(err).into_response(),
    }
}

fn post_error_to_response(err: PostError, viewer: &CurrentUser, uri: &Uri) -> Response {
    match err {
        PostError::AuthenticationRequired => login_redirect(uri),
        PostError::Forbidden { post_id } => found(format!("/posts/{post_id}/")),
        PostError::NotFound(_) => render_not_found_response(viewer.chrome(), err.to_string()),
        err => HttpError::from(err).into_response(),
    }
}

async fn post_form_page(
    state: &HttpState,
    chrome: LayoutChrome,
    edit_post_id: Option<i64>,
    input: &PostInput,
    current_image: Option<&str>,
    errors: &FieldErrors,
) -> Response {
    let groups = match state.feed.list_groups().await {
        Ok(groups) => groups,
        Err(err) => return feed_error_to_response(err, chrome),
    };
    let title = if edit_post_id.is_some() {
        "Edit post"
    } else {
        "New post"
    };
    let content = PostFormContext::new(
        edit_post_id,
        input.text.clone(),
        &input.group,
        groups,
        errors,
    )
    .with_current_image(current_image);
    let view = LayoutContext::new(chrome.with_title(title), content);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

fn is_multipart(request: &Request<Body>) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

/// Read the post form from either a multipart or an urlencoded body.
async fn read_post_input(
    request: Request<Body>,
    state: &HttpState,
) -> Result<PostInput, Response> {
    if !is_multipart(&request) {
        let fields: PostFields = read_form(request, state).await?;
        return Ok(fields.into());
    }

    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(IntoResponse::into_response)?;
    let mut input = PostInput::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("text") => input.text = field.text().await.map_err(multipart_error)?,
            Some("group") => input.group = field.text().await.map_err(multipart_error)?,
            Some("image") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|name| !name.trim().is_empty());
                let data = field.bytes().await.map_err(multipart_error)?;
                // Browsers send an empty part when no file was chosen.
                if let Some(filename) = filename
                    && !data.is_empty()
                {
                    input.image = Some(ImageUpload { filename, data });
                }
            }
            _ => {}
        }
    }

    Ok(input)
}

async fn read_form<T>(request: Request<Body>, state: &HttpState) -> Result<T, Response>
where
    T: DeserializeOwned,
{
    Form::<T>::from_request(request, state)
        .await
        .map(|Form(value)| value)
        .map_err(IntoResponse::into_response)
}

fn multipart_error(err: axum_extra::extract::multipart::MultipartError) -> Response {
    HttpError::from_error(SOURCE, err.status(), "Malformed form submission", &err).into_response()
}
