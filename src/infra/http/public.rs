use std::io::ErrorKind;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{
        HeaderValue, StatusCode, Uri,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::error;

use crate::{
    application::{
        error::HttpError,
        feed::FeedError,
        pagination::PageNumber,
    },
    domain::{permissions::can_edit, posts::title_of},
    infra::uploads::UploadStorageError,
    presentation::views::{
        AboutAuthorTemplate, AboutTechTemplate, CommentView, FollowTemplate, GroupContext,
        GroupTemplate, IndexTemplate, LayoutChrome, LayoutContext, ListingContext, PaginatorView,
        PostCard, PostDetailContext, PostDetailTemplate, ProfileContext, ProfileTemplate,
        ViewerView, render_not_found_response, render_template_response,
    },
};

use super::{
    HttpState, db_health_response,
    auth::{CurrentUser, login_redirect},
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    fn number(&self) -> PageNumber {
        PageNumber::parse(self.page.as_deref())
    }
}

pub(super) async fn index(
    State(state): State<HttpState>,
    viewer: CurrentUser,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = viewer.chrome();
    match state.feed.list_all_posts(query.number()).await {
        Ok(page) => {
            let view = LayoutContext::new(chrome, ListingContext::from_page(page));
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

pub(super) async fn group_posts(
    State(state): State<HttpState>,
    viewer: CurrentUser,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = viewer.chrome();
    match state.feed.list_posts_by_group(&slug, query.number()).await {
        Ok(feed) => {
            let chrome = chrome.with_title(format!("{} | Yatube", feed.group.title));
            let view = LayoutContext::new(chrome, GroupContext::new(feed.group, feed.page));
            render_template_response(GroupTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

pub(super) async fn profile(
    State(state): State<HttpState>,
    viewer: CurrentUser,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = viewer.chrome();
    let feed = match state
        .feed
        .list_posts_by_author(&username, query.number())
        .await
    {
        Ok(feed) => feed,
        Err(err) => return feed_error_to_response(err, chrome),
    };

    let following = match viewer.user.as_ref() {
        Some(user) => match state.follows.is_following(user.id, feed.author.id).await {
            Ok(following) => following,
            Err(err) => return HttpError::from(err).into_response(),
        },
        None => false,
    };
    let author = ViewerView::from(&feed.author);
    let can_follow = viewer
        .user
        .as_ref()
        .is_some_and(|user| user.id != feed.author.id);
    let content = ProfileContext {
        post_count: feed.page.total,
        following,
        can_follow,
        paginator: PaginatorView::from_page(&feed.page),
        posts: feed.page.items.into_iter().map(PostCard::from).collect(),
        username: author.username,
        display_name: author.display_name,
    };
    let view = LayoutContext::new(chrome, content);
    render_template_response(ProfileTemplate { view }, StatusCode::OK)
}

pub(super) async fn post_detail(
    State(state): State<HttpState>,
    viewer: CurrentUser,
    Path(post_id): Path<String>,
) -> Response {
    let chrome = viewer.chrome();
    let Ok(post_id) = post_id.parse::<i64>() else {
        return render_not_found_response(chrome, format!("malformed post id `{post_id}`"));
    };

    let detail = match state.feed.post_detail(post_id).await {
        Ok(detail) => detail,
        Err(err) => return feed_error_to_response(err, chrome),
    };

    let content = PostDetailContext {
        can_edit: can_edit(&detail.post.post, viewer.user.as_ref()),
        can_comment: viewer.user.is_some(),
        author_post_count: detail.author_post_count,
        comments: detail.comments.into_iter().map(CommentView::from).collect(),
        post: PostCard::from(detail.post),
    };
    let chrome = chrome.with_title(format!("Post {}", title_of(&content.post.text)));
    let view = LayoutContext::new(chrome, content);
    render_template_response(PostDetailTemplate { view }, StatusCode::OK)
}

pub(super) async fn follow_index(
    State(state): State<HttpState>,
    viewer: CurrentUser,
    uri: Uri,
    Query(query): Query<PageQuery>,
) -> Response {
    let Some(user) = viewer.user.as_ref() else {
        return login_redirect(&uri);
    };

    let chrome = viewer.chrome();
    match state.feed.list_followed_feed(user, query.number()).await {
        Ok(page) => {
            let view = LayoutContext::new(chrome, ListingContext::from_page(page));
            render_template_response(FollowTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

pub(super) async fn about_author(viewer: CurrentUser) -> Response {
    let view = LayoutContext::new(viewer.chrome(), ());
    render_template_response(AboutAuthorTemplate { view }, StatusCode::OK)
}

pub(super) async fn about_tech(viewer: CurrentUser) -> Response {
    let view = LayoutContext::new(viewer.chrome(), ());
    render_template_response(AboutTechTemplate { view }, StatusCode::OK)
}

pub(super) async fn not_found(viewer: CurrentUser, uri: Uri) -> Response {
    render_not_found_response(viewer.chrome(), format!("no route for {}", uri.path()))
}

pub(super) async fn db_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.health_check().await)
}

pub(super) async fn serve_media(
    State(state): State<HttpState>,
    Path(path): Path<String>,
) -> Response {
    const SOURCE: &str = "infra::http::public::serve_media";

    match state.uploads.read(&path).await {
        Ok(bytes) => build_media_response(&path, bytes),
        Err(UploadStorageError::InvalidPath) => media_not_found(SOURCE),
        Err(UploadStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => {
            media_not_found(SOURCE)
        }
        Err(err) => {
            error!(
                target = "yatube::http::media",
                path = %path,
                error = %err,
                "failed to read stored upload"
            );
            HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read uploaded file",
                &err,
            )
            .into_response()
        }
    }
}

fn media_not_found(source: &'static str) -> Response {
    HttpError::new(
        source,
        StatusCode::NOT_FOUND,
        "File not found",
        "The requested upload is not available",
    )
    .into_response()
}

fn build_media_response(path: &str, bytes: Bytes) -> Response {
    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    // Stored names carry a random prefix and are never rewritten.
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}

pub(super) fn feed_error_to_response(err: FeedError, chrome: LayoutChrome) -> Response {
    match err {
        FeedError::UnknownGroup(_) | FeedError::UnknownAuthor(_) | FeedError::UnknownPost(_) => {
            render_not_found_response(chrome, err.to_string())
        }
        err => HttpError::from(err).into_response(),
    }
}
