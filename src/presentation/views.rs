use crate::application::error::{ErrorReport, HttpError};
use crate::application::forms::FieldErrors;
use crate::application::pagination::Page;
use crate::domain::entities::{CommentListItem, GroupRecord, PostListItem, UserRecord};
use crate::domain::posts::format_human_date;
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

pub const SITE_NAME: &str = "Yatube";

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Render the 404 page, attaching `detail` for the response log.
pub fn render_not_found_response(chrome: LayoutChrome, detail: impl Into<String>) -> Response {
    let view = LayoutContext::new(chrome, ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        detail,
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct ViewerView {
    pub username: String,
    pub display_name: String,
}

impl From<&UserRecord> for ViewerView {
    fn from(user: &UserRecord) -> Self {
        Self {
            username: user.username.clone(),
            display_name: user.display_name(),
        }
    }
}

/// Header and footer state shared by every page.
#[derive(Clone)]
pub struct LayoutChrome {
    pub title: String,
    pub is_authenticated: bool,
    pub viewer: ViewerView,
    pub year: i32,
}

impl LayoutChrome {
    pub fn new(viewer: Option<&UserRecord>) -> Self {
        Self {
            title: SITE_NAME.to_string(),
            is_authenticated: viewer.is_some(),
            viewer: viewer.map(ViewerView::from).unwrap_or(ViewerView {
                username: String::new(),
                display_name: String::new(),
            }),
            year: time::OffsetDateTime::now_utc().year(),
        }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..self
        }
    }
}

pub struct LayoutContext<T> {
    pub title: String,
    pub is_authenticated: bool,
    pub viewer: ViewerView,
    pub year: i32,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            title: chrome.title,
            is_authenticated: chrome.is_authenticated,
            viewer: chrome.viewer,
            year: chrome.year,
            content,
        }
    }
}

#[derive(Clone)]
pub struct PostCard {
    pub id: i64,
    pub text: String,
    pub author_username: String,
    pub author_name: String,
    pub published: String,
    pub has_group: bool,
    pub group_slug: String,
    pub group_title: String,
    pub has_image: bool,
    pub image_url: String,
}

impl From<PostListItem> for PostCard {
    fn from(item: PostListItem) -> Self {
        let PostListItem {
            post,
            author_username,
            author_name,
            group_slug,
            group_title,
        } = item;
        Self {
            id: post.id,
            published: format_human_date(post.created_at),
            text: post.text,
            author_username,
            author_name,
            has_group: group_slug.is_some(),
            group_slug: group_slug.unwrap_or_default(),
            group_title: group_title.unwrap_or_default(),
            has_image: post.image.is_some(),
            image_url: post
                .image
                .map(|path| format!("/media/{path}"))
                .unwrap_or_default(),
        }
    }
}

pub struct PageLink {
    pub number: u64,
    pub current: bool,
}

/// Numbered page links around the current page.
pub struct PaginatorView {
    pub number: u64,
    pub num_pages: u64,
    pub has_other_pages: bool,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous: u64,
    pub next: u64,
    pub pages: Vec<PageLink>,
}

const PAGINATOR_SPAN: u64 = 3;

impl PaginatorView {
    pub fn from_page<T>(page: &Page<T>) -> Self {
        let first = page.number.saturating_sub(PAGINATOR_SPAN).max(1);
        let last = (page.number + PAGINATOR_SPAN).min(page.num_pages);
        Self {
            number: page.number,
            num_pages: page.num_pages,
            has_other_pages: page.has_other_pages(),
            has_previous: page.has_previous(),
            has_next: page.has_next(),
            previous: page.previous_page_number().unwrap_or(1),
            next: page.next_page_number().unwrap_or(page.num_pages),
            pages: (first..=last)
                .map(|number| PageLink {
                    number,
                    current: number == page.number,
                })
                .collect(),
        }
    }
}

pub struct ListingContext {
    pub posts: Vec<PostCard>,
    pub paginator: PaginatorView,
}

impl ListingContext {
    pub fn from_page(page: Page<PostListItem>) -> Self {
        let paginator = PaginatorView::from_page(&page);
        Self {
            posts: page.items.into_iter().map(PostCard::from).collect(),
            paginator,
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<ListingContext>,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate {
    pub view: LayoutContext<ListingContext>,
}

pub struct GroupContext {
    pub title: String,
    pub description: String,
    pub posts: Vec<PostCard>,
    pub paginator: PaginatorView,
}

impl GroupContext {
    pub fn new(group: GroupRecord, page: Page<PostListItem>) -> Self {
        let listing = ListingContext::from_page(page);
        Self {
            title: group.title,
            description: group.description,
            posts: listing.posts,
            paginator: listing.paginator,
        }
    }
}

#[derive(Template)]
#[template(path = "group.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupContext>,
}

pub struct ProfileContext {
    pub username: String,
    pub display_name: String,
    pub post_count: u64,
    pub following: bool,
    /// Follow controls are shown to signed-in viewers other than the author.
    pub can_follow: bool,
    pub posts: Vec<PostCard>,
    pub paginator: PaginatorView,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileContext>,
}

pub struct CommentView {
    pub author_username: String,
    pub text: String,
    pub published: String,
}

impl From<CommentListItem> for CommentView {
    fn from(item: CommentListItem) -> Self {
        Self {
            author_username: item.author_username,
            published: format_human_date(item.comment.created_at),
            text: item.comment.text,
        }
    }
}

pub struct PostDetailContext {
    pub post: PostCard,
    pub author_post_count: u64,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
    pub can_comment: bool,
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailContext>,
}

pub struct GroupOption {
    pub id: i64,
    pub title: String,
    pub selected: bool,
}

pub struct PostFormContext {
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOption>,
    pub no_group_selected: bool,
    pub has_image: bool,
    pub current_image: String,
    pub text_errors: Vec<String>,
    pub group_errors: Vec<String>,
    pub image_errors: Vec<String>,
}

impl PostFormContext {
    /// `selected` is the raw group field value (group id or empty).
    pub fn new(
        edit_post_id: Option<i64>,
        text: String,
        selected: &str,
        groups: Vec<GroupRecord>,
        errors: &FieldErrors,
    ) -> Self {
        let selected = selected.trim();
        Self {
            is_edit: edit_post_id.is_some(),
            action: match edit_post_id {
                Some(id) => format!("/posts/{id}/edit/"),
                None => "/create/".to_string(),
            },
            text,
            no_group_selected: selected.is_empty(),
            groups: groups
                .into_iter()
                .map(|group| GroupOption {
                    selected: group.id.to_string() == selected,
                    id: group.id,
                    title: group.title,
                })
                .collect(),
            has_image: false,
            current_image: String::new(),
            text_errors: owned(errors.for_field("text")),
            group_errors: owned(errors.for_field("group")),
            image_errors: owned(errors.for_field("image")),
        }
    }

    pub fn with_current_image(self, image: Option<&str>) -> Self {
        Self {
            has_image: image.is_some(),
            current_image: image
                .map(|path| format!("/media/{path}"))
                .unwrap_or_default(),
            ..self
        }
    }
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormContext>,
}

pub struct LoginContext {
    pub username: String,
    pub next: String,
    pub errors: Vec<String>,
    pub username_errors: Vec<String>,
    pub password_errors: Vec<String>,
}

impl LoginContext {
    pub fn new(username: String, next: String, errors: &FieldErrors) -> Self {
        Self {
            username,
            next,
            errors: owned(errors.non_field()),
            username_errors: owned(errors.for_field("username")),
            password_errors: owned(errors.for_field("password")),
        }
    }
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginContext>,
}

pub struct FormFieldView {
    pub name: &'static str,
    pub label: &'static str,
    pub input_type: &'static str,
    pub value: String,
    pub errors: Vec<String>,
}

pub struct SignupContext {
    pub fields: Vec<FormFieldView>,
}

/// `(name, label, input type, submitted value)`; password values are never echoed back.
pub type SignupField = (&'static str, &'static str, &'static str, String);

impl SignupContext {
    pub fn new(values: Vec<SignupField>, errors: &FieldErrors) -> Self {
        Self {
            fields: values
                .into_iter()
                .map(|(name, label, input_type, value)| FormFieldView {
                    name,
                    label,
                    input_type,
                    errors: owned(errors.for_field(name)),
                    value: if input_type == "password" {
                        String::new()
                    } else {
                        value
                    },
                })
                .collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub view: LayoutContext<SignupContext>,
}

#[derive(Template)]
#[template(path = "logged_out.html")]
pub struct LoggedOutTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "about_author.html")]
pub struct AboutAuthorTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "about_tech.html")]
pub struct AboutTechTemplate {
    pub view: LayoutContext<()>,
}

pub struct ErrorPageView {
    pub heading: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            heading: "Page not found".to_string(),
            message: "The page you requested does not exist.".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

fn owned(messages: Vec<&str>) -> Vec<String> {
    messages.into_iter().map(str::to_string).collect()
}
