use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::{
        accounts::AccountError, feed::FeedError, follows::FollowError, groups::GroupError,
        posts::PostError, repos::RepoError,
    },
    infra::error::InfraError,
};

/// Diagnostic chain attached to error responses and consumed by the logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn internal(source: &'static str, error: &dyn StdError) -> Self {
        Self::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            error,
        )
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

/// Map a repository error to a consistent HTTP error.
pub fn repo_error_to_http(source: &'static str, err: &RepoError) -> HttpError {
    match err {
        RepoError::Duplicate { .. } | RepoError::Integrity { .. } => HttpError::from_error(
            source,
            StatusCode::CONFLICT,
            "Conflicting record",
            err,
        ),
        RepoError::NotFound => {
            HttpError::from_error(source, StatusCode::NOT_FOUND, "Resource not found", err)
        }
        RepoError::InvalidInput { .. } => {
            HttpError::from_error(source, StatusCode::BAD_REQUEST, "Invalid input", err)
        }
        RepoError::Timeout => HttpError::from_error(
            source,
            StatusCode::SERVICE_UNAVAILABLE,
            "Service temporarily unavailable",
            err,
        ),
        RepoError::Persistence(_) => HttpError::internal(source, err),
    }
}

impl From<FeedError> for HttpError {
    fn from(error: FeedError) -> Self {
        const SOURCE: &str = "application::error::feed_error_to_http";
        match &error {
            FeedError::UnknownGroup(_)
            | FeedError::UnknownAuthor(_)
            | FeedError::UnknownPost(_) => {
                HttpError::from_error(SOURCE, StatusCode::NOT_FOUND, "Not found", &error)
            }
            FeedError::Repo(err) => repo_error_to_http(SOURCE, err),
        }
    }
}

impl From<FollowError> for HttpError {
    fn from(error: FollowError) -> Self {
        const SOURCE: &str = "application::error::follow_error_to_http";
        match &error {
            FollowError::UnknownAuthor(_) | FollowError::NotFollowing { .. } => {
                HttpError::from_error(SOURCE, StatusCode::NOT_FOUND, "Not found", &error)
            }
            FollowError::Repo(err) => repo_error_to_http(SOURCE, err),
        }
    }
}

impl From<PostError> for HttpError {
    fn from(error: PostError) -> Self {
        const SOURCE: &str = "application::error::post_error_to_http";
        match &error {
            PostError::AuthenticationRequired => {
                HttpError::from_error(SOURCE, StatusCode::UNAUTHORIZED, "Login required", &error)
            }
            PostError::Forbidden { .. } => {
                HttpError::from_error(SOURCE, StatusCode::FORBIDDEN, "Forbidden", &error)
            }
            PostError::NotFound(_) => {
                HttpError::from_error(SOURCE, StatusCode::NOT_FOUND, "Not found", &error)
            }
            PostError::Validation(_) => {
                HttpError::from_error(SOURCE, StatusCode::BAD_REQUEST, "Invalid form", &error)
            }
            PostError::Upload(_) => HttpError::internal(SOURCE, &error),
            PostError::Repo(err) => repo_error_to_http(SOURCE, err),
        }
    }
}

impl From<AccountError> for HttpError {
    fn from(error: AccountError) -> Self {
        const SOURCE: &str = "application::error::account_error_to_http";
        match &error {
            AccountError::Validation(_) => {
                HttpError::from_error(SOURCE, StatusCode::BAD_REQUEST, "Invalid form", &error)
            }
            AccountError::Hashing(_) => HttpError::internal(SOURCE, &error),
            AccountError::Repo(err) => repo_error_to_http(SOURCE, err),
        }
    }
}

impl From<GroupError> for HttpError {
    fn from(error: GroupError) -> Self {
        const SOURCE: &str = "application::error::group_error_to_http";
        match &error {
            GroupError::InvalidTitle | GroupError::InvalidSlug(_) | GroupError::Slug(_) => {
                HttpError::from_error(SOURCE, StatusCode::BAD_REQUEST, "Invalid group", &error)
            }
            GroupError::SlugTaken(_) => {
                HttpError::from_error(SOURCE, StatusCode::CONFLICT, "Slug already taken", &error)
            }
            GroupError::Repo(err) => repo_error_to_http(SOURCE, err),
        }
    }
}

/// Top-level error for process entry points.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
