use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{CreateGroupParams, GroupsRepo, RepoError};
use crate::domain::entities::GroupRecord;
use crate::domain::slug::{SlugError, candidates, derive_slug, is_valid_slug};

const MAX_TITLE_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("group title must be between 1 and {max} characters", max = MAX_TITLE_CHARS)]
    InvalidTitle,
    #[error("`{0}` is not a valid slug")]
    InvalidSlug(String),
    #[error("group slug `{0}` is already taken")]
    SlugTaken(String),
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Administrative group management. Groups have no web form.
#[derive(Clone)]
pub struct GroupService {
    groups: Arc<dyn GroupsRepo>,
}

impl GroupService {
    pub fn new(groups: Arc<dyn GroupsRepo>) -> Self {
        Self { groups }
    }

    pub async fn create_group(
        &self,
        title: &str,
        slug: Option<&str>,
        description: &str,
    ) -> Result<GroupRecord, GroupError> {
        let title = title.trim();
        if title.is_empty() || title.chars().count() > MAX_TITLE_CHARS {
            return Err(GroupError::InvalidTitle);
        }

        let slug = match slug.map(str::trim) {
            Some(slug) => {
                if !is_valid_slug(slug) {
                    return Err(GroupError::InvalidSlug(slug.to_string()));
                }
                slug.to_string()
            }
            None => self.free_slug_for(title).await?,
        };

        let group = match self
            .groups
            .create_group(CreateGroupParams {
                title: title.to_string(),
                slug: slug.clone(),
                description: description.trim().to_string(),
            })
            .await
        {
            Ok(group) => group,
            Err(RepoError::Duplicate { .. }) => return Err(GroupError::SlugTaken(slug)),
            Err(err) => return Err(err.into()),
        };

        info!(
            target = "yatube::groups",
            group_id = group.id,
            slug = %group.slug,
            "group created"
        );
        Ok(group)
    }

    async fn free_slug_for(&self, title: &str) -> Result<String, GroupError> {
        let base = derive_slug(title)?;
        for candidate in candidates(&base) {
            if self.groups.find_by_slug(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(SlugError::Exhausted(base).into())
    }
}
