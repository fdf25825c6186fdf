use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("unknown author `{0}`")]
    UnknownAuthor(String),
    #[error("`{follower}` does not follow `{author}`")]
    NotFollowing { follower: String, author: String },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    /// Following yourself is silently ignored.
    SelfFollow,
}

#[derive(Clone)]
pub struct FollowService {
    follows: Arc<dyn FollowsRepo>,
    users: Arc<dyn UsersRepo>,
}

impl FollowService {
    pub fn new(follows: Arc<dyn FollowsRepo>, users: Arc<dyn UsersRepo>) -> Self {
        Self { follows, users }
    }

    pub async fn follow(
        &self,
        follower: &UserRecord,
        author_username: &str,
    ) -> Result<FollowOutcome, FollowError> {
        let author = self.author(author_username).await?;
        if author.id == follower.id {
            return Ok(FollowOutcome::SelfFollow);
        }

        let created = self.follows.create_follow(follower.id, author.id).await?;
        if !created {
            return Ok(FollowOutcome::AlreadyFollowing);
        }

        info!(
            target = "yatube::follows",
            follower_id = follower.id,
            author_id = author.id,
            "follow created"
        );
        Ok(FollowOutcome::Created)
    }

    pub async fn unfollow(
        &self,
        follower: &UserRecord,
        author_username: &str,
    ) -> Result<(), FollowError> {
        let author = self.author(author_username).await?;
        let deleted = self.follows.delete_follow(follower.id, author.id).await?;
        if !deleted {
            return Err(FollowError::NotFollowing {
                follower: follower.username.clone(),
                author: author.username,
            });
        }

        info!(
            target = "yatube::follows",
            follower_id = follower.id,
            author_id = author.id,
            "follow removed"
        );
        Ok(())
    }

    /// Drives the follow/unfollow button on profile pages.
    pub async fn is_following(
        &self,
        follower_id: i64,
        author_id: i64,
    ) -> Result<bool, FollowError> {
        Ok(self.follows.exists(follower_id, author_id).await?)
    }

    async fn author(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| FollowError::UnknownAuthor(username.to_string()))
    }
}
