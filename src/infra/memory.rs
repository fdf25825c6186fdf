//! In-process repository implementations.
//!
//! Used when no database URL is configured and by the test suite. Semantics
//! mirror the Postgres adapter: serial ids, unique usernames/slugs/follow
//! edges, and newest-first listings with id as tie-break.

use std::cmp::Reverse;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams, CreateSessionParams,
    CreateUserParams, FollowsRepo, GroupsRepo, HealthRepo, PostFilter, PostsRepo, PostsWriteRepo,
    RepoError, SessionsRepo, UpdatePostParams, UsersRepo,
};
use crate::domain::entities::{
    CommentListItem, CommentRecord, FollowRecord, GroupRecord, PostListItem, PostRecord,
    SessionRecord, UserRecord,
};

#[derive(Default)]
struct State {
    users: Vec<UserRecord>,
    groups: Vec<GroupRecord>,
    posts: Vec<PostRecord>,
    comments: Vec<CommentRecord>,
    follows: Vec<FollowRecord>,
    sessions: Vec<SessionRecord>,
    next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn matches(&self, post: &PostRecord, filter: PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(group_id) => post.group_id == Some(group_id),
            PostFilter::Author(author_id) => post.author_id == author_id,
            PostFilter::FollowedBy(user_id) => self
                .follows
                .iter()
                .any(|edge| edge.user_id == user_id && edge.author_id == post.author_id),
        }
    }

    fn list_item(&self, post: &PostRecord) -> Result<PostListItem, RepoError> {
        let author = self
            .users
            .iter()
            .find(|user| user.id == post.author_id)
            .ok_or_else(|| RepoError::Integrity {
                message: format!("post {} references missing author", post.id),
            })?;
        let group = post
            .group_id
            .and_then(|id| self.groups.iter().find(|group| group.id == id));
        Ok(PostListItem {
            post: post.clone(),
            author_username: author.username.clone(),
            author_name: author.display_name(),
            group_slug: group.map(|group| group.slug.clone()),
            group_title: group.map(|group| group.title.clone()),
        })
    }

    fn ordered_posts(&self, filter: PostFilter) -> Vec<&PostRecord> {
        let mut posts: Vec<&PostRecord> = self
            .posts
            .iter()
            .filter(|post| self.matches(post, filter))
            .collect();
        posts.sort_by_key(|post| Reverse((post.created_at, post.id)));
        posts
    }
}

#[derive(Default)]
pub struct MemoryRepositories {
    state: RwLock<State>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a post with an explicit creation time.
    pub async fn insert_post_at(
        &self,
        author_id: i64,
        text: &str,
        group_id: Option<i64>,
        created_at: OffsetDateTime,
    ) -> PostRecord {
        let mut state = self.state.write().await;
        let post = PostRecord {
            id: state.next_id(),
            author_id,
            text: text.to_string(),
            image: None,
            group_id,
            created_at,
        };
        state.posts.push(post.clone());
        post
    }

    pub async fn post_count(&self) -> usize {
        self.state.read().await.posts.len()
    }

    pub async fn follow_count(&self) -> usize {
        self.state.read().await.follows.len()
    }

    pub async fn find_post(&self, id: i64) -> Option<PostRecord> {
        self.state
            .read()
            .await
            .posts
            .iter()
            .find(|post| post.id == id)
            .cloned()
    }
}

#[async_trait]
impl UsersRepo for MemoryRepositories {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut state = self.state.write().await;
        if state
            .users
            .iter()
            .any(|user| user.username == params.username)
        {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        let user = UserRecord {
            id: state.next_id(),
            username: params.username,
            first_name: params.first_name,
            last_name: params.last_name,
            email: params.email,
            password_hash: params.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }
}

#[async_trait]
impl GroupsRepo for MemoryRepositories {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut state = self.state.write().await;
        if state.groups.iter().any(|group| group.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "groups_slug_key".to_string(),
            });
        }
        let group = GroupRecord {
            id: state.next_id(),
            title: params.title,
            slug: params.slug,
            description: params.description,
        };
        state.groups.push(group.clone());
        Ok(group)
    }

    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let state = self.state.read().await;
        let mut groups = state.groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<GroupRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.groups.iter().find(|group| group.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.groups.iter().find(|group| group.slug == slug).cloned())
    }
}

#[async_trait]
impl PostsRepo for MemoryRepositories {
    async fn count_posts(&self, filter: PostFilter) -> Result<u64, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .posts
            .iter()
            .filter(|post| state.matches(post, filter))
            .count() as u64)
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostListItem>, RepoError> {
        let state = self.state.read().await;
        state
            .ordered_posts(filter)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|post| state.list_item(post))
            .collect()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PostListItem>, RepoError> {
        let state = self.state.read().await;
        state
            .posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| state.list_item(post))
            .transpose()
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.write().await;
        if !state.users.iter().any(|user| user.id == params.author_id) {
            return Err(RepoError::InvalidInput {
                message: format!("author {} does not exist", params.author_id),
            });
        }
        let post = PostRecord {
            id: state.next_id(),
            author_id: params.author_id,
            text: params.text,
            image: params.image,
            group_id: params.group_id,
            created_at: OffsetDateTime::now_utc(),
        };
        state.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.write().await;
        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group_id = params.group_id;
        post.image = params.image;
        Ok(post.clone())
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepositories {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.write().await;
        if !state.posts.iter().any(|post| post.id == params.post_id) {
            return Err(RepoError::InvalidInput {
                message: format!("post {} does not exist", params.post_id),
            });
        }
        let comment = CommentRecord {
            id: state.next_id(),
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created_at: OffsetDateTime::now_utc(),
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentListItem>, RepoError> {
        let state = self.state.read().await;
        let mut comments: Vec<CommentListItem> = state
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .map(|comment| CommentListItem {
                comment: comment.clone(),
                author_username: state
                    .users
                    .iter()
                    .find(|user| user.id == comment.author_id)
                    .map(|user| user.username.clone())
                    .unwrap_or_default(),
            })
            .collect();
        comments.sort_by_key(|item| (item.comment.created_at, item.comment.id));
        Ok(comments)
    }
}

#[async_trait]
impl FollowsRepo for MemoryRepositories {
    async fn create_follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        if user_id == author_id {
            return Err(RepoError::Integrity {
                message: "follows_not_self".to_string(),
            });
        }
        if state
            .follows
            .iter()
            .any(|edge| edge.user_id == user_id && edge.author_id == author_id)
        {
            return Ok(false);
        }
        let edge = FollowRecord {
            id: state.next_id(),
            user_id,
            author_id,
            created_at: OffsetDateTime::now_utc(),
        };
        state.follows.push(edge);
        Ok(true)
    }

    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        let before = state.follows.len();
        state
            .follows
            .retain(|edge| !(edge.user_id == user_id && edge.author_id == author_id));
        Ok(state.follows.len() < before)
    }

    async fn exists(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .follows
            .iter()
            .any(|edge| edge.user_id == user_id && edge.author_id == author_id))
    }
}

#[async_trait]
impl SessionsRepo for MemoryRepositories {
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionRecord, RepoError> {
        let mut state = self.state.write().await;
        let session = SessionRecord {
            id: Uuid::new_v4(),
            user_id: params.user_id,
            token_hash: params.token_hash,
            expires_at: params.expires_at,
            created_at: OffsetDateTime::now_utc(),
        };
        state.sessions.push(session.clone());
        Ok(session)
    }

    async fn find_active(
        &self,
        token_hash: &[u8],
        now: OffsetDateTime,
    ) -> Result<Option<SessionRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .sessions
            .iter()
            .find(|session| session.token_hash == token_hash && session.expires_at > now)
            .cloned())
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        state.sessions.retain(|session| session.id != id);
        Ok(())
    }
}

#[async_trait]
impl HealthRepo for MemoryRepositories {
    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;

    async fn user(repos: &MemoryRepositories, username: &str) -> UserRecord {
        repos
            .create_user(CreateUserParams {
                username: username.into(),
                first_name: String::new(),
                last_name: String::new(),
                email: String::new(),
                password_hash: String::new(),
            })
            .await
            .expect("user")
    }

    #[tokio::test]
    async fn duplicate_usernames_are_rejected() {
        let repos = MemoryRepositories::new();
        user(&repos, "leo").await;
        let err = repos
            .create_user(CreateUserParams {
                username: "leo".into(),
                first_name: String::new(),
                last_name: String::new(),
                email: String::new(),
                password_hash: String::new(),
            })
            .await
            .expect_err("duplicate");
        assert!(matches!(err, RepoError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn expired_sessions_are_not_active() {
        let repos = MemoryRepositories::new();
        let leo = user(&repos, "leo").await;
        let now = OffsetDateTime::now_utc();
        repos
            .create_session(CreateSessionParams {
                user_id: leo.id,
                token_hash: vec![1, 2, 3],
                expires_at: now - Duration::seconds(1),
            })
            .await
            .expect("session");

        assert!(
            repos
                .find_active(&[1, 2, 3], now)
                .await
                .expect("lookup")
                .is_none()
        );
    }

    #[tokio::test]
    async fn listing_skips_and_limits() {
        let repos = MemoryRepositories::new();
        let leo = user(&repos, "leo").await;
        let start = OffsetDateTime::now_utc();
        for i in 0..5 {
            repos
                .insert_post_at(leo.id, &i.to_string(), None, start + Duration::seconds(i))
                .await;
        }

        let page = repos
            .list_posts(PostFilter::Author(leo.id), 1, 2)
            .await
            .expect("list");
        let texts: Vec<_> = page.iter().map(|item| item.post.text.as_str()).collect();
        assert_eq!(texts, vec!["3", "2"]);
    }
}
