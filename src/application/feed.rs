use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::application::pagination::{Page, PageNumber, Paginator};
use crate::application::repos::{
    CommentsRepo, GroupsRepo, PostFilter, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{CommentListItem, GroupRecord, PostListItem, UserRecord};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group `{0}`")]
    UnknownGroup(String),
    #[error("unknown author `{0}`")]
    UnknownAuthor(String),
    #[error("unknown post {0}")]
    UnknownPost(i64),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct GroupFeed {
    pub group: GroupRecord,
    pub page: Page<PostListItem>,
}

#[derive(Debug, Clone)]
pub struct ProfileFeed {
    pub author: UserRecord,
    pub page: Page<PostListItem>,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostListItem,
    pub comments: Vec<CommentListItem>,
    pub author_post_count: u64,
}

/// Read side of the site: every listing is newest first and paginated.
#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    users: Arc<dyn UsersRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
    paginator: Paginator,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        users: Arc<dyn UsersRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
        paginator: Paginator,
    ) -> Self {
        Self {
            posts,
            users,
            groups,
            comments,
            paginator,
        }
    }

    pub async fn list_all_posts(
        &self,
        requested: PageNumber,
    ) -> Result<Page<PostListItem>, FeedError> {
        self.page_of(PostFilter::All, requested).await
    }

    pub async fn list_posts_by_group(
        &self,
        slug: &str,
        requested: PageNumber,
    ) -> Result<GroupFeed, FeedError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| FeedError::UnknownGroup(slug.to_string()))?;
        let page = self.page_of(PostFilter::Group(group.id), requested).await?;
        Ok(GroupFeed { group, page })
    }

    pub async fn list_posts_by_author(
        &self,
        username: &str,
        requested: PageNumber,
    ) -> Result<ProfileFeed, FeedError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| FeedError::UnknownAuthor(username.to_string()))?;
        let page = self.page_of(PostFilter::Author(author.id), requested).await?;
        Ok(ProfileFeed { author, page })
    }

    /// Posts by every author `user` follows. Empty when they follow nobody.
    pub async fn list_followed_feed(
        &self,
        user: &UserRecord,
        requested: PageNumber,
    ) -> Result<Page<PostListItem>, FeedError> {
        self.page_of(PostFilter::FollowedBy(user.id), requested).await
    }

    pub async fn post_detail(&self, id: i64) -> Result<PostDetail, FeedError> {
        let post = self
            .posts
            .find_by_id(id)
            .await?
            .ok_or(FeedError::UnknownPost(id))?;
        let comments = self.comments.list_for_post(id).await?;
        let author_post_count = self
            .posts
            .count_posts(PostFilter::Author(post.post.author_id))
            .await?;
        Ok(PostDetail {
            post,
            comments,
            author_post_count,
        })
    }

    pub async fn list_groups(&self) -> Result<Vec<GroupRecord>, FeedError> {
        Ok(self.groups.list_groups().await?)
    }

    async fn page_of(
        &self,
        filter: PostFilter,
        requested: PageNumber,
    ) -> Result<Page<PostListItem>, FeedError> {
        let total = self.posts.count_posts(filter).await?;
        let window = self.paginator.window(total, requested);
        let items = if window.limit == 0 {
            Vec::new()
        } else {
            self.posts
                .list_posts(filter, window.offset, window.limit)
                .await?
        };
        debug!(
            target = "yatube::feed",
            filter = ?filter,
            total,
            page = window.number,
            returned = items.len(),
            "listing resolved"
        );
        Ok(Page::new(items, window))
    }
}
