use async_trait::async_trait;
use sqlx::QueryBuilder;

use crate::application::repos::{PostFilter, PostsRepo, RepoError};
use crate::domain::entities::PostListItem;

use super::super::PostgresRepositories;
use super::types::{POST_LIST_SELECT, PostListRow};
use crate::infra::db::map_sqlx_error;

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn count_posts(&self, filter: PostFilter) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p");
        Self::apply_post_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostListItem>, RepoError> {
        let mut qb = QueryBuilder::new(POST_LIST_SELECT);
        Self::apply_post_filter(&mut qb, filter);
        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ");
        qb.push_bind(Self::convert_bound(limit)?);
        qb.push(" OFFSET ");
        qb.push_bind(Self::convert_bound(offset)?);

        let rows = qb
            .build_query_as::<PostListRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostListItem::from).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PostListItem>, RepoError> {
        let mut qb = QueryBuilder::new(POST_LIST_SELECT);
        qb.push(" WHERE p.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<PostListRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostListItem::from))
    }
}
