use time::OffsetDateTime;

use crate::domain::entities::{PostListItem, PostRecord, display_name};

/// Columns and joins shared by every post listing; callers append filters.
pub(crate) const POST_LIST_SELECT: &str = "SELECT p.id, p.author_id, p.text, p.image, \
     p.group_id, p.created_at, u.username AS author_username, \
     u.first_name AS author_first_name, u.last_name AS author_last_name, \
     g.slug AS group_slug, g.title AS group_title \
     FROM posts p \
     INNER JOIN users u ON u.id = p.author_id \
     LEFT JOIN groups g ON g.id = p.group_id";

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    pub(crate) id: i64,
    pub(crate) author_id: i64,
    pub(crate) text: String,
    pub(crate) image: Option<String>,
    pub(crate) group_id: Option<i64>,
    pub(crate) created_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            author_id: row.author_id,
            text: row.text,
            image: row.image,
            group_id: row.group_id,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PostListRow {
    pub(crate) id: i64,
    pub(crate) author_id: i64,
    pub(crate) text: String,
    pub(crate) image: Option<String>,
    pub(crate) group_id: Option<i64>,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) author_username: String,
    pub(crate) author_first_name: String,
    pub(crate) author_last_name: String,
    pub(crate) group_slug: Option<String>,
    pub(crate) group_title: Option<String>,
}

impl From<PostListRow> for PostListItem {
    fn from(row: PostListRow) -> Self {
        let author_name = display_name(
            &row.author_username,
            &row.author_first_name,
            &row.author_last_name,
        );
        Self {
            post: PostRecord {
                id: row.id,
                author_id: row.author_id,
                text: row.text,
                image: row.image,
                group_id: row.group_id,
                created_at: row.created_at,
            },
            author_username: row.author_username,
            author_name,
            group_slug: row.group_slug,
            group_title: row.group_title,
        }
    }
}
