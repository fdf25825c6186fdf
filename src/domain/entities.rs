//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::posts::title_of;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

impl UserRecord {
    pub fn display_name(&self) -> String {
        display_name(&self.username, &self.first_name, &self.last_name)
    }
}

/// "First Last" when either is set, otherwise the username.
pub fn display_name(username: &str, first_name: &str, last_name: &str) -> String {
    let full = format!("{} {}", first_name.trim(), last_name.trim());
    let full = full.trim();
    if full.is_empty() {
        username.to_string()
    } else {
        full.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRecord {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: i64,
    pub author_id: i64,
    pub text: String,
    pub image: Option<String>,
    pub group_id: Option<i64>,
    pub created_at: OffsetDateTime,
}

impl PostRecord {
    pub fn title(&self) -> String {
        title_of(&self.text)
    }
}

/// A post joined with the author and group columns listings display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostListItem {
    pub post: PostRecord,
    pub author_username: String,
    pub author_name: String,
    pub group_slug: Option<String>,
    pub group_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentListItem {
    pub comment: CommentRecord,
    pub author_username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FollowRecord {
    pub id: i64,
    pub user_id: i64,
    pub author_id: i64,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: i64,
    pub token_hash: Vec<u8>,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str) -> UserRecord {
        UserRecord {
            id: 1,
            username: "leo".into(),
            first_name: first.into(),
            last_name: last.into(),
            email: "leo@example.com".into(),
            password_hash: String::new(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn display_name_prefers_full_name() {
        assert_eq!(user("Лев", "Толстой").display_name(), "Лев Толстой");
        assert_eq!(user("", "Толстой").display_name(), "Толстой");
        assert_eq!(user(" ", "").display_name(), "leo");
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let mut record = user("", "");
        record.password_hash = "$argon2id$secret".into();
        let json = serde_json::to_string(&record).expect("serialize");
        assert!(!json.contains("argon2"));
    }
}
