use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::application::forms::{
    CommentInput, FieldErrors, PostInput, ValidPost, validate_comment, validate_post,
};
use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostsRepo, PostsWriteRepo,
    RepoError, UpdatePostParams,
};
use crate::domain::entities::{CommentRecord, PostListItem, PostRecord, UserRecord};
use crate::domain::permissions::{can_edit, can_mutate};
use crate::infra::uploads::{UploadStorage, UploadStorageError};

#[derive(Debug, Error)]
pub enum PostError {
    #[error("authentication required")]
    AuthenticationRequired,
    #[error("only the author may edit post {post_id}")]
    Forbidden { post_id: i64 },
    #[error("unknown post {0}")]
    NotFound(i64),
    #[error("invalid form: {0}")]
    Validation(FieldErrors),
    #[error("failed to store image")]
    Upload(#[source] UploadStorageError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Write side for posts and comments. Every operation runs the permission gate first.
#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    writes: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
    uploads: Arc<UploadStorage>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        writes: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
        uploads: Arc<UploadStorage>,
    ) -> Self {
        Self {
            posts,
            writes,
            groups,
            comments,
            uploads,
        }
    }

    pub async fn create_post(
        &self,
        actor: Option<&UserRecord>,
        input: PostInput,
    ) -> Result<PostRecord, PostError> {
        let author = match actor {
            Some(user) if can_mutate(actor) => user,
            _ => return Err(PostError::AuthenticationRequired),
        };
        let valid = self.validate(&input).await?;
        let image = self.store_image(&input).await?;

        let inserted = self
            .writes
            .create_post(CreatePostParams {
                author_id: author.id,
                text: valid.text,
                group_id: valid.group_id,
                image: image.clone(),
            })
            .await;
        let post = match inserted {
            Ok(post) => post,
            Err(err) => {
                if let Some(stored) = image.as_deref() {
                    self.discard_image(stored).await;
                }
                return Err(err.into());
            }
        };

        info!(
            target = "yatube::posts",
            post_id = post.id,
            author_id = author.id,
            group_id = ?post.group_id,
            has_image = post.image.is_some(),
            "post created"
        );
        Ok(post)
    }

    /// Load a post for its edit form, enforcing authorship.
    pub async fn load_for_edit(
        &self,
        actor: Option<&UserRecord>,
        post_id: i64,
    ) -> Result<PostListItem, PostError> {
        if !can_mutate(actor) {
            return Err(PostError::AuthenticationRequired);
        }
        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(PostError::NotFound(post_id))?;
        if !can_edit(&post.post, actor) {
            return Err(PostError::Forbidden { post_id });
        }
        Ok(post)
    }

    pub async fn edit_post(
        &self,
        actor: Option<&UserRecord>,
        post_id: i64,
        input: PostInput,
    ) -> Result<PostRecord, PostError> {
        let existing = self.load_for_edit(actor, post_id).await?;
        let valid = self.validate(&input).await?;
        let replacement = self.store_image(&input).await?;
        let image = replacement.clone().or_else(|| existing.post.image.clone());

        let updated = self
            .writes
            .update_post(UpdatePostParams {
                id: post_id,
                text: valid.text,
                group_id: valid.group_id,
                image,
            })
            .await;
        let post = match updated {
            Ok(post) => post,
            Err(err) => {
                if let Some(stored) = replacement.as_deref() {
                    self.discard_image(stored).await;
                }
                return Err(err.into());
            }
        };

        if replacement.is_some()
            && let Some(old) = existing.post.image.as_deref()
        {
            self.discard_image(old).await;
        }

        info!(
            target = "yatube::posts",
            post_id,
            author_id = post.author_id,
            "post edited"
        );
        Ok(post)
    }

    pub async fn add_comment(
        &self,
        actor: Option<&UserRecord>,
        post_id: i64,
        input: CommentInput,
    ) -> Result<CommentRecord, PostError> {
        let author = actor.ok_or(PostError::AuthenticationRequired)?;
        if self.posts.find_by_id(post_id).await?.is_none() {
            return Err(PostError::NotFound(post_id));
        }
        let text = validate_comment(&input).map_err(PostError::Validation)?;

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id,
                author_id: author.id,
                text,
            })
            .await?;

        info!(
            target = "yatube::posts",
            post_id,
            comment_id = comment.id,
            author_id = author.id,
            "comment added"
        );
        Ok(comment)
    }

    async fn validate(&self, input: &PostInput) -> Result<ValidPost, PostError> {
        let valid = validate_post(input).map_err(PostError::Validation)?;
        if let Some(group_id) = valid.group_id
            && self.groups.find_by_id(group_id).await?.is_none()
        {
            return Err(PostError::Validation(FieldErrors::single(
                "group",
                "Select a valid choice. That choice is not one of the available choices.",
            )));
        }
        Ok(valid)
    }

    async fn store_image(&self, input: &PostInput) -> Result<Option<String>, PostError> {
        let Some(image) = input.image.as_ref() else {
            return Ok(None);
        };
        match self
            .uploads
            .store_post_image(&image.filename, image.data.clone())
            .await
        {
            Ok(stored) => Ok(Some(stored)),
            Err(err) => {
                warn!(
                    target = "yatube::posts",
                    filename = %image.filename,
                    error = %err,
                    "image upload failed"
                );
                Err(PostError::Upload(err))
            }
        }
    }

    /// Best-effort removal of an image its post no longer references.
    async fn discard_image(&self, stored_path: &str) {
        if let Err(err) = self.uploads.delete(stored_path).await {
            warn!(
                target = "yatube::posts",
                path = stored_path,
                error = %err,
                "failed to remove replaced image"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::application::forms::ImageUpload;
    use crate::application::repos::{CreateGroupParams, CreateUserParams, UsersRepo};
    use crate::infra::memory::MemoryRepositories;

    const TINY_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
        0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
    ];

    struct Fixture {
        repos: Arc<MemoryRepositories>,
        service: PostService,
        _media: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let repos = Arc::new(MemoryRepositories::new());
        let media = tempfile::tempdir().expect("tempdir");
        let uploads =
            Arc::new(UploadStorage::new(media.path().to_path_buf()).expect("upload storage"));
        let service = PostService::new(
            repos.clone(),
            repos.clone(),
            repos.clone(),
            repos.clone(),
            uploads,
        );
        Fixture {
            repos,
            service,
            _media: media,
        }
    }

    async fn user(repos: &MemoryRepositories, username: &str) -> UserRecord {
        repos
            .create_user(CreateUserParams {
                username: username.into(),
                first_name: String::new(),
                last_name: String::new(),
                email: format!("{username}@example.com"),
                password_hash: String::new(),
            })
            .await
            .expect("user")
    }

    fn input(text: &str) -> PostInput {
        PostInput {
            text: text.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn anonymous_cannot_create() {
        let Fixture { repos, service, .. } = fixture();
        assert!(matches!(
            service.create_post(None, input("hi")).await,
            Err(PostError::AuthenticationRequired)
        ));
        assert_eq!(repos.post_count().await, 0);
    }

    #[tokio::test]
    async fn create_with_group_and_image() {
        let Fixture { repos, service, .. } = fixture();
        let leo = user(&repos, "leo").await;
        let cats = repos
            .create_group(CreateGroupParams {
                title: "Котики".into(),
                slug: "cat".into(),
                description: String::new(),
            })
            .await
            .expect("group");

        let post = service
            .create_post(
                Some(&leo),
                PostInput {
                    text: "Текст о котике".into(),
                    group: cats.id.to_string(),
                    image: Some(ImageUpload {
                        filename: "small.gif".into(),
                        data: Bytes::from_static(TINY_GIF),
                    }),
                },
            )
            .await
            .expect("created");

        assert_eq!(post.author_id, leo.id);
        assert_eq!(post.group_id, Some(cats.id));
        assert!(
            post.image
                .as_deref()
                .is_some_and(|path| path.starts_with("posts/"))
        );
    }

    #[tokio::test]
    async fn unknown_group_is_a_field_error() {
        let Fixture { repos, service, .. } = fixture();
        let leo = user(&repos, "leo").await;

        match service
            .create_post(
                Some(&leo),
                PostInput {
                    text: "x".into(),
                    group: "999".into(),
                    image: None,
                },
            )
            .await
        {
            Err(PostError::Validation(errors)) => assert!(errors.has("group")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn only_author_can_edit() {
        let Fixture { repos, service, .. } = fixture();
        let leo = user(&repos, "leo").await;
        let other = user(&repos, "other").await;
        let post = service
            .create_post(Some(&leo), input("original"))
            .await
            .expect("created");

        assert!(matches!(
            service
                .edit_post(Some(&other), post.id, input("hijacked"))
                .await,
            Err(PostError::Forbidden { .. })
        ));
        assert!(matches!(
            service.edit_post(None, post.id, input("hijacked")).await,
            Err(PostError::AuthenticationRequired)
        ));

        let edited = service
            .edit_post(Some(&leo), post.id, input("edited"))
            .await
            .expect("edited");
        assert_eq!(edited.text, "edited");
        assert_eq!(edited.created_at, post.created_at);
    }

    #[tokio::test]
    async fn edit_keeps_existing_image_when_none_uploaded() {
        let Fixture { repos, service, .. } = fixture();
        let leo = user(&repos, "leo").await;
        let post = service
            .create_post(
                Some(&leo),
                PostInput {
                    text: "with image".into(),
                    group: String::new(),
                    image: Some(ImageUpload {
                        filename: "small.gif".into(),
                        data: Bytes::from_static(TINY_GIF),
                    }),
                },
            )
            .await
            .expect("created");

        let edited = service
            .edit_post(Some(&leo), post.id, input("new text"))
            .await
            .expect("edited");
        assert_eq!(edited.image, post.image);
    }

    #[tokio::test]
    async fn failed_insert_leaves_no_stored_image() {
        let Fixture {
            repos,
            service,
            _media: media,
        } = fixture();
        let mut unknown = user(&repos, "leo").await;
        unknown.id = 9999;

        let result = service
            .create_post(
                Some(&unknown),
                PostInput {
                    text: "never saved".into(),
                    group: String::new(),
                    image: Some(ImageUpload {
                        filename: "a.gif".into(),
                        data: Bytes::from_static(TINY_GIF),
                    }),
                },
            )
            .await;

        assert!(matches!(result, Err(PostError::Repo(_))));
        let mut left = Vec::new();
        if let Ok(entries) = std::fs::read_dir(media.path().join("posts")) {
            left.extend(entries.filter_map(Result::ok).map(|entry| entry.file_name()));
        }
        assert!(left.is_empty(), "stored files left behind: {left:?}");
    }

    #[tokio::test]
    async fn replacing_an_image_removes_the_old_file() {
        let Fixture {
            repos,
            service,
            _media: media,
        } = fixture();
        let leo = user(&repos, "leo").await;
        let gif = || ImageUpload {
            filename: "small.gif".into(),
            data: Bytes::from_static(TINY_GIF),
        };
        let post = service
            .create_post(
                Some(&leo),
                PostInput {
                    text: "with image".into(),
                    group: String::new(),
                    image: Some(gif()),
                },
            )
            .await
            .expect("created");
        let old = post.image.clone().expect("stored image");

        let edited = service
            .edit_post(
                Some(&leo),
                post.id,
                PostInput {
                    text: "new image".into(),
                    group: String::new(),
                    image: Some(gif()),
                },
            )
            .await
            .expect("edited");

        let new = edited.image.expect("replacement image");
        assert_ne!(new, old);
        assert!(media.path().join(&new).exists());
        assert!(!media.path().join(&old).exists());
    }

    #[tokio::test]
    async fn comments_require_user_and_existing_post() {
        let Fixture { repos, service, .. } = fixture();
        let leo = user(&repos, "leo").await;
        let post = service
            .create_post(Some(&leo), input("post"))
            .await
            .expect("created");

        assert!(matches!(
            service
                .add_comment(None, post.id, CommentInput { text: "hi".into() })
                .await,
            Err(PostError::AuthenticationRequired)
        ));
        assert!(matches!(
            service
                .add_comment(Some(&leo), 9999, CommentInput { text: "hi".into() })
                .await,
            Err(PostError::NotFound(9999))
        ));

        let comment = service
            .add_comment(Some(&leo), post.id, CommentInput { text: "hi".into() })
            .await
            .expect("comment");
        assert_eq!(comment.post_id, post.id);
    }
}
