//! Postgres adapter tests; run with `cargo test -- --ignored` and `DATABASE_URL` set.

use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use yatube::application::repos::{
    CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams, CreateSessionParams,
    CreateUserParams, FollowsRepo, GroupsRepo, HealthRepo, PostFilter, PostsRepo, PostsWriteRepo,
    RepoError, SessionsRepo, UpdatePostParams, UsersRepo,
};
use yatube::domain::entities::{GroupRecord, UserRecord};
use yatube::infra::db::PostgresRepositories;

async fn user(repos: &PostgresRepositories, username: &str) -> UserRecord {
    repos
        .create_user(CreateUserParams {
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: format!("{username}@example.com"),
            password_hash: "!".to_string(),
        })
        .await
        .expect("create user")
}

async fn group(repos: &PostgresRepositories, slug: &str) -> GroupRecord {
    repos
        .create_group(CreateGroupParams {
            title: slug.to_uppercase(),
            slug: slug.to_string(),
            description: String::new(),
        })
        .await
        .expect("create group")
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres database"]
async fn listings_are_newest_first_and_filtered(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let leo = user(&repos, "leo").await;
    let cat = group(&repos, "cat").await;

    for i in 0..13 {
        repos
            .create_post(CreatePostParams {
                author_id: leo.id,
                text: format!("post {i}"),
                group_id: (i % 2 == 0).then_some(cat.id),
                image: None,
            })
            .await
            .expect("create post");
    }

    assert_eq!(repos.count_posts(PostFilter::All).await.expect("count"), 13);
    assert_eq!(
        repos
            .count_posts(PostFilter::Group(cat.id))
            .await
            .expect("count"),
        7
    );

    let first_page = repos
        .list_posts(PostFilter::All, 0, 10)
        .await
        .expect("page one");
    assert_eq!(first_page.len(), 10);
    assert_eq!(first_page[0].post.text, "post 12");
    assert_eq!(first_page[0].author_username, "leo");
    assert_eq!(first_page[0].group_slug.as_deref(), Some("cat"));

    let second_page = repos
        .list_posts(PostFilter::All, 10, 10)
        .await
        .expect("page two");
    assert_eq!(second_page.len(), 3);
    assert_eq!(second_page[2].post.text, "post 0");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres database"]
async fn duplicate_slug_and_username_are_reported(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    user(&repos, "leo").await;
    group(&repos, "cat").await;

    let err = repos
        .create_group(CreateGroupParams {
            title: "Other".into(),
            slug: "cat".into(),
            description: String::new(),
        })
        .await
        .expect_err("duplicate slug");
    assert!(matches!(err, RepoError::Duplicate { .. }));

    let err = repos
        .create_user(CreateUserParams {
            username: "leo".into(),
            first_name: String::new(),
            last_name: String::new(),
            email: "other@example.com".into(),
            password_hash: "!".into(),
        })
        .await
        .expect_err("duplicate username");
    assert!(matches!(err, RepoError::Duplicate { .. }));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres database"]
async fn follow_edges_are_unique_and_drive_the_feed(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let author = user(&repos, "author").await;
    let fan = user(&repos, "fan").await;
    let stranger = user(&repos, "stranger").await;

    assert!(repos.create_follow(fan.id, author.id).await.expect("follow"));
    assert!(!repos.create_follow(fan.id, author.id).await.expect("follow again"));
    assert!(repos.exists(fan.id, author.id).await.expect("exists"));

    repos
        .create_post(CreatePostParams {
            author_id: author.id,
            text: "for fans".into(),
            group_id: None,
            image: None,
        })
        .await
        .expect("post");

    let fan_feed = repos
        .list_posts(PostFilter::FollowedBy(fan.id), 0, 10)
        .await
        .expect("fan feed");
    assert_eq!(fan_feed.len(), 1);
    assert_eq!(
        repos
            .count_posts(PostFilter::FollowedBy(stranger.id))
            .await
            .expect("stranger feed"),
        0
    );

    assert!(repos.delete_follow(fan.id, author.id).await.expect("unfollow"));
    assert!(!repos.delete_follow(fan.id, author.id).await.expect("unfollow again"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres database"]
async fn edits_keep_author_and_comments_stay_ordered(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let leo = user(&repos, "leo").await;
    let reader = user(&repos, "reader").await;

    let post = repos
        .create_post(CreatePostParams {
            author_id: leo.id,
            text: "draft".into(),
            group_id: None,
            image: None,
        })
        .await
        .expect("post");
    let edited = repos
        .update_post(UpdatePostParams {
            id: post.id,
            text: "final".into(),
            group_id: None,
            image: Some("posts/cover.png".into()),
        })
        .await
        .expect("update");
    assert_eq!(edited.author_id, leo.id);
    assert_eq!(edited.created_at, post.created_at);
    assert_eq!(edited.image.as_deref(), Some("posts/cover.png"));

    for text in ["one", "two"] {
        repos
            .create_comment(CreateCommentParams {
                post_id: post.id,
                author_id: reader.id,
                text: text.into(),
            })
            .await
            .expect("comment");
    }
    let comments = repos.list_for_post(post.id).await.expect("comments");
    let texts: Vec<_> = comments.iter().map(|c| c.comment.text.as_str()).collect();
    assert_eq!(texts, ["one", "two"]);
    assert_eq!(comments[0].author_username, "reader");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres database"]
async fn sessions_expire(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let leo = user(&repos, "leo").await;
    let now = OffsetDateTime::now_utc();

    let session = repos
        .create_session(CreateSessionParams {
            user_id: leo.id,
            token_hash: vec![7; 32],
            expires_at: now + Duration::hours(1),
        })
        .await
        .expect("session");

    assert!(repos.find_active(&[7; 32], now).await.expect("lookup").is_some());
    assert!(
        repos
            .find_active(&[7; 32], now + Duration::hours(2))
            .await
            .expect("lookup")
            .is_none()
    );

    repos.delete_session(session.id).await.expect("delete");
    assert!(repos.find_active(&[7; 32], now).await.expect("lookup").is_none());
    repos.health_check().await.expect("health");
}
