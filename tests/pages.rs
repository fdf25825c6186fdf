mod support;

use axum::http::{StatusCode, header};
use support::{TestApp, body_text, card_count};
use yatube::{
    domain::permissions::can_edit,
    infra::http::{REQUEST_ID_HEADER, RequestId},
};

#[tokio::test]
async fn public_pages_render() {
    let app = TestApp::new();
    let leo = app.user("leo").await;
    app.group("Cats", "cat").await;

    for uri in [
        "/",
        "/group/cat/",
        "/profile/leo/",
        "/about/author/",
        "/about/tech/",
        "/auth/login/",
        "/auth/signup/",
    ] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {uri}");
    }

    let cookie = app.session_cookie(&leo).await;
    for uri in ["/create/", "/follow/"] {
        let response = app.get(uri, Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {uri}");
    }
}

#[tokio::test]
async fn unknown_resources_render_not_found_page() {
    let app = TestApp::new();

    for uri in [
        "/group/nope/",
        "/profile/ghost/",
        "/posts/404/",
        "/posts/abc/",
        "/unexisting_page/",
    ] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "GET {uri}");
        let html = body_text(response).await;
        assert!(html.contains("Page not found"), "GET {uri}: {html}");
    }
}

#[tokio::test]
async fn malformed_post_ids_render_not_found_for_signed_in_routes() {
    let app = TestApp::new();
    let leo = app.user("leo").await;
    let cookie = app.session_cookie(&leo).await;

    let response = app.get("/posts/abc/edit/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("Page not found"));

    for uri in ["/posts/abc/edit/", "/posts/abc/comment/"] {
        let response = app.post_form(uri, "text=hello", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "POST {uri}");
    }
}

#[tokio::test]
async fn post_created_with_group_is_listed_everywhere_it_belongs() {
    let mut app = TestApp::new();
    let leo = app.user("leo").await;
    let other = app.user("other").await;
    let cat = app.group("Cats", "cat").await;
    let dog = app.group("Dogs", "dog").await;
    let post = app.post(&leo, "Текст о котике", Some(cat.id)).await;

    let group_page = app.page("/group/cat/", None).await;
    assert_eq!(card_count(&group_page), 1);
    assert!(group_page.contains("Текст о котике"));

    assert!(app.page("/", None).await.contains("Текст о котике"));
    assert!(app.page("/profile/leo/", None).await.contains("Текст о котике"));
    assert_eq!(card_count(&app.page("/group/dog/", None).await), 0);
    assert_eq!(dog.slug, "dog");

    assert!(can_edit(&post, Some(&leo)));
    assert!(!can_edit(&post, Some(&other)));
    assert!(!can_edit(&post, None));
}

#[tokio::test]
async fn listings_paginate_ten_per_page() {
    let mut app = TestApp::new();
    let leo = app.user("leo").await;
    let cat = app.group("Cats", "cat").await;
    for i in 0..13 {
        app.post(&leo, &format!("post number {i}"), Some(cat.id)).await;
    }

    for base in ["/", "/group/cat/", "/profile/leo/"] {
        let first = app.page(base, None).await;
        assert_eq!(card_count(&first), 10, "{base}");
        assert!(first.contains("post number 12"), "{base} newest first");

        let second = app.page(&format!("{base}?page=2"), None).await;
        assert_eq!(card_count(&second), 3, "{base}?page=2");
        assert!(second.contains("post number 0"));
    }

    assert_eq!(card_count(&app.page("/?page=abc", None).await), 10);
    assert_eq!(card_count(&app.page("/?page=99", None).await), 3);
    assert_eq!(card_count(&app.page("/?page=-1", None).await), 10);
}

#[tokio::test]
async fn post_detail_shows_comments_and_author_stats() {
    let mut app = TestApp::new();
    let leo = app.user("leo").await;
    let post = app.post(&leo, "first", None).await;
    app.post(&leo, "second", None).await;

    let html = app.page(&format!("/posts/{}/", post.id), None).await;
    assert!(html.contains("Posts by this author: 2"));
    assert!(html.contains("No comments yet."));
    // Anonymous viewers get neither the edit link nor the comment form.
    assert!(!html.contains("/edit/"));
    assert!(!html.contains("/comment/"));

    let cookie = app.session_cookie(&leo).await;
    let html = app.page(&format!("/posts/{}/", post.id), Some(&cookie)).await;
    assert!(html.contains(&format!("/posts/{}/edit/", post.id)));
    assert!(html.contains(&format!("/posts/{}/comment/", post.id)));
}

#[tokio::test]
async fn stylesheet_and_health_are_served() {
    let app = TestApp::new();

    let response = app.get("/static/style.css", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
        Some(b"text/css".as_slice())
    );

    let response = app.get("/static/missing.css", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.get("/_health/db", None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let id = response
        .extensions()
        .get::<RequestId>()
        .expect("request id extension");
    assert_eq!(
        response.headers().get(REQUEST_ID_HEADER).map(|v| v.as_bytes()),
        Some(id.0.to_string().as_bytes())
    );
}
