//! End-to-end request flows against a live Postgres (and Redis for the
//! home-page cache test). Run with:
//!
//! ```sh
//! TEST_DATABASE_URL=postgres://localhost/blog_test \
//! TEST_REDIS_URL=redis://127.0.0.1:6379 \
//!     cargo test -p blog-service -- --ignored
//! ```
//!
//! The suite is `#[ignore]`d so the default `cargo test` run stays hermetic;
//! tests are serialized because the global feed and the cache slot are
//! shared state.

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use blog_service::auth::{AuthSettings, Claims};
use blog_service::cache::IndexCache;
use blog_service::handlers;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use redis::aio::ConnectionManager;
use serial_test::serial;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

const SECRET: &str = "integration-test-secret";

async fn test_pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    pool
}

async fn test_cache(ttl_secs: u64) -> Arc<IndexCache> {
    let url = std::env::var("TEST_REDIS_URL")
        .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let client = redis::Client::open(url.as_str()).expect("redis client");
    let manager = ConnectionManager::new(client).await.expect("redis connection");
    Arc::new(IndexCache::new(manager, ttl_secs))
}

fn bearer(user_id: Uuid) -> (header::HeaderName, String) {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now().timestamp() + 3600) as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("encode token");
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

async fn create_user(pool: &PgPool, prefix: &str) -> (Uuid, String) {
    let username = format!("{prefix}-{}", Uuid::new_v4().simple());
    let (id,): (Uuid,) = sqlx::query_as("INSERT INTO users (username) VALUES ($1) RETURNING id")
        .bind(&username)
        .fetch_one(pool)
        .await
        .expect("insert user");
    (id, username)
}

async fn create_group(pool: &PgPool) -> (Uuid, String) {
    let slug = format!("g-{}", Uuid::new_v4().simple());
    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO groups (title, slug, description) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(format!("Group {slug}"))
    .bind(&slug)
    .bind("test group")
    .fetch_one(pool)
    .await
    .expect("insert group");
    (id, slug)
}

async fn create_post(pool: &PgPool, author_id: Uuid, group_id: Option<Uuid>, text: &str) -> Uuid {
    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO posts (text, author_id, group_id) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(text)
    .bind(author_id)
    .bind(group_id)
    .fetch_one(pool)
    .await
    .expect("insert post");
    id
}

async fn count_posts_by(pool: &PgPool, author_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(pool)
        .await
        .expect("count posts")
}

async fn count_follows(pool: &PgPool, user_id: Uuid, author_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .fetch_one(pool)
        .await
        .expect("count follows")
}

macro_rules! spawn_app {
    ($pool:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($pool.clone()))
                .app_data(web::Data::new(AuthSettings::new(SECRET)))
                .configure(handlers::routes),
        )
        .await
    };
    ($pool:expr, $cache:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($pool.clone()))
                .app_data(web::Data::new(AuthSettings::new(SECRET)))
                .app_data(web::Data::new($cache.clone()))
                .configure(handlers::routes),
        )
        .await
    };
}

fn location(resp: &actix_web::dev::ServiceResponse) -> String {
    resp.headers()
        .get(header::LOCATION)
        .expect("Location header")
        .to_str()
        .expect("utf-8 location")
        .to_string()
}

#[actix_web::test]
#[ignore = "requires TEST_DATABASE_URL"]
#[serial]
async fn anonymous_create_post_redirects_to_login() {
    let pool = test_pool().await;
    let app = spawn_app!(pool);

    let before: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(&pool)
        .await
        .unwrap();

    let req = test::TestRequest::post()
        .uri("/create/")
        .set_form([("text", "from a guest")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/?next=/create/");

    let after: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(after, before);
}

#[actix_web::test]
#[ignore = "requires TEST_DATABASE_URL"]
#[serial]
async fn create_post_persists_and_redirects_to_profile() {
    let pool = test_pool().await;
    let app = spawn_app!(pool);
    let (author_id, username) = create_user(&pool, "author").await;
    let (group_id, _) = create_group(&pool).await;

    let req = test::TestRequest::post()
        .uri("/create/")
        .insert_header(bearer(author_id))
        .set_form([
            ("text", "a brand new post".to_string()),
            ("group", group_id.to_string()),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/profile/{username}/"));
    assert_eq!(count_posts_by(&pool, author_id).await, 1);

    let (text, stored_group): (String, Option<Uuid>) =
        sqlx::query_as("SELECT text, group_id FROM posts WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(text, "a brand new post");
    assert_eq!(stored_group, Some(group_id));
}

#[actix_web::test]
#[ignore = "requires TEST_DATABASE_URL"]
#[serial]
async fn blank_text_rerenders_form_with_errors() {
    let pool = test_pool().await;
    let app = spawn_app!(pool);
    let (author_id, _) = create_user(&pool, "author").await;

    let req = test::TestRequest::post()
        .uri("/create/")
        .insert_header(bearer(author_id))
        .set_form([("text", "   ")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"]["text"][0], "This field is required.");
    assert_eq!(count_posts_by(&pool, author_id).await, 0);
}

#[actix_web::test]
#[ignore = "requires TEST_DATABASE_URL"]
#[serial]
async fn edit_by_non_author_is_silently_redirected() {
    let pool = test_pool().await;
    let app = spawn_app!(pool);
    let (author_id, _) = create_user(&pool, "author").await;
    let (intruder_id, _) = create_user(&pool, "intruder").await;
    let post_id = create_post(&pool, author_id, None, "original text").await;

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{post_id}/edit/"))
        .insert_header(bearer(intruder_id))
        .set_form([("text", "hijacked")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{post_id}/"));

    let (text,): (String,) = sqlx::query_as("SELECT text FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(text, "original text");
}

#[actix_web::test]
#[ignore = "requires TEST_DATABASE_URL"]
#[serial]
async fn author_edit_updates_in_place() {
    let pool = test_pool().await;
    let app = spawn_app!(pool);
    let (author_id, _) = create_user(&pool, "author").await;
    let (group_id, _) = create_group(&pool).await;
    let post_id = create_post(&pool, author_id, None, "original text").await;

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{post_id}/edit/"))
        .insert_header(bearer(author_id))
        .set_form([
            ("text", "revised text".to_string()),
            ("group", group_id.to_string()),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{post_id}/"));

    let (text, stored_group, stored_author): (String, Option<Uuid>, Uuid) =
        sqlx::query_as("SELECT text, group_id, author_id FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(text, "revised text");
    assert_eq!(stored_group, Some(group_id));
    assert_eq!(stored_author, author_id);
    assert_eq!(count_posts_by(&pool, author_id).await, 1);
}

#[actix_web::test]
#[ignore = "requires TEST_DATABASE_URL"]
#[serial]
async fn comment_flow_persists_and_swallows_invalid_forms() {
    let pool = test_pool().await;
    let app = spawn_app!(pool);
    let (author_id, _) = create_user(&pool, "author").await;
    let (commenter_id, _) = create_user(&pool, "commenter").await;
    let post_id = create_post(&pool, author_id, None, "worth discussing").await;

    // Valid comment lands and redirects to the detail view.
    let req = test::TestRequest::post()
        .uri(&format!("/posts/{post_id}/comment/"))
        .insert_header(bearer(commenter_id))
        .set_form([("text", "nice post")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{post_id}/"));

    // Blank comment is discarded, redirect happens anyway.
    let req = test::TestRequest::post()
        .uri(&format!("/posts/{post_id}/comment/"))
        .insert_header(bearer(commenter_id))
        .set_form([("text", "   ")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let comment_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(comment_count, 1);

    // Unknown and malformed post ids are 404s.
    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/comment/", Uuid::new_v4()))
        .insert_header(bearer(commenter_id))
        .set_form([("text", "lost")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri("/posts/42/comment/")
        .insert_header(bearer(commenter_id))
        .set_form([("text", "lost")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // The comment shows up on the detail document.
    let req = test::TestRequest::get()
        .uri(&format!("/posts/{post_id}/"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["comments"][0]["text"], "nice post");
    assert_eq!(body["num_posts"], 1);
}

#[actix_web::test]
#[ignore = "requires TEST_DATABASE_URL"]
#[serial]
async fn follow_unfollow_lifecycle() {
    let pool = test_pool().await;
    let app = spawn_app!(pool);
    let (author_id, author_name) = create_user(&pool, "author").await;
    let (follower_id, _) = create_user(&pool, "follower").await;
    let post_id = create_post(&pool, author_id, None, "follow me").await;

    // Following twice keeps a single edge.
    for _ in 0..2 {
        let req = test::TestRequest::get()
            .uri(&format!("/profile/{author_name}/follow/"))
            .insert_header(bearer(follower_id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), format!("/profile/{author_name}/"));
    }
    assert_eq!(count_follows(&pool, follower_id, author_id).await, 1);

    // The profile reports the relationship to the authenticated viewer.
    let req = test::TestRequest::get()
        .uri(&format!("/profile/{author_name}/"))
        .insert_header(bearer(follower_id))
        .to_request();
    let body: serde_json::Value =
        test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["following"], true);

    // Anonymous viewers get no flag at all.
    let req = test::TestRequest::get()
        .uri(&format!("/profile/{author_name}/"))
        .to_request();
    let body: serde_json::Value =
        test::read_body_json(test::call_service(&app, req).await).await;
    assert!(body.get("following").is_none());

    // The followed feed carries the author's post.
    let req = test::TestRequest::get()
        .uri("/follow/")
        .insert_header(bearer(follower_id))
        .to_request();
    let body: serde_json::Value =
        test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["posts"][0]["id"], post_id.to_string());

    // Self-follow is a silent no-op.
    let req = test::TestRequest::get()
        .uri(&format!("/profile/{author_name}/follow/"))
        .insert_header(bearer(author_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(count_follows(&pool, author_id, author_id).await, 0);

    // Unfollow removes the edge; a second unfollow is a 404.
    let req = test::TestRequest::get()
        .uri(&format!("/profile/{author_name}/unfollow/"))
        .insert_header(bearer(follower_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(count_follows(&pool, follower_id, author_id).await, 0);

    let req = test::TestRequest::get()
        .uri(&format!("/profile/{author_name}/unfollow/"))
        .insert_header(bearer(follower_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
#[ignore = "requires TEST_DATABASE_URL"]
#[serial]
async fn feeds_paginate_ten_per_page_and_clamp() {
    let pool = test_pool().await;
    let app = spawn_app!(pool);
    let (author_id, username) = create_user(&pool, "prolific").await;
    let (group_id, slug) = create_group(&pool).await;

    for i in 0..11 {
        create_post(&pool, author_id, Some(group_id), &format!("post {i}")).await;
    }

    for base in [format!("/group/{slug}/"), format!("/profile/{username}/")] {
        let req = test::TestRequest::get().uri(&base).to_request();
        let body: serde_json::Value =
            test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["posts"].as_array().unwrap().len(), 10, "base={base}");
        assert_eq!(body["page"]["total_pages"], 2);

        let req = test::TestRequest::get()
            .uri(&format!("{base}?page=2"))
            .to_request();
        let body: serde_json::Value =
            test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["posts"].as_array().unwrap().len(), 1, "base={base}");

        // Past-the-end clamps to the last page, junk falls back to the first.
        let req = test::TestRequest::get()
            .uri(&format!("{base}?page=99"))
            .to_request();
        let body: serde_json::Value =
            test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["page"]["number"], 2, "base={base}");
        assert_eq!(body["posts"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::get()
            .uri(&format!("{base}?page=abc"))
            .to_request();
        let body: serde_json::Value =
            test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["page"]["number"], 1, "base={base}");
        assert_eq!(body["posts"].as_array().unwrap().len(), 10);
    }

    // Profile also reports the author's total post count.
    let req = test::TestRequest::get()
        .uri(&format!("/profile/{username}/"))
        .to_request();
    let body: serde_json::Value =
        test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["num_posts"], 11);

    // Unknown slugs and usernames are 404s.
    let req = test::TestRequest::get().uri("/group/no-such-slug/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri("/profile/no-such-user/")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
#[ignore = "requires TEST_DATABASE_URL and TEST_REDIS_URL"]
#[serial]
async fn index_cache_serves_stale_bytes_until_cleared() {
    let pool = test_pool().await;
    let cache = test_cache(20).await;
    let app = spawn_app!(pool, cache);
    let (author_id, _) = create_user(&pool, "cached").await;
    let post_id = create_post(&pool, author_id, None, "soon to vanish").await;

    cache.clear().await.expect("clear cache");

    let req = test::TestRequest::get().uri("/").to_request();
    let first = test::call_and_read_body(&app, req).await;

    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(post_id)
        .execute(&pool)
        .await
        .expect("delete post");

    // Within the TTL the deletion is invisible, byte for byte.
    let req = test::TestRequest::get().uri("/").to_request();
    let second = test::call_and_read_body(&app, req).await;
    assert_eq!(first, second);

    cache.clear().await.expect("clear cache");

    let req = test::TestRequest::get().uri("/").to_request();
    let third = test::call_and_read_body(&app, req).await;
    assert_ne!(first, third);
}
