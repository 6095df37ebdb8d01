//! HTTP surface tests using `actix_web::test` against the in-memory repository.

mod common;

use actix_web::{http::StatusCode, test, web, App};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{create_group, create_user, png_bytes, test_env, test_env_with_cache, TestEnv};
use serde_json::{json, Value};
use std::time::Duration;
use yatube_service::cache::ListingCache;
use yatube_service::middleware::USER_ID_HEADER;
use yatube_service::{handlers, metrics};

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .route("/metrics", web::get().to(metrics::serve_metrics))
                .configure(handlers::configure),
        )
        .await
    };
}

fn as_user(req: test::TestRequest, user_id: i64) -> test::TestRequest {
    req.insert_header((USER_ID_HEADER, user_id.to_string()))
}

async fn seeded() -> (TestEnv, i64, i64) {
    let env = test_env();
    let leo = create_user(env.repo(), "leo").await;
    let reader = create_user(env.repo(), "reader").await;
    create_group(env.repo(), "classics").await;
    (env, leo.id, reader.id)
}

#[actix_web::test]
async fn create_and_fetch_post() {
    let (env, leo, _) = seeded().await;
    let TestEnv { state, media_dir } = env;
    let app = init_app!(state);

    let req = as_user(test::TestRequest::post().uri("/api/v1/posts"), leo)
        .set_json(json!({
            "text": "Anna Karenina",
            "group_id": 1,
            "image": { "filename": "cover.png", "data": STANDARD.encode(png_bytes()) }
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["text"], "Anna Karenina");
    assert_eq!(created["group_id"], 1);
    let image = created["image"].as_str().unwrap().to_string();
    assert!(media_dir.path().join(&image).is_file());

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/posts/{}", created["id"]))
        .to_request();
    let fetched: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched, created);
}

#[actix_web::test]
async fn writes_require_identity() {
    let (env, _, _) = seeded().await;
    let app = init_app!(env.state);

    let req = test::TestRequest::post()
        .uri("/api/v1/posts")
        .set_json(json!({ "text": "anonymous" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "unauthorized");

    let req = test::TestRequest::get()
        .uri("/api/v1/follow")
        .insert_header((USER_ID_HEADER, "not-a-number"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn invalid_posts_map_to_400() {
    let (env, leo, _) = seeded().await;
    let app = init_app!(env.state);

    let req = as_user(test::TestRequest::post().uri("/api/v1/posts"), leo)
        .set_json(json!({ "text": "" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "validation_error");

    let req = as_user(test::TestRequest::post().uri("/api/v1/posts"), leo)
        .set_json(json!({
            "text": "attachment",
            "image": { "filename": "notes.txt", "data": STANDARD.encode(b"plain text") }
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "invalid_image");

    let req = test::TestRequest::get().uri("/api/v1/posts").to_request();
    let listing: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listing["count"], 0);
    assert_eq!(listing["num_pages"], 0);
}

#[actix_web::test]
async fn edit_and_delete_are_author_only() {
    let (env, leo, reader) = seeded().await;
    let app = init_app!(env.state);

    let req = as_user(test::TestRequest::post().uri("/api/v1/posts"), leo)
        .set_json(json!({ "text": "draft", "group_id": 1 }))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let uri = format!("/api/v1/posts/{}", created["id"]);

    let req = as_user(test::TestRequest::put().uri(&uri), reader)
        .set_json(json!({ "text": "defaced" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    // PATCH keeps the group when it is absent from the body
    let req = as_user(test::TestRequest::patch().uri(&uri), leo)
        .set_json(json!({ "text": "final" }))
        .to_request();
    let patched: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(patched["text"], "final");
    assert_eq!(patched["group_id"], 1);

    // PUT overwrites it
    let req = as_user(test::TestRequest::put().uri(&uri), leo)
        .set_json(json!({ "text": "ungrouped" }))
        .to_request();
    let replaced: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(replaced["group_id"], Value::Null);

    let req = as_user(test::TestRequest::delete().uri(&uri), reader).to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let req = as_user(test::TestRequest::delete().uri(&uri), leo).to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NO_CONTENT
    );

    let req = test::TestRequest::get().uri(&uri).to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn follow_flow_and_feed() {
    let (env, leo, reader) = seeded().await;
    let app = init_app!(env.state);

    let req = as_user(test::TestRequest::post().uri("/api/v1/posts"), leo)
        .set_json(json!({ "text": "for my followers" }))
        .to_request();
    let post: Value = test::call_and_read_body_json(&app, req).await;

    for expected_change in [true, false] {
        let req = as_user(
            test::TestRequest::post().uri("/api/v1/profiles/leo/follow"),
            reader,
        )
        .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["following"], true);
        assert_eq!(body["changed"], expected_change);
    }

    // self-follow succeeds without effect
    let req = as_user(test::TestRequest::post().uri("/api/v1/profiles/leo/follow"), leo)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["changed"], false);
    assert_eq!(body["following"], false);

    let req = as_user(test::TestRequest::get().uri("/api/v1/follow"), reader).to_request();
    let feed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(feed["count"], 1);
    assert_eq!(feed["items"][0]["id"], post["id"]);

    let req = as_user(test::TestRequest::get().uri("/api/v1/follow"), leo).to_request();
    let own: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(own["count"], 0);

    let req = as_user(
        test::TestRequest::delete().uri("/api/v1/profiles/leo/follow"),
        reader,
    )
    .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["changed"], true);

    let req = as_user(
        test::TestRequest::post().uri("/api/v1/profiles/ghost/follow"),
        reader,
    )
    .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn listings_group_profile_and_detail() {
    let (env, leo, reader) = seeded().await;
    let app = init_app!(env.state);

    for n in 0..6 {
        let req = as_user(test::TestRequest::post().uri("/api/v1/posts"), leo)
            .set_json(json!({ "text": format!("chapter {}", n), "group_id": 1 }))
            .to_request();
        test::call_service(&app, req).await;
    }

    let req = test::TestRequest::get()
        .uri("/api/v1/groups/classics/posts")
        .to_request();
    let group: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(group["group"]["slug"], "classics");
    assert_eq!(group["posts"]["count"], 6);
    assert_eq!(group["posts"]["items"][0]["text"], "chapter 5");

    let req = test::TestRequest::get()
        .uri("/api/v1/groups/unknown/posts")
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );

    let req = as_user(
        test::TestRequest::get().uri("/api/v1/profiles/leo?page=2"),
        reader,
    )
    .to_request();
    let profile: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(profile["author"]["username"], "leo");
    assert!(profile["author"].get("password_hash").is_none());
    assert_eq!(profile["following"], false);
    assert_eq!(profile["posts"]["page"], 2);
    assert_eq!(profile["posts"]["items"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::get()
        .uri("/api/v1/posts?page=nonsense")
        .to_request();
    let index: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(index["page"], 1);
    let first_id = index["items"][0]["id"].clone();

    let req = as_user(
        test::TestRequest::post().uri(&format!("/api/v1/posts/{}/comments", first_id)),
        reader,
    )
    .set_json(json!({ "text": "bravo" }))
    .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::CREATED
    );

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/profiles/leo/posts/{}", first_id))
        .to_request();
    let detail: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(detail["author_post_count"], 6);
    assert_eq!(detail["comments"][0]["text"], "bravo");

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/profiles/reader/posts/{}", first_id))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn cached_index_is_stale_until_ttl() {
    let env = test_env_with_cache(ListingCache::new(Duration::from_secs(60), 100));
    let leo = create_user(env.repo(), "leo").await;
    let app = init_app!(env.state);

    let req = test::TestRequest::get().uri("/api/v1/posts").to_request();
    let before: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(before["count"], 0);

    let req = as_user(test::TestRequest::post().uri("/api/v1/posts"), leo.id)
        .set_json(json!({ "text": "fresh" }))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri("/api/v1/posts").to_request();
    let after: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(after["count"], 0, "listing served from cache");
}

#[actix_web::test]
async fn invalidate_on_write_refreshes_listings() {
    let cache = ListingCache::new(Duration::from_secs(60), 100).with_invalidate_on_write(true);
    let env = test_env_with_cache(cache);
    let leo = create_user(env.repo(), "leo").await;
    create_group(env.repo(), "classics").await;
    let app = init_app!(env.state);

    for uri in ["/api/v1/posts", "/api/v1/groups/classics/posts", "/api/v1/profiles/leo"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    let req = as_user(test::TestRequest::post().uri("/api/v1/posts"), leo.id)
        .set_json(json!({ "text": "fresh", "group_id": 1 }))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri("/api/v1/posts").to_request();
    let index: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(index["count"], 1);

    let req = test::TestRequest::get()
        .uri("/api/v1/groups/classics/posts")
        .to_request();
    let group: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(group["posts"]["count"], 1);

    let req = test::TestRequest::get().uri("/api/v1/profiles/leo").to_request();
    let profile: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(profile["posts"]["count"], 1);
}

#[actix_web::test]
async fn invalidate_on_write_refreshes_follow_state() {
    let cache = ListingCache::new(Duration::from_secs(60), 100).with_invalidate_on_write(true);
    let env = test_env_with_cache(cache);
    create_user(env.repo(), "leo").await;
    let reader = create_user(env.repo(), "reader").await;
    let app = init_app!(env.state);

    let profile = |username: &str| {
        as_user(
            test::TestRequest::get().uri(&format!("/api/v1/profiles/{}", username)),
            reader.id,
        )
        .to_request()
    };

    let before: Value = test::call_and_read_body_json(&app, profile("leo")).await;
    assert_eq!(before["following"], false);
    let own: Value = test::call_and_read_body_json(&app, profile("reader")).await;
    assert_eq!(own["following_count"], 0);

    let req = as_user(
        test::TestRequest::post().uri("/api/v1/profiles/leo/follow"),
        reader.id,
    )
    .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let after: Value = test::call_and_read_body_json(&app, profile("leo")).await;
    assert_eq!(after["following"], true);
    assert_eq!(after["followers_count"], 1);
    let own: Value = test::call_and_read_body_json(&app, profile("reader")).await;
    assert_eq!(own["following_count"], 1);

    let req = as_user(
        test::TestRequest::delete().uri("/api/v1/profiles/leo/follow"),
        reader.id,
    )
    .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let unfollowed: Value = test::call_and_read_body_json(&app, profile("leo")).await;
    assert_eq!(unfollowed["following"], false);
    assert_eq!(unfollowed["followers_count"], 0);
}

#[actix_web::test]
async fn signup_health_and_metrics() {
    let env = test_env();
    let app = init_app!(env.state);

    let signup = json!({
        "username": "leo",
        "email": "leo@yatube.dev",
        "password": "war-and-peace"
    });
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/signup")
        .set_json(&signup)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let user: Value = test::read_body_json(resp).await;
    assert_eq!(user["username"], "leo");
    assert!(user.get("password_hash").is_none());

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/signup")
        .set_json(&signup)
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::CONFLICT
    );

    for uri in ["/api/v1/health", "/api/v1/health/live", "/api/v1/health/ready"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    let req = test::TestRequest::get().uri("/api/v1/posts").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let body = test::call_and_read_body(&app, req).await;
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("yatube_listing_cache_lookups_total"));
}
