//! Integration tests for the `/api/v1/bugs` endpoints.
//!
//! Drives the full router (middleware included) against a fresh SQLite
//! database per test.

mod common;

use axum::http::StatusCode;
use common::{body_bytes, body_json, build_test_app, delete, get, patch_json, post_json, put_json};
use serde_json::{json, Value};
use sqlx::SqlitePool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn bug_payload(tags: &[&str]) -> Value {
    json!({
        "title": "Test title",
        "description": "Test desc",
        "status": "OPEN",
        "priority": "HIGH",
        "severity": "CRITICAL",
        "assigned_to": "user_1",
        "submitter": "system",
        "tags": tags,
    })
}

fn tag_names(bug: &Value) -> Vec<String> {
    let mut names: Vec<String> = bug["tags"]
        .as_array()
        .expect("tags should be an array")
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    names
}

async fn create_bug(pool: &SqlitePool, tags: &[&str]) -> Value {
    let response = post_json(build_test_app(pool.clone()), "/api/v1/bugs", bug_payload(tags)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

async fn fetch_bug(pool: &SqlitePool, id: i64) -> Value {
    let response = get(build_test_app(pool.clone()), &format!("/api/v1/bugs/{id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"].clone()
}

async fn registry(pool: &SqlitePool) -> Vec<String> {
    let response = get(build_test_app(pool.clone()), "/api/v1/tags").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let mut names: Vec<String> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    names
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_returns_201_with_bug(pool: SqlitePool) {
    let bug = create_bug(&pool, &["test", "tag"]).await;

    assert_eq!(bug["id"], 1);
    assert_eq!(bug["title"], "Test title");
    assert_eq!(bug["description"], "Test desc");
    assert_eq!(bug["status"], "OPEN");
    assert_eq!(bug["priority"], "HIGH");
    assert_eq!(bug["severity"], "CRITICAL");
    assert_eq!(bug["assigned_to"], "user_1");
    assert_eq!(bug["submitter"], "system");
    assert!(bug["created_at"].is_string());
    assert_eq!(bug["created_at"], bug["updated_at"]);
    assert_eq!(tag_names(&bug), vec!["tag", "test"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn two_creates_share_the_registry(pool: SqlitePool) {
    let first = create_bug(&pool, &["test", "tag"]).await;
    let second = create_bug(&pool, &["test", "tag"]).await;

    assert_eq!(first["id"], 1);
    assert_eq!(second["id"], 2);
    assert_eq!(registry(&pool).await, vec!["tag", "test"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_defaults_submitter_and_tags(pool: SqlitePool) {
    let body = json!({
        "title": "Minimal",
        "description": "Only required fields",
        "status": "IN_PROGRESS",
        "priority": "LOW",
        "severity": "MINOR",
    });
    let response = post_json(build_test_app(pool), "/api/v1/bugs", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let bug = body_json(response).await["data"].clone();
    assert_eq!(bug["submitter"], "???");
    assert!(bug["assigned_to"].is_null());
    assert_eq!(bug["tags"], json!([]));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_with_blank_title_returns_400(pool: SqlitePool) {
    let mut body = bug_payload(&[]);
    body["title"] = json!("           ");

    let response = post_json(build_test_app(pool.clone()), "/api/v1/bugs", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let list = body_json(get(build_test_app(pool), "/api/v1/bugs").await).await;
    assert_eq!(list["data"], json!([]));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_with_blank_tag_returns_400(pool: SqlitePool) {
    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/bugs",
        bug_payload(&["ok", " "]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(registry(&pool).await.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_with_missing_field_returns_422(pool: SqlitePool) {
    let mut body = bug_payload(&[]);
    body.as_object_mut().unwrap().remove("status");

    let response = post_json(build_test_app(pool), "/api/v1/bugs", body).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_with_unknown_enum_returns_422(pool: SqlitePool) {
    let mut body = bug_payload(&[]);
    body["severity"] = json!("BLOCKER");

    let response = post_json(build_test_app(pool), "/api/v1/bugs", body).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_returns_every_bug_with_tags(pool: SqlitePool) {
    let response = get(build_test_app(pool.clone()), "/api/v1/bugs").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"], json!([]));

    create_bug(&pool, &["a"]).await;
    create_bug(&pool, &["b", "c"]).await;

    let json = body_json(get(build_test_app(pool), "/api/v1/bugs").await).await;
    let bugs = json["data"].as_array().unwrap();
    assert_eq!(bugs.len(), 2);
    assert_eq!(tag_names(&bugs[0]), vec!["a"]);
    assert_eq!(tag_names(&bugs[1]), vec!["b", "c"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn get_missing_bug_returns_404(pool: SqlitePool) {
    let response = get(build_test_app(pool), "/api/v1/bugs/999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Bug with id 999 not found");
}

// ---------------------------------------------------------------------------
// PATCH
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn patch_adds_tags_and_returns_204(pool: SqlitePool) {
    create_bug(&pool, &["test", "tag"]).await;

    let response = patch_json(
        build_test_app(pool.clone()),
        "/api/v1/bugs/1",
        json!({ "tags": ["new", "another"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(response).await.is_empty());

    let bug = fetch_bug(&pool, 1).await;
    assert_eq!(tag_names(&bug), vec!["another", "new", "tag", "test"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn patch_updates_only_sent_fields(pool: SqlitePool) {
    let created = create_bug(&pool, &["test"]).await;

    let response = patch_json(
        build_test_app(pool.clone()),
        "/api/v1/bugs/1",
        json!({ "title": "Title PATCH", "assigned_to": null }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let bug = fetch_bug(&pool, 1).await;
    assert_eq!(bug["title"], "Title PATCH");
    assert!(bug["assigned_to"].is_null());
    assert_eq!(bug["description"], "Test desc");
    assert_eq!(bug["submitter"], "system");
    assert_eq!(bug["created_at"], created["created_at"]);
    assert_ne!(bug["updated_at"], created["updated_at"]);
    assert_eq!(tag_names(&bug), vec!["test"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn empty_patch_returns_400(pool: SqlitePool) {
    let created = create_bug(&pool, &[]).await;

    let response = patch_json(build_test_app(pool.clone()), "/api/v1/bugs/1", json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let bug = fetch_bug(&pool, 1).await;
    assert_eq!(bug["updated_at"], created["updated_at"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn patch_with_blank_description_returns_400(pool: SqlitePool) {
    create_bug(&pool, &[]).await;

    let response = patch_json(
        build_test_app(pool),
        "/api/v1/bugs/1",
        json!({ "description": "  " }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn patch_missing_bug_returns_404(pool: SqlitePool) {
    let response = patch_json(
        build_test_app(pool.clone()),
        "/api/v1/bugs/999",
        json!({ "tags": ["ghost"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(registry(&pool).await.is_empty());
}

// ---------------------------------------------------------------------------
// PUT
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn put_replaces_fields_and_tags(pool: SqlitePool) {
    let created = create_bug(&pool, &["test", "tag"]).await;

    let body = json!({
        "title": "PUT title",
        "description": "PUT desc",
        "status": "CLOSED",
        "priority": "MEDIUM",
        "severity": "MAJOR",
        "tags": ["tags", "after", "PUT"],
    });
    let response = put_json(build_test_app(pool.clone()), "/api/v1/bugs/1", body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let bug = body_json(response).await["data"].clone();
    assert_eq!(bug["id"], 1);
    assert_eq!(bug["title"], "PUT title");
    assert_eq!(bug["status"], "CLOSED");
    assert!(bug["assigned_to"].is_null());
    assert_eq!(bug["submitter"], "???");
    assert_eq!(bug["created_at"], created["created_at"]);
    assert_eq!(tag_names(&bug), vec!["PUT", "after", "tags"]);

    assert_eq!(
        registry(&pool).await,
        vec!["PUT", "after", "tag", "tags", "test"]
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn put_missing_bug_returns_404(pool: SqlitePool) {
    let response = put_json(
        build_test_app(pool),
        "/api/v1/bugs/999",
        bug_payload(&["x"]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn put_with_missing_field_returns_422(pool: SqlitePool) {
    create_bug(&pool, &[]).await;

    let response = put_json(
        build_test_app(pool),
        "/api/v1/bugs/1",
        json!({ "title": "Only a title" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// ---------------------------------------------------------------------------
// DELETE
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_returns_204_and_keeps_tags(pool: SqlitePool) {
    create_bug(&pool, &["test", "tag"]).await;

    let response = delete(build_test_app(pool.clone()), "/api/v1/bugs/1").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get(build_test_app(pool.clone()), "/api/v1/bugs/1").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(registry(&pool).await, vec!["tag", "test"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_missing_bug_returns_404(pool: SqlitePool) {
    let response = delete(build_test_app(pool), "/api/v1/bugs/999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}
