/// Integration tests for the tasknest API
///
/// These drive the full router (auth middleware, guards, handlers,
/// persistence) through tower without binding a socket. They need a
/// PostgreSQL instance via TEST_DATABASE_URL and skip themselves when it
/// is not set; see tests/common/mod.rs.

mod common;

use axum::http::StatusCode;
use chrono::Duration;
use serde_json::json;
use uuid::Uuid;

use tasknest_shared::auth::jwt::{create_token, Claims, TokenType};

/// The full lifecycle: register → login → empty list → create → list →
/// cross-user delete 403 → anonymous delete 401 → unknown id 404 →
/// owner delete 204
#[tokio::test]
async fn test_end_to_end_task_lifecycle() {
    let Some(ctx) = common::TestContext::try_new().await else { return };

    let (_, alice_token, _) = ctx.register_user("alice").await;

    // Fresh account starts with no tasks
    let (status, body) = ctx.request("GET", "/v1/tasks", Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);

    // Create defaults to pending / medium
    let (status, task) = ctx
        .request(
            "POST",
            "/v1/tasks",
            Some(&alice_token),
            Some(json!({"title": "Buy milk"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["title"], "Buy milk");
    assert_eq!(task["status"], "pending");
    assert_eq!(task["priority"], "medium");
    let task_id = task["id"].as_str().unwrap().to_string();

    let (status, body) = ctx.request("GET", "/v1/tasks", Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    // Another user's token: the task exists, so this is 403 not 404
    let (_, bob_token, _) = ctx.register_user("bob").await;
    let (status, _) = ctx
        .request(
            "DELETE",
            &format!("/v1/tasks/{}", task_id),
            Some(&bob_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // No token at all
    let (status, _) = ctx
        .request("DELETE", &format!("/v1/tasks/{}", task_id), None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Unknown id: 404 even though the caller owns nothing like it
    let (status, _) = ctx
        .request(
            "DELETE",
            &format!("/v1/tasks/{}", Uuid::new_v4()),
            Some(&alice_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The owner can delete
    let (status, _) = ctx
        .request(
            "DELETE",
            &format!("/v1/tasks/{}", task_id),
            Some(&alice_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = ctx.request("GET", "/v1/tasks", Some(&alice_token), None).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_login_returns_working_token() {
    let Some(ctx) = common::TestContext::try_new().await else { return };

    let email = format!("carol-{}@example.com", Uuid::new_v4());
    let (status, _) = ctx
        .request(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({"email": email, "password": "Secret123!"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = ctx
        .request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({"email": email, "password": "Secret123!"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["access_token"].as_str().unwrap();

    let (status, me) = ctx.request("GET", "/v1/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"].as_str().unwrap(), email);

    // Wrong password and unknown email produce the same 401
    let (status, _) = ctx
        .request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({"email": email, "password": "WrongPass1!"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({
                "email": format!("ghost-{}@example.com", Uuid::new_v4()),
                "password": "Secret123!"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_email_conflict() {
    let Some(ctx) = common::TestContext::try_new().await else { return };

    let email = format!("dup-{}@example.com", Uuid::new_v4());
    let body = json!({"email": email, "password": "Secret123!"});

    let (status, _) = ctx
        .request("POST", "/v1/auth/register", None, Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, error) = ctx
        .request("POST", "/v1/auth/register", None, Some(body))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"]["status_code"], 409);
    assert!(error["error"]["id"].is_string());
}

#[tokio::test]
async fn test_weak_password_rejected() {
    let Some(ctx) = common::TestContext::try_new().await else { return };

    let (status, error) = ctx
        .request(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({
                "email": format!("weak-{}@example.com", Uuid::new_v4()),
                "password": "nodigitsorupper"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(error["error"]["details"].is_array());
}

#[tokio::test]
async fn test_expired_and_garbage_tokens_are_401() {
    let Some(ctx) = common::TestContext::try_new().await else { return };

    let (user_id, _, _) = ctx.register_user("eve").await;

    let (status, _) = ctx.request("GET", "/v1/tasks", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Well past the validator's default 60s leeway
    let expired = create_token(
        &Claims::with_expiration(user_id, TokenType::Access, Duration::seconds(-300)),
        common::TEST_JWT_SECRET,
    )
    .unwrap();
    let (status, _) = ctx.request("GET", "/v1/tasks", Some(&expired), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A refresh token is not a bearer credential
    let refresh = create_token(
        &Claims::new(user_id, TokenType::Refresh),
        common::TEST_JWT_SECRET,
    )
    .unwrap();
    let (status, _) = ctx.request("GET", "/v1/tasks", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_flow() {
    let Some(ctx) = common::TestContext::try_new().await else { return };

    let (_, _, refresh_token) = ctx.register_user("frank").await;

    let (status, body) = ctx
        .request(
            "POST",
            "/v1/auth/refresh",
            None,
            Some(json!({"refresh_token": refresh_token})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let new_access = body["access_token"].as_str().unwrap();
    let (status, _) = ctx.request("GET", "/v1/tasks", Some(new_access), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_inactive_account_is_400_not_401() {
    let Some(ctx) = common::TestContext::try_new().await else { return };

    let (user_id, token, _) = ctx.register_user("gina").await;

    sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
        .bind(user_id)
        .execute(&ctx.db)
        .await
        .unwrap();

    let (status, error) = ctx.request("GET", "/v1/tasks", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["status_code"], 400);
}

#[tokio::test]
async fn test_task_update_and_status_patch() {
    let Some(ctx) = common::TestContext::try_new().await else { return };

    let (_, token, _) = ctx.register_user("hank").await;

    let (_, task) = ctx
        .request(
            "POST",
            "/v1/tasks",
            Some(&token),
            Some(json!({"title": "Write report", "priority": "high"})),
        )
        .await;
    let task_id = task["id"].as_str().unwrap().to_string();
    assert_eq!(task["priority"], "high");

    let (status, updated) = ctx
        .request(
            "PUT",
            &format!("/v1/tasks/{}", task_id),
            Some(&token),
            Some(json!({"description": "Q3 numbers", "status": "in_progress"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["description"], "Q3 numbers");
    assert_eq!(updated["status"], "in_progress");
    assert_eq!(updated["title"], "Write report");

    let (status, patched) = ctx
        .request(
            "PATCH",
            &format!("/v1/tasks/{}/status", task_id),
            Some(&token),
            Some(json!({"status": "completed"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["status"], "completed");

    // Explicit null clears the description
    let (status, cleared) = ctx
        .request(
            "PUT",
            &format!("/v1/tasks/{}", task_id),
            Some(&token),
            Some(json!({"description": null})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(cleared["description"].is_null());
}

#[tokio::test]
async fn test_task_stats_track_mutations() {
    let Some(ctx) = common::TestContext::try_new().await else { return };

    let (_, token, _) = ctx.register_user("iris").await;

    for title in ["one", "two", "three"] {
        ctx.request(
            "POST",
            "/v1/tasks",
            Some(&token),
            Some(json!({"title": title})),
        )
        .await;
    }

    let (status, stats) = ctx
        .request("GET", "/v1/tasks/stats", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["pending"], 3);

    // Complete one; the cached stats must be invalidated by the write
    let (_, list) = ctx.request("GET", "/v1/tasks", Some(&token), None).await;
    let task_id = list[0]["id"].as_str().unwrap().to_string();
    ctx.request(
        "PATCH",
        &format!("/v1/tasks/{}/status", task_id),
        Some(&token),
        Some(json!({"status": "completed"})),
    )
    .await;

    let (_, stats) = ctx
        .request("GET", "/v1/tasks/stats", Some(&token), None)
        .await;
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["pending"], 2);
    assert_eq!(stats["completed"], 1);
}

#[tokio::test]
async fn test_status_filter() {
    let Some(ctx) = common::TestContext::try_new().await else { return };

    let (_, token, _) = ctx.register_user("jack").await;

    let (_, task) = ctx
        .request("POST", "/v1/tasks", Some(&token), Some(json!({"title": "a"})))
        .await;
    ctx.request("POST", "/v1/tasks", Some(&token), Some(json!({"title": "b"})))
        .await;

    ctx.request(
        "PATCH",
        &format!("/v1/tasks/{}/status", task["id"].as_str().unwrap()),
        Some(&token),
        Some(json!({"status": "completed"})),
    )
    .await;

    let (_, pending) = ctx
        .request("GET", "/v1/tasks?status=pending", Some(&token), None)
        .await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (_, completed) = ctx
        .request("GET", "/v1/tasks?status=completed", Some(&token), None)
        .await;
    assert_eq!(completed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_label_name_unique_per_user_not_globally() {
    let Some(ctx) = common::TestContext::try_new().await else { return };

    let (_, alice_token, _) = ctx.register_user("alice").await;
    let (_, bob_token, _) = ctx.register_user("bob").await;

    let (status, _) = ctx
        .request(
            "POST",
            "/v1/labels",
            Some(&alice_token),
            Some(json!({"name": "work"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // Same name, same user: conflict
    let (status, _) = ctx
        .request(
            "POST",
            "/v1/labels",
            Some(&alice_token),
            Some(json!({"name": "work"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Same name, different user: fine
    let (status, _) = ctx
        .request(
            "POST",
            "/v1/labels",
            Some(&bob_token),
            Some(json!({"name": "work"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_label_guard_ordering() {
    let Some(ctx) = common::TestContext::try_new().await else { return };

    let (_, alice_token, _) = ctx.register_user("alice").await;
    let (_, bob_token, _) = ctx.register_user("bob").await;

    let (_, label) = ctx
        .request(
            "POST",
            "/v1/labels",
            Some(&alice_token),
            Some(json!({"name": "secret", "color": "#FF0000"})),
        )
        .await;
    let label_id = label["id"].as_str().unwrap().to_string();

    // Exists, not bob's: 403
    let (status, _) = ctx
        .request(
            "GET",
            &format!("/v1/labels/{}", label_id),
            Some(&bob_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Does not exist: 404, never 403
    let (status, _) = ctx
        .request(
            "GET",
            &format!("/v1/labels/{}", Uuid::new_v4()),
            Some(&bob_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_label_delete_cascades_to_tasks() {
    let Some(ctx) = common::TestContext::try_new().await else { return };

    let (_, token, _) = ctx.register_user("kate").await;

    let (_, label) = ctx
        .request(
            "POST",
            "/v1/labels",
            Some(&token),
            Some(json!({"name": "errands"})),
        )
        .await;
    let label_id = label["id"].as_str().unwrap().to_string();

    let (_, task) = ctx
        .request(
            "POST",
            "/v1/tasks",
            Some(&token),
            Some(json!({"title": "Buy milk", "label_ids": [label_id]})),
        )
        .await;
    let task_id = task["id"].as_str().unwrap().to_string();
    assert_eq!(task["label_ids"].as_array().unwrap().len(), 1);

    // task_count reflects the reference
    let (_, labels) = ctx.request("GET", "/v1/labels", Some(&token), None).await;
    assert_eq!(labels[0]["task_count"], 1);

    let (status, _) = ctx
        .request(
            "DELETE",
            &format!("/v1/labels/{}", label_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // The reference is gone from the task
    let (_, task) = ctx
        .request("GET", &format!("/v1/tasks/{}", task_id), Some(&token), None)
        .await;
    assert_eq!(task["label_ids"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_label_rename_collision() {
    let Some(ctx) = common::TestContext::try_new().await else { return };

    let (_, token, _) = ctx.register_user("lena").await;

    ctx.request(
        "POST",
        "/v1/labels",
        Some(&token),
        Some(json!({"name": "home"})),
    )
    .await;
    let (_, label) = ctx
        .request(
            "POST",
            "/v1/labels",
            Some(&token),
            Some(json!({"name": "office"})),
        )
        .await;
    let label_id = label["id"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .request(
            "PUT",
            &format!("/v1/labels/{}", label_id),
            Some(&token),
            Some(json!({"name": "home"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Recoloring without renaming is fine
    let (status, updated) = ctx
        .request(
            "PUT",
            &format!("/v1/labels/{}", label_id),
            Some(&token),
            Some(json!({"color": "#00FF00"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["color"], "#00FF00");
}

#[tokio::test]
async fn test_profile_update() {
    let Some(ctx) = common::TestContext::try_new().await else { return };

    let (_, alice_token, _) = ctx.register_user("alice").await;
    let (_, _, _) = ctx.register_user("bob").await;

    let (status, me) = ctx
        .request(
            "PUT",
            "/v1/auth/me",
            Some(&alice_token),
            Some(json!({"name": "Alice A."})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Alice A.");

    // Weak new password is a 422
    let (status, _) = ctx
        .request(
            "PUT",
            "/v1/auth/me",
            Some(&alice_token),
            Some(json!({"password": "tooweak"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_health_endpoint() {
    let Some(ctx) = common::TestContext::try_new().await else { return };

    let (status, body) = ctx.request("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_security_headers_present() {
    let Some(ctx) = common::TestContext::try_new().await else { return };

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();

    use tower::ServiceExt;
    let response = ctx.app.clone().oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get("X-Content-Type-Options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("X-Frame-Options").unwrap(), "DENY");
}
