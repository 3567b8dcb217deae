use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use common::{Task, TaskListResponse};
use http_body_util::BodyExt; // For `collect`
use serde_json::{Value, json};
use server::auth::AuthConfig;
use server::database::create_schema;
use server::routes::{AppState, create_router};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt; // For `oneshot`

/// Helper function to set up a fresh, in-memory database for each test.
/// One connection only: every connection to `sqlite::memory:` is a separate database.
async fn setup_test_db_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory SQLite");

    create_schema(&pool)
        .await
        .expect("Failed to create schema in test DB");

    pool
}

async fn setup_app() -> Router {
    let pool = setup_test_db_pool().await;
    // bcrypt cost 4 is the minimum and keeps the tests fast.
    create_router(AppState::new(pool, AuthConfig::new("test-secret", 1, 4)))
}

async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Registers a user and returns its bearer token.
async fn register(app: &Router, username: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "secret123"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["token"].as_str().unwrap().to_string()
}

async fn create_task(app: &Router, token: &str, payload: Value) -> Task {
    let (status, body) = send(app, "POST", "/api/tasks", Some(token), Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    serde_json::from_value(body["task"].clone()).unwrap()
}

#[tokio::test]
async fn test_create_and_list_tasks() {
    let app = setup_app().await;
    let token = register(&app, "alice").await;

    // Act: Create a new task via POST request
    let (status, body) = send(
        &app,
        "POST",
        "/api/tasks",
        Some(&token),
        Some(json!({
            "title": "Test Task",
            "description": "Test Task Description",
            "priority": "high",
            "isUrgent": true,
            "estimatedHours": 10,
            "actualHours": 5,
            "tags": ["api"],
            "efficiencyScore": 1,
            "userId": "someone-else"
        })),
    )
    .await;

    // Assert: Check that the task was created successfully
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Task created successfully");
    let created: Task = serde_json::from_value(body["task"].clone()).unwrap();
    assert_eq!(created.title, "Test Task");
    assert_eq!(created.efficiency_score, 200.0);
    assert_ne!(created.user_id, "someone-else");

    // Act: List tasks via GET request
    let (status, body) = send(&app, "GET", "/api/tasks", Some(&token), None).await;

    // Assert: Check that the list contains the new task
    assert_eq!(status, StatusCode::OK);
    let list: TaskListResponse = serde_json::from_value(body).unwrap();
    assert!(list.success);
    assert_eq!(list.tasks.len(), 1);
    assert_eq!(list.tasks[0].id, created.id);
    assert_eq!(list.pagination.total, 1);
    assert_eq!(list.pagination.pages, 1);
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let app = setup_app().await;

    let (status, body) = send(&app, "GET", "/api/tasks", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, "GET", "/api/tasks", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/tasks/stats/summary", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tasks_of_other_users_are_invisible() {
    let app = setup_app().await;
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;

    let alices = create_task(&app, &alice, json!({ "title": "Private", "description": "Alice only" })).await;

    let (status, body) = send(&app, "GET", "/api/tasks", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tasks"], json!([]));
    assert_eq!(body["pagination"]["total"], 0);

    // Someone else's task and a missing task produce the same response.
    let foreign_uri = format!("/api/tasks/{}", alices.id);
    let missing_uri = "/api/tasks/does-not-exist";
    let update = json!({ "title": "Mine now", "description": "hijacked" });

    let foreign = send(&app, "GET", &foreign_uri, Some(&bob), None).await;
    let missing = send(&app, "GET", missing_uri, Some(&bob), None).await;
    assert_eq!(foreign.0, StatusCode::NOT_FOUND);
    assert_eq!(foreign, missing);

    let foreign = send(&app, "PUT", &foreign_uri, Some(&bob), Some(update.clone())).await;
    let missing = send(&app, "PUT", missing_uri, Some(&bob), Some(update)).await;
    assert_eq!(foreign.0, StatusCode::NOT_FOUND);
    assert_eq!(foreign, missing);

    let foreign = send(&app, "DELETE", &foreign_uri, Some(&bob), None).await;
    let missing = send(&app, "DELETE", missing_uri, Some(&bob), None).await;
    assert_eq!(foreign.0, StatusCode::NOT_FOUND);
    assert_eq!(foreign, missing);
    assert_eq!(foreign.1, json!({ "success": false, "message": "Task not found" }));

    // Alice still sees her untouched task.
    let (status, body) = send(&app, "GET", &foreign_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"]["title"], "Private");
}

#[tokio::test]
async fn test_update_task() {
    let app = setup_app().await;
    let token = register(&app, "alice").await;
    let created = create_task(&app, &token, json!({ "title": "Draft", "description": "v1", "estimatedHours": 2 })).await;
    assert_eq!(created.efficiency_score, 100.0);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/tasks/{}", created.id),
        Some(&token),
        Some(json!({
            "title": "Final",
            "description": "v2",
            "status": "completed",
            "estimatedHours": 2,
            "actualHours": 4,
            "efficiencyScore": 499
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task updated successfully");
    let updated: Task = serde_json::from_value(body["task"].clone()).unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.title, "Final");
    assert_eq!(updated.efficiency_score, 50.0);
    assert_eq!(updated.created_at, created.created_at);
}

#[tokio::test]
async fn test_delete_task() {
    let app = setup_app().await;
    let token = register(&app, "alice").await;
    let created = create_task(&app, &token, json!({ "title": "Delete me", "description": "soon gone" })).await;

    // Act: Send a DELETE request for the created task
    let (status, body) = send(&app, "DELETE", &format!("/api/tasks/{}", created.id), Some(&token), None).await;

    // Assert: The delete was successful
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task deleted successfully");

    // Assert: The task list is now empty
    let (_, body) = send(&app, "GET", "/api/tasks", Some(&token), None).await;
    assert_eq!(body["tasks"], json!([]));
}

#[tokio::test]
async fn test_create_task_reports_all_validation_errors() {
    let app = setup_app().await;
    let token = register(&app, "alice").await;
    let yesterday = (Utc::now() - Duration::days(1)).to_rfc3339();

    let (status, body) = send(
        &app,
        "POST",
        "/api/tasks",
        Some(&token),
        Some(json!({
            "title": "x".repeat(101),
            "description": "",
            "status": "done",
            "estimatedHours": 1001,
            "dueDate": yesterday
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Validation failed");
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["title", "description", "status", "estimatedHours", "dueDate"]);

    // Nothing was persisted.
    let (_, body) = send(&app, "GET", "/api/tasks", Some(&token), None).await;
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_malformed_json_is_a_bad_request() {
    let app = setup_app().await;
    let token = register(&app, "alice").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/tasks")
        .header("Authorization", format!("Bearer {token}"))
        .header("Content-Type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&response.into_body().collect().await.unwrap().to_bytes()).unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_list_filters_search_and_pagination() {
    let app = setup_app().await;
    let token = register(&app, "alice").await;

    for i in 0..15 {
        create_task(&app, &token, json!({ "title": format!("Chore {i}"), "description": "routine" })).await;
    }
    create_task(&app, &token, json!({ "title": "Budget", "description": "Quarterly REVIEW", "isUrgent": true })).await;
    create_task(&app, &token, json!({ "title": "review notes", "description": "misc", "status": "on-hold" })).await;

    // 17 tasks, 8 per page.
    let (_, body) = send(&app, "GET", "/api/tasks?page=3&limit=8", Some(&token), None).await;
    assert_eq!(body["pagination"], json!({ "current": 3, "pages": 3, "total": 17, "hasNext": false, "hasPrev": true }));
    assert_eq!(body["tasks"].as_array().unwrap().len(), 1);

    let (_, body) = send(&app, "GET", "/api/tasks?search=Review", Some(&token), None).await;
    assert_eq!(body["pagination"]["total"], 2);

    let (_, body) = send(&app, "GET", "/api/tasks?isUrgent=true", Some(&token), None).await;
    assert_eq!(body["tasks"][0]["title"], "Budget");
    assert_eq!(body["pagination"]["total"], 1);

    let (_, body) = send(&app, "GET", "/api/tasks?status=on-hold&priority=", Some(&token), None).await;
    assert_eq!(body["pagination"]["total"], 1);

    let (_, body) = send(&app, "GET", "/api/tasks?status=&search=&isUrgent=", Some(&token), None).await;
    assert_eq!(body["pagination"]["total"], 17);

    let (_, body) = send(&app, "GET", "/api/tasks?sort=title&order=asc&limit=1", Some(&token), None).await;
    assert_eq!(body["tasks"][0]["title"], "Budget");
}

#[tokio::test]
async fn test_task_stats_summary() {
    let app = setup_app().await;
    let token = register(&app, "alice").await;
    create_task(&app, &token, json!({ "title": "a", "description": "a", "estimatedHours": 2, "actualHours": 1, "isUrgent": true })).await;
    create_task(&app, &token, json!({ "title": "b", "description": "b", "estimatedHours": 3, "status": "completed" })).await;

    let (status, body) = send(&app, "GET", "/api/tasks/stats/summary", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["stats"]["totalTasks"], 2);
    assert_eq!(body["stats"]["urgentTasks"], 1);
    assert_eq!(
        body["stats"]["byStatus"],
        json!([
            { "status": "completed", "count": 1, "totalEstimatedHours": 3.0, "totalActualHours": 0.0 },
            { "status": "pending", "count": 1, "totalEstimatedHours": 2.0, "totalActualHours": 1.0 }
        ])
    );
}

#[tokio::test]
async fn test_auth_flow() {
    let app = setup_app().await;
    let token = register(&app, "alice").await;

    // Duplicate registration is refused.
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "alice", "email": "other@example.com", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already exists with this email or username");

    // Login is case-insensitive on the email.
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "ALICE@example.com", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "alice");
    let login_token = body["token"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    for token in [token, login_token] {
        let (status, body) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "alice@example.com");
    }
}

#[tokio::test]
async fn test_health_and_unknown_route() {
    let app = setup_app().await;

    let (status, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");

    let (status, body) = send(&app, "GET", "/api/nothing-here", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "API endpoint not found: /api/nothing-here");
}

#[tokio::test]
async fn test_huge_page_number_returns_an_empty_page() {
    let app = setup_app().await;
    let token = register(&app, "alice").await;
    create_task(&app, &token, json!({ "title": "Only one", "description": "first page" })).await;

    let (status, body) = send(&app, "GET", "/api/tasks?page=9223372036854775807&limit=10", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tasks"], json!([]));
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["pagination"]["hasNext"], false);
    assert_eq!(body["pagination"]["hasPrev"], true);
}

#[tokio::test]
async fn test_search_folds_non_ascii_case() {
    let app = setup_app().await;
    let token = register(&app, "alice").await;
    create_task(&app, &token, json!({ "title": "École rentrée", "description": "fournitures" })).await;
    create_task(&app, &token, json!({ "title": "Groceries", "description": "CAFÉ and bread" })).await;

    let (_, body) = send(&app, "GET", "/api/tasks?search=%C3%A9cole", Some(&token), None).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["tasks"][0]["title"], "École rentrée");

    let (_, body) = send(&app, "GET", "/api/tasks?search=caf%C3%A9", Some(&token), None).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["tasks"][0]["title"], "Groceries");
}

#[tokio::test]
async fn test_mistyped_fields_are_reported_with_the_rest() {
    let app = setup_app().await;
    let token = register(&app, "alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/tasks",
        Some(&token),
        Some(json!({ "title": "", "description": "", "isUrgent": "maybe", "estimatedHours": "ten", "actualHours": [1] })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation failed");
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["title", "description", "isUrgent", "estimatedHours", "actualHours"]);
    assert_eq!(body["errors"][3]["message"], "Estimated hours must be between 0 and 1000");

    // Numeric strings are accepted as numbers.
    let created = create_task(
        &app,
        &token,
        json!({ "title": "Strings", "description": "from a form", "isUrgent": "true", "estimatedHours": "5", "actualHours": "2.5" }),
    )
    .await;
    assert!(created.is_urgent);
    assert_eq!(created.estimated_hours, 5.0);
    assert_eq!(created.efficiency_score, 200.0);
}
