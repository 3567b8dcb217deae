// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::auth::{self, AuthError, AuthenticatedUser};
use crate::database;
use crate::error::AppError;
use crate::routes::AppState;
use crate::users;
use axum::{
    extract::{Json, Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, Uri},
};
use chrono::Utc;
use common::{
    LoginPayload, Pagination, RegisterPayload, TaskListParams, TaskListResponse, TaskPayload,
    TaskQuery, validate_login, validate_registration, validate_task,
};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

const USER_EXISTS: &str = "User already exists with this email or username";

/// Handler for listing the caller's tasks with filters, sorting and pagination.
pub async fn list_tasks(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<TaskListParams>,
) -> Result<Json<TaskListResponse>, AppError> {
    let query = TaskQuery::from_params(&params);
    debug!("Listing tasks for user {} with {:?}", user.user_id, query);

    let (tasks, total) = database::list_tasks_from_db(&state.pool, &user.user_id, &query).await?;

    info!("Successfully retrieved {} of {} tasks.", tasks.len(), total);
    Ok(Json(TaskListResponse {
        success: true,
        tasks,
        pagination: Pagination::new(query.page, query.limit, total),
    }))
}

/// Handler for fetching one task by ID.
pub async fn get_task(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(task_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let task = database::get_task_from_db(&state.pool, &user.user_id, &task_id)
        .await?
        .ok_or_else(AppError::task_not_found)?;

    Ok(Json(json!({ "success": true, "task": task })))
}

/// Handler for creating a new task.
pub async fn create_task(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<TaskPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(payload) = payload?;
    debug!("Received request to create task for user: {}", user.user_id);

    // Validate everything before touching the database.
    let draft = validate_task(&payload, Utc::now()).inspect_err(|failure| {
        warn!("Validation failed: {} field error(s).", failure.errors.len());
    })?;

    let task = database::create_task_in_db(&state.pool, &user.user_id, draft).await?;

    info!("Task created successfully with ID: {}", task.id);

    // Return a 201 Created status with the new task as JSON.
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Task created successfully",
            "task": task
        })),
    ))
}

/// Handler for replacing a task's fields. Validation rules are the same as for creation.
pub async fn update_task(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(task_id): Path<String>,
    payload: Result<Json<TaskPayload>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(payload) = payload?;
    debug!("Received request to update task with ID: {}", task_id);

    let draft = validate_task(&payload, Utc::now()).inspect_err(|failure| {
        warn!("Validation failed: {} field error(s).", failure.errors.len());
    })?;

    let task = database::update_task_in_db(&state.pool, &user.user_id, &task_id, draft)
        .await?
        .ok_or_else(|| {
            warn!("Task with ID {} not found for update.", task_id);
            AppError::task_not_found()
        })?;

    info!("Task with ID {} updated successfully.", task.id);
    Ok(Json(json!({
        "success": true,
        "message": "Task updated successfully",
        "task": task
    })))
}

/// Handler for deleting a task by ID.
pub async fn delete_task(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(task_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    debug!("Attempting to delete task with ID: {}", task_id);

    let deleted = database::delete_task_from_db(&state.pool, &user.user_id, &task_id).await?;

    if deleted {
        info!("Task with ID {} deleted successfully.", task_id);
        Ok(Json(json!({
            "success": true,
            "message": "Task deleted successfully"
        })))
    } else {
        warn!("Task with ID {} not found for deletion.", task_id);
        Err(AppError::task_not_found())
    }
}

/// Handler for the per-status summary of the caller's tasks.
pub async fn task_stats(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, AppError> {
    let stats = database::task_stats_from_db(&state.pool, &user.user_id).await?;
    Ok(Json(json!({ "success": true, "stats": stats })))
}

/// Handler for creating an account. Responds with a token so the client is signed in at once.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(payload) = payload?;
    let registration = validate_registration(&payload)?;

    if users::user_exists_in_db(&state.pool, &registration.username, &registration.email).await? {
        warn!("Registration refused: {} or {} already taken.", registration.username, registration.email);
        return Err(AppError::bad_request(USER_EXISTS));
    }

    let password_hash = auth::hash_password(registration.password, state.auth.bcrypt_cost).await?;
    // A concurrent registration can still win between the check and the insert.
    let Some(user) = users::create_user_in_db(
        &state.pool,
        &registration.username,
        &registration.email,
        &password_hash,
    )
    .await?
    else {
        warn!("Registration refused: {} or {} taken concurrently.", registration.username, registration.email);
        return Err(AppError::bad_request(USER_EXISTS));
    };
    let token = state.auth.jwt.generate_token(&user.id, &user.username)?;

    info!("User {} registered with ID: {}", user.username, user.id);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "token": token,
            "user": user.profile()
        })),
    ))
}

/// Handler for exchanging email and password for a token.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(payload) = payload?;
    let credentials = validate_login(&payload)?;

    // Unknown email and wrong password look the same to the caller.
    let Some(user) = users::find_user_by_email(&state.pool, &credentials.email).await? else {
        warn!("Login failed for unknown email.");
        return Err(AuthError::InvalidCredentials.into());
    };
    if !auth::verify_password(credentials.password, user.password_hash.clone()).await? {
        warn!("Login failed for user {}: wrong password.", user.id);
        return Err(AuthError::InvalidCredentials.into());
    }

    let token = state.auth.jwt.generate_token(&user.id, &user.username)?;

    info!("User {} logged in.", user.id);
    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "token": token,
        "user": user.profile()
    })))
}

/// Handler returning the profile behind the bearer token.
pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, AppError> {
    let record = users::find_user_by_id(&state.pool, &user.user_id)
        .await?
        .ok_or(AuthError::UnknownUser)?;

    Ok(Json(json!({ "success": true, "user": record.profile() })))
}

/// Handler reporting liveness and database connectivity.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let database = if database::ping(&state.pool).await {
        "connected"
    } else {
        "disconnected"
    };
    Json(json!({
        "success": true,
        "status": "OK",
        "message": "API is healthy",
        "database": database
    }))
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::new(
        StatusCode::NOT_FOUND,
        &format!("API endpoint not found: {uri}"),
    )
}
