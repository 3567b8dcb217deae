// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use anyhow::{Context, Result};
use chrono::Utc;
use common::{
    StatusSummary, Task, TaskDraft, TaskQuery, TaskStats, efficiency_score,
};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, migrate::MigrateDatabase};
use tracing::{debug, info};
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY NOT NULL,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TIMESTAMP NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tasks (
        id TEXT PRIMARY KEY NOT NULL,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        priority TEXT NOT NULL DEFAULT 'medium',
        is_urgent BOOLEAN NOT NULL DEFAULT 0,
        estimated_hours REAL NOT NULL DEFAULT 0,
        actual_hours REAL NOT NULL DEFAULT 0,
        efficiency_score REAL NOT NULL DEFAULT 0,
        due_date TIMESTAMP NULL,
        tags TEXT NOT NULL DEFAULT '[]',
        title_search TEXT NOT NULL DEFAULT '',
        description_search TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_tasks_user_created ON tasks (user_id, created_at DESC);",
];

/// Establishes the database connection pool.
/// If the database does not exist, it creates it.
/// It also ensures the tables have the correct schema.
pub async fn establish_connection_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<SqlitePool> {
    if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        info!("Creating database {}", database_url);
        Sqlite::create_database(database_url)
            .await
            .context("Failed to create database")?;
    } else {
        info!("Database already exists.");
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Creates the `users` and `tasks` tables if they are missing.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("Failed to create database schema")?;
    }
    info!("Database schema is ready.");
    Ok(())
}

/// Cheap connectivity probe used by the health endpoint.
pub async fn ping(pool: &SqlitePool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}

/// Appends the owner scope and the optional filters of `query` to `builder`.
fn push_task_filter<'a>(builder: &mut QueryBuilder<'a, Sqlite>, user_id: &'a str, query: &'a TaskQuery) {
    builder.push(" WHERE user_id = ").push_bind(user_id);

    if let Some(status) = &query.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(priority) = &query.priority {
        builder.push(" AND priority = ").push_bind(priority);
    }
    if let Some(is_urgent) = query.is_urgent {
        builder.push(" AND is_urgent = ").push_bind(is_urgent);
    }
    // SQLite's LIKE only folds ASCII; the *_search columns hold lower-cased copies.
    if let Some(search) = &query.search {
        let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
        builder
            .push(" AND (title_search LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR description_search LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

/// Escapes `LIKE` wildcards so the search text is matched literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Retrieves one page of the caller's tasks plus the total number of matches.
pub async fn list_tasks_from_db(
    pool: &SqlitePool,
    user_id: &str,
    query: &TaskQuery,
) -> Result<(Vec<Task>, i64)> {
    let mut select = QueryBuilder::<Sqlite>::new("SELECT * FROM tasks");
    push_task_filter(&mut select, user_id, query);
    // rowid keeps rows created within the same instant in insertion order.
    let order = query.order.as_sql();
    select
        .push(format!(
            " ORDER BY {} {order}, rowid {order} LIMIT ",
            query.sort.column()
        ))
        .push_bind(query.limit)
        .push(" OFFSET ")
        .push_bind(query.offset());

    debug!("Listing tasks: {}", select.sql());

    let tasks = select
        .build_query_as::<Task>()
        .fetch_all(pool)
        .await
        .context("Failed to retrieve tasks from DB")?;

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM tasks");
    push_task_filter(&mut count, user_id, query);
    let total: i64 = count
        .build_query_scalar()
        .fetch_one(pool)
        .await
        .context("Failed to count tasks in DB")?;

    Ok((tasks, total))
}

/// Retrieves a single task, only if it belongs to `user_id`.
pub async fn get_task_from_db(pool: &SqlitePool, user_id: &str, task_id: &str) -> Result<Option<Task>> {
    let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ? AND user_id = ?")
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context(format!("Failed to retrieve task with ID: {task_id}"))?;

    Ok(task)
}

/// Inserts a new task owned by `user_id`.
pub async fn create_task_in_db(pool: &SqlitePool, user_id: &str, draft: TaskDraft) -> Result<Task> {
    let now = Utc::now();
    let task = Task {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        efficiency_score: efficiency_score(draft.estimated_hours, draft.actual_hours),
        title: draft.title,
        description: draft.description,
        status: draft.status,
        priority: draft.priority,
        is_urgent: draft.is_urgent,
        estimated_hours: draft.estimated_hours,
        actual_hours: draft.actual_hours,
        due_date: draft.due_date,
        tags: draft.tags,
        created_at: now,
        updated_at: now,
    };

    debug!(
        "Insert values: id={}, user_id={}, title={}, status={}, priority={}, efficiency_score={}",
        task.id, task.user_id, task.title, task.status, task.priority, task.efficiency_score
    );

    sqlx::query(
        "INSERT INTO tasks (id, user_id, title, description, status, priority, is_urgent, estimated_hours, actual_hours, efficiency_score, due_date, tags, title_search, description_search, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&task.id)
    .bind(&task.user_id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.status)
    .bind(task.priority)
    .bind(task.is_urgent)
    .bind(task.estimated_hours)
    .bind(task.actual_hours)
    .bind(task.efficiency_score)
    .bind(task.due_date)
    .bind(Json(&task.tags))
    .bind(task.title.to_lowercase())
    .bind(task.description.to_lowercase())
    .bind(task.created_at)
    .bind(task.updated_at)
    .execute(pool)
    .await
    .context("Failed to insert task into DB")?;

    Ok(task)
}

/// Replaces the editable fields of a task owned by `user_id`.
/// Returns `None` if no such task exists for this owner.
pub async fn update_task_in_db(
    pool: &SqlitePool,
    user_id: &str,
    task_id: &str,
    draft: TaskDraft,
) -> Result<Option<Task>> {
    let score = efficiency_score(draft.estimated_hours, draft.actual_hours);

    let task = sqlx::query_as::<_, Task>(
        "UPDATE tasks SET title = ?, description = ?, status = ?, priority = ?, is_urgent = ?, \
         estimated_hours = ?, actual_hours = ?, efficiency_score = ?, due_date = ?, tags = ?, \
         title_search = ?, description_search = ?, updated_at = ? \
         WHERE id = ? AND user_id = ? RETURNING *",
    )
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(draft.status)
    .bind(draft.priority)
    .bind(draft.is_urgent)
    .bind(draft.estimated_hours)
    .bind(draft.actual_hours)
    .bind(score)
    .bind(draft.due_date)
    .bind(Json(&draft.tags))
    .bind(draft.title.to_lowercase())
    .bind(draft.description.to_lowercase())
    .bind(Utc::now())
    .bind(task_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context(format!("Failed to update task with ID: {task_id}"))?;

    Ok(task)
}

/// Hard deletes a task owned by `user_id`.
/// Returns true if a task was deleted, false if no task with the given ID was found for this owner.
pub async fn delete_task_from_db(pool: &SqlitePool, user_id: &str, task_id: &str) -> Result<bool> {
    debug!("Attempting to delete task with ID: {}", task_id);
    let result = sqlx::query("DELETE FROM tasks WHERE id = ? AND user_id = ?")
        .bind(task_id)
        .bind(user_id)
        .execute(pool)
        .await
        .context(format!("Failed to delete task with ID: {task_id}"))?;

    let rows_affected = result.rows_affected();
    info!("Deleted {} rows for task ID: {}", rows_affected, task_id);

    Ok(rows_affected > 0)
}

/// Aggregates the caller's tasks by status, plus overall and urgent counts.
pub async fn task_stats_from_db(pool: &SqlitePool, user_id: &str) -> Result<TaskStats> {
    let by_status = sqlx::query_as::<_, StatusSummary>(
        "SELECT status, COUNT(*) AS count, \
         TOTAL(estimated_hours) AS total_estimated_hours, \
         TOTAL(actual_hours) AS total_actual_hours \
         FROM tasks WHERE user_id = ? GROUP BY status ORDER BY status",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to aggregate tasks by status")?;

    let (total_tasks, urgent_tasks): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(is_urgent), 0) FROM tasks WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .context("Failed to count tasks")?;

    Ok(TaskStats {
        by_status,
        total_tasks,
        urgent_tasks,
    })
}
