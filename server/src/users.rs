// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use common::UserProfile;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

/// A row of the `users` table, password hash included.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

/// Inserts a new user. Returns `None` if the username or email is already taken.
pub async fn create_user_in_db(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<Option<UserRecord>> {
    let user = UserRecord {
        id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        created_at: Utc::now(),
    };

    debug!("Insert values: id={}, username={}, email={}", user.id, user.username, user.email);

    let inserted = sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.created_at)
    .execute(pool)
    .await;

    match inserted {
        Ok(_) => Ok(Some(user)),
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            debug!("Insert rejected by a unique constraint: {}", err);
            Ok(None)
        }
        Err(err) => Err(anyhow::Error::new(err).context("Failed to insert user into DB")),
    }
}

/// Returns true if either the username or the email is already taken.
pub async fn user_exists_in_db(pool: &SqlitePool, username: &str, email: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ? OR email = ?")
        .bind(username)
        .bind(email)
        .fetch_one(pool)
        .await
        .context("Failed to look up existing users")?;

    Ok(count > 0)
}

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<UserRecord>> {
    sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to retrieve user by email")
}

pub async fn find_user_by_id(pool: &SqlitePool, user_id: &str) -> Result<Option<UserRecord>> {
    sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to retrieve user by id")
}
