// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use anyhow::{Context, Result};
use serde::Deserialize;

const ENV_PREFIX: &str = "TASK_MANAGER";
const CONFIG_FILE: &str = "task-manager";

pub const DEFAULT_JWT_SECRET: &str = "change-me-in-production";

/// Server settings.
///
/// Resolved from, in increasing precedence: built-in defaults, an optional
/// `task-manager.toml` in the working directory, and `TASK_MANAGER_*`
/// environment variables (e.g. `TASK_MANAGER_PORT=8080`,
/// `TASK_MANAGER_CORS_ORIGINS=http://a,http://b`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub bcrypt_cost: u32,
    pub cors_origins: Vec<String>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("database_url", "sqlite://tasks.db")?
            .set_default("database_max_connections", 5)?
            .set_default("host", "0.0.0.0")?
            .set_default("port", 5000)?
            .set_default("jwt_secret", DEFAULT_JWT_SECRET)?
            .set_default("jwt_expiration_hours", 24 * 7)?
            .set_default("bcrypt_cost", i64::from(bcrypt::DEFAULT_COST))?
            .set_default("cors_origins", vec!["http://localhost:3000".to_string()])?
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_origins"),
            )
            .build()
            .context("Failed to read configuration")?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
