/**
 * Server Configuration
 *
 * This module loads the `AppConfig` and opens the database.
 *
 * # Configuration Sources
 *
 * 1. Built-in defaults
 * 2. The TOML file named by `WAZAP_CONFIG`, if set
 * 3. Environment variables (a `.env` file is loaded by the binary first)
 *
 * Unlike optional integrations, a bad configuration or an unreachable
 * database stops start-up: every request needs both.
 */

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::shared::config::{AppConfig, ConfigError};

/// Environment variable naming an optional TOML configuration file
pub const CONFIG_FILE_ENV: &str = "WAZAP_CONFIG";

/// Load the configuration from file and environment, then validate it
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let base = match std::env::var(CONFIG_FILE_ENV) {
        Ok(path) => {
            tracing::info!("Loading configuration file {}", path);
            let source = std::fs::read_to_string(&path)?;
            AppConfig::from_toml_str(&source)?
        }
        Err(_) => AppConfig::default(),
    };

    let config = base.apply_env(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Open the SQLite pool and run the embedded migrations
///
/// In-memory databases exist per connection, so their pool is limited to a
/// single connection that is never recycled.
pub async fn load_database(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let options = if in_memory {
        options
    } else {
        options.journal_mode(SqliteJournalMode::Wal)
    };

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new()
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(10))
    };

    tracing::info!("Connecting to database...");
    let pool = pool_options.connect_with(options).await?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database ready");

    Ok(pool)
}
