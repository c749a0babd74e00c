//! SQLite connection pool for the journaling store.
//!
//! One database file holds everything: users, entries, goal/task/habit
//! records, and embedding vectors. WAL mode lets the API server read
//! suggestions while a batch run writes, and the busy timeout covers the
//! brief writer contention that produces. Foreign keys are enforced;
//! the schema relies on them for entry and user provenance.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::time::Duration;

use crate::config::Config;

pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DbConfig, ServerConfig};

    fn config_for(path: std::path::PathBuf) -> Config {
        Config {
            db: DbConfig { path },
            llm: Default::default(),
            embedding: Default::default(),
            suggestions: Default::default(),
            server: ServerConfig {
                bind: "127.0.0.1:7411".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_connect_creates_file_and_parent_dirs() {
        let tmp = tempfile::TempDir::new().unwrap();
        let db_path = tmp.path().join("nested").join("hopelog.sqlite");

        let pool = connect(&config_for(db_path.clone())).await.unwrap();
        assert!(db_path.exists());

        // Foreign key enforcement is on for every pooled connection
        let row: (i64,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.0, 1);
        pool.close().await;
    }
}
