//! Database initialization
//!
//! Creates the database file and schema on first run. All `CREATE`
//! statements are idempotent, so opening an existing database is safe.
//!
//! Layout:
//! - `current_flow`: singleton row (`id = 1`)
//! - `submissions`: one row per (flow, user)
//! - `ballot_entries`: one row per (flow, user, points)
//! - `users`: every identity seen

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Open (creating if needed) the database at `db_path` and ensure the schema
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Foreign keys are enabled per connection by SqliteConnectOptions
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema
///
/// The connection is never recycled, since dropping it would discard the
/// database.
pub async fn init_in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_current_flow_table(pool).await?;
    create_submissions_table(pool).await?;
    create_ballot_entries_table(pool).await?;
    create_users_table(pool).await?;
    Ok(())
}

async fn create_current_flow_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS current_flow (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            flow_id TEXT NOT NULL,
            theme TEXT NOT NULL,
            phase INTEGER NOT NULL DEFAULT 0 CHECK (phase BETWEEN 0 AND 3),
            phase_timer INTEGER CHECK (phase_timer IS NULL OR phase_timer > 0),
            phase_started_at INTEGER NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_submissions_table(pool: &SqlitePool) -> Result<()> {
    // AUTOINCREMENT: ids are the submission sequence and must never be reused
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS submissions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            flow_id TEXT NOT NULL,
            song_name TEXT NOT NULL,
            song_author TEXT NOT NULL,
            song_link TEXT NOT NULL,
            submitter_name TEXT NOT NULL,
            user_id TEXT NOT NULL,
            submitted_at INTEGER NOT NULL,
            UNIQUE (flow_id, user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_ballot_entries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ballot_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            flow_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            song_id INTEGER NOT NULL REFERENCES submissions(id),
            points INTEGER NOT NULL CHECK (points IN (1, 2, 3)),
            voted_at INTEGER NOT NULL,
            UNIQUE (flow_id, user_id, points)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_ballot_entries_song ON ballot_entries(song_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
