//! Database initialization
//!
//! Opens (or creates) the SQLite database, applies connection pragmas,
//! creates all tables idempotently, and runs versioned migrations. Safe to
//! call on every startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Foreign keys and the busy timeout are per-connection settings; they
    // must go through the connect options so every pooled connection gets
    // them, not just the one a PRAGMA statement happens to run on.
    // WAL allows concurrent readers with one writer; the evaluation table is
    // written from multiple sessions at once.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Schema creation (idempotent - safe to call multiple times)
    create_schema_version_table(&pool).await?;
    create_user_profile_table(&pool).await?;
    create_guest_table(&pool).await?;
    create_performance_table(&pool).await?;
    create_evaluation_table(&pool).await?;

    // Versioned migrations for databases created by older builds
    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Authenticated principals.
///
/// The credential columns back the local auth provider only; an embedding
/// application using an external auth provider leaves them empty.
async fn create_user_profile_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_profile (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            password_hash TEXT NOT NULL DEFAULT '',
            password_salt TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Anonymous principals. One row per locally generated guest id that has
/// written at least one evaluation.
async fn create_guest_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS guest (
            id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Content entities; read-only from the protocol's perspective.
async fn create_performance_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS performance (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            poster_url TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// The central mutable entity.
///
/// Constraints enforced by the store, defended again in application logic:
/// - exactly one of user_id / guest_id is set (ownership is exclusive)
/// - both ratings lie in [0.5, 5.0] on a 0.5 grid
/// - at most one row per (owner, performance) via the unique index below
async fn create_evaluation_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS evaluation (
            id TEXT PRIMARY KEY,
            user_id TEXT REFERENCES user_profile(id),
            guest_id TEXT REFERENCES guest(id),
            performance_id TEXT NOT NULL REFERENCES performance(id),
            star_rating REAL NOT NULL,
            like_rating REAL NOT NULL,
            comment TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK ((user_id IS NULL) <> (guest_id IS NULL)),
            CHECK (star_rating >= 0.5 AND star_rating <= 5.0
                   AND (star_rating * 2) = CAST(star_rating * 2 AS INTEGER)),
            CHECK (like_rating >= 0.5 AND like_rating <= 5.0
                   AND (like_rating * 2) = CAST(like_rating * 2 AS INTEGER))
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Final arbiter for the upsert race: losers get a unique violation and
    // must transition to the update path
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS evaluation_owner_performance
        ON evaluation (coalesce(user_id, guest_id), performance_id)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
