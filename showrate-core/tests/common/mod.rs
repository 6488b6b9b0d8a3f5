#![allow(dead_code)]

//! Shared fixtures for the integration tests: a real SQLite database in a
//! temp directory, with the schema the protocol runs against.

use showrate_common::db::init_database;
use showrate_core::SqliteEvaluationStore;
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

pub struct TestStore {
    // Held so the database file outlives the test body
    pub root: TempDir,
    pub pool: SqlitePool,
    pub store: Arc<SqliteEvaluationStore>,
}

pub async fn setup() -> TestStore {
    let root = tempfile::tempdir().expect("create temp dir");
    let pool = init_database(&root.path().join("showrate.db"))
        .await
        .expect("init database");
    let store = Arc::new(SqliteEvaluationStore::new(pool.clone()));
    TestStore { root, pool, store }
}

pub async fn seed_performance(pool: &SqlitePool, title: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO performance (id, title) VALUES (?, ?)")
        .bind(id.to_string())
        .bind(title)
        .execute(pool)
        .await
        .expect("seed performance");
    id
}

pub async fn evaluation_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM evaluation")
        .fetch_one(pool)
        .await
        .expect("count evaluations")
}

pub async fn evaluation_count_for(pool: &SqlitePool, performance_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM evaluation WHERE performance_id = ?")
        .bind(performance_id.to_string())
        .fetch_one(pool)
        .await
        .expect("count evaluations for performance")
}
