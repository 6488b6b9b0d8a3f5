//! Evaluation store adapter
//!
//! Thin query/command surface over the relational store. Every call is a
//! network round trip from the caller's perspective: no client-side cache,
//! every read may be stale by the time the next write lands. The reconciler
//! and migration engine are written against that assumption.
//!
//! All sqlx failures are classified into the semantic taxonomy at this
//! boundary - unique violation becomes `ConstraintViolation`, a vanished row
//! becomes `NotFound`, an elapsed timeout becomes `Transient` - so the
//! layers above never match on driver errors.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use showrate_common::db::models::{Evaluation, RatingPair};
use showrate_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::future::Future;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::identity::ViewerIdentity;

/// Query/command surface the protocol runs against.
///
/// Dyn-usable so tests can substitute fault-injecting doubles for the race
/// recovery paths.
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    /// Single-row fetch by the (owner, performance) key.
    async fn find_by_owner_and_performance(
        &self,
        owner: &ViewerIdentity,
        performance_id: Uuid,
    ) -> Result<Option<Evaluation>>;

    /// Insert a fresh evaluation. Fails with `ConstraintViolation` when a
    /// concurrent writer already holds the (owner, performance) pair.
    async fn insert(
        &self,
        owner: &ViewerIdentity,
        performance_id: Uuid,
        star: f64,
        like: f64,
    ) -> Result<Evaluation>;

    /// Update the ratings of an existing row. Fails with `NotFound` when the
    /// row no longer exists.
    async fn update(&self, evaluation_id: Uuid, star: f64, like: f64) -> Result<Evaluation>;

    /// Delete a row. Deleting an already-deleted row is not an error.
    async fn delete(&self, evaluation_id: Uuid) -> Result<()>;

    /// All evaluations owned by the identity, most recently updated first.
    async fn list_by_owner(&self, owner: &ViewerIdentity) -> Result<Vec<Evaluation>>;

    /// Rating pairs of every evaluation for a performance, for aggregation.
    async fn list_ratings_by_performance(&self, performance_id: Uuid) -> Result<Vec<RatingPair>>;

    /// Change a row's ownership columns only; ratings are untouched.
    async fn reparent(&self, evaluation_id: Uuid, new_owner: &ViewerIdentity) -> Result<()>;

    /// Idempotently create the guest/user_profile row the evaluation
    /// foreign keys require.
    async fn ensure_owner(&self, owner: &ViewerIdentity) -> Result<()>;
}

/// SQLite-backed store adapter.
pub struct SqliteEvaluationStore {
    pool: SqlitePool,
    timeout: Duration,
}

impl SqliteEvaluationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_timeout(
            pool,
            Duration::from_millis(showrate_common::config::DEFAULT_STORE_TIMEOUT_MS),
        )
    }

    pub fn with_timeout(pool: SqlitePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// A store call that never returns would stall the calling flow
    /// indefinitely; the deadline converts that into a retryable `Transient`.
    async fn guarded<T>(&self, op: &'static str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::Transient(format!(
                "{}: store call timed out after {} ms",
                op,
                self.timeout.as_millis()
            ))),
        }
    }
}

/// Classify a driver error into the semantic taxonomy.
fn classify(op: &str, err: sqlx::Error) -> Error {
    match err {
        sqlx::Error::RowNotFound => Error::NotFound(format!("{}: row not found", op)),
        sqlx::Error::PoolTimedOut => Error::Transient(format!("{}: connection pool timed out", op)),
        sqlx::Error::Io(e) => Error::Transient(format!("{}: {}", op, e)),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Error::ConstraintViolation(format!("{}: {}", op, db))
        }
        sqlx::Error::Database(db) if db.is_check_violation() => {
            Error::Validation(format!("{}: {}", op, db))
        }
        other => Error::Internal(format!("{}: {}", op, other)),
    }
}

fn parse_uuid(op: &str, raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::Internal(format!("{}: malformed uuid '{}': {}", op, raw, e)))
}

/// Timestamps are written as RFC 3339; rows created through SQL defaults
/// carry the bare `CURRENT_TIMESTAMP` form instead.
fn parse_timestamp(op: &str, raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
        .map_err(|e| Error::Internal(format!("{}: malformed timestamp '{}': {}", op, raw, e)))
}

fn map_evaluation_row(op: &str, row: &SqliteRow) -> Result<Evaluation> {
    let user_id = row
        .get::<Option<String>, _>("user_id")
        .map(|s| parse_uuid(op, &s))
        .transpose()?;
    let guest_id = row
        .get::<Option<String>, _>("guest_id")
        .map(|s| parse_uuid(op, &s))
        .transpose()?;

    Ok(Evaluation {
        id: parse_uuid(op, &row.get::<String, _>("id"))?,
        user_id,
        guest_id,
        performance_id: parse_uuid(op, &row.get::<String, _>("performance_id"))?,
        star_rating: row.get("star_rating"),
        like_rating: row.get("like_rating"),
        comment: row.get("comment"),
        created_at: parse_timestamp(op, &row.get::<String, _>("created_at"))?,
        updated_at: parse_timestamp(op, &row.get::<String, _>("updated_at"))?,
    })
}

/// Owner predicates always pair the equality filter with the complementary
/// IS NULL filter; a row matching both owner columns would be a constraint
/// breach, not a query result.
fn owner_filter(owner: &ViewerIdentity) -> (&'static str, Uuid) {
    match owner {
        ViewerIdentity::Authenticated { user_id } => ("user_id = ? AND guest_id IS NULL", *user_id),
        ViewerIdentity::Anonymous { guest_id } => ("guest_id = ? AND user_id IS NULL", *guest_id),
    }
}

#[async_trait]
impl EvaluationStore for SqliteEvaluationStore {
    async fn find_by_owner_and_performance(
        &self,
        owner: &ViewerIdentity,
        performance_id: Uuid,
    ) -> Result<Option<Evaluation>> {
        let (filter, key) = owner_filter(owner);
        let sql = format!(
            "SELECT * FROM evaluation WHERE {} AND performance_id = ? LIMIT 1",
            filter
        );

        self.guarded("find_by_owner_and_performance", async {
            let row = sqlx::query(&sql)
                .bind(key.to_string())
                .bind(performance_id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| classify("find_by_owner_and_performance", e))?;

            row.as_ref()
                .map(|r| map_evaluation_row("find_by_owner_and_performance", r))
                .transpose()
        })
        .await
    }

    async fn insert(
        &self,
        owner: &ViewerIdentity,
        performance_id: Uuid,
        star: f64,
        like: f64,
    ) -> Result<Evaluation> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        self.guarded("insert", async {
            sqlx::query(
                r#"
                INSERT INTO evaluation
                    (id, user_id, guest_id, performance_id, star_rating, like_rating,
                     comment, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, NULL, ?, ?)
                "#,
            )
            .bind(id.to_string())
            .bind(owner.user_id().map(|u| u.to_string()))
            .bind(owner.guest_id().map(|g| g.to_string()))
            .bind(performance_id.to_string())
            .bind(star)
            .bind(like)
            .bind(now.to_rfc3339())
            .bind(now.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| classify("insert", e))?;

            debug!("Inserted evaluation {} for performance {}", id, performance_id);

            Ok(Evaluation {
                id,
                user_id: owner.user_id(),
                guest_id: owner.guest_id(),
                performance_id,
                star_rating: star,
                like_rating: like,
                comment: None,
                created_at: now,
                updated_at: now,
            })
        })
        .await
    }

    async fn update(&self, evaluation_id: Uuid, star: f64, like: f64) -> Result<Evaluation> {
        self.guarded("update", async {
            let result = sqlx::query(
                "UPDATE evaluation SET star_rating = ?, like_rating = ?, updated_at = ? WHERE id = ?",
            )
            .bind(star)
            .bind(like)
            .bind(Utc::now().to_rfc3339())
            .bind(evaluation_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| classify("update", e))?;

            if result.rows_affected() == 0 {
                return Err(Error::NotFound(format!(
                    "update: evaluation {} no longer exists",
                    evaluation_id
                )));
            }

            let row = sqlx::query("SELECT * FROM evaluation WHERE id = ?")
                .bind(evaluation_id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| classify("update", e))?
                .ok_or_else(|| {
                    Error::NotFound(format!("update: evaluation {} no longer exists", evaluation_id))
                })?;

            map_evaluation_row("update", &row)
        })
        .await
    }

    async fn delete(&self, evaluation_id: Uuid) -> Result<()> {
        self.guarded("delete", async {
            sqlx::query("DELETE FROM evaluation WHERE id = ?")
                .bind(evaluation_id.to_string())
                .execute(&self.pool)
                .await
                .map_err(|e| classify("delete", e))?;
            Ok(())
        })
        .await
    }

    async fn list_by_owner(&self, owner: &ViewerIdentity) -> Result<Vec<Evaluation>> {
        let (filter, key) = owner_filter(owner);
        let sql = format!(
            "SELECT * FROM evaluation WHERE {} ORDER BY updated_at DESC",
            filter
        );

        self.guarded("list_by_owner", async {
            let rows = sqlx::query(&sql)
                .bind(key.to_string())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| classify("list_by_owner", e))?;

            rows.iter()
                .map(|r| map_evaluation_row("list_by_owner", r))
                .collect()
        })
        .await
    }

    async fn list_ratings_by_performance(&self, performance_id: Uuid) -> Result<Vec<RatingPair>> {
        self.guarded("list_ratings_by_performance", async {
            let pairs: Vec<(f64, f64)> = sqlx::query_as(
                "SELECT star_rating, like_rating FROM evaluation WHERE performance_id = ?",
            )
            .bind(performance_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify("list_ratings_by_performance", e))?;

            Ok(pairs
                .into_iter()
                .map(|(star, like)| RatingPair { star, like })
                .collect())
        })
        .await
    }

    async fn reparent(&self, evaluation_id: Uuid, new_owner: &ViewerIdentity) -> Result<()> {
        self.guarded("reparent", async {
            let result = sqlx::query(
                "UPDATE evaluation SET user_id = ?, guest_id = ? WHERE id = ?",
            )
            .bind(new_owner.user_id().map(|u| u.to_string()))
            .bind(new_owner.guest_id().map(|g| g.to_string()))
            .bind(evaluation_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| classify("reparent", e))?;

            if result.rows_affected() == 0 {
                return Err(Error::NotFound(format!(
                    "reparent: evaluation {} no longer exists",
                    evaluation_id
                )));
            }

            Ok(())
        })
        .await
    }

    async fn ensure_owner(&self, owner: &ViewerIdentity) -> Result<()> {
        self.guarded("ensure_owner", async {
            match owner {
                ViewerIdentity::Anonymous { guest_id } => {
                    sqlx::query("INSERT OR IGNORE INTO guest (id, created_at) VALUES (?, ?)")
                        .bind(guest_id.to_string())
                        .bind(Utc::now().to_rfc3339())
                        .execute(&self.pool)
                        .await
                        .map_err(|e| classify("ensure_owner", e))?;
                }
                ViewerIdentity::Authenticated { user_id } => {
                    // Placeholder email matches the bootstrap behavior of the
                    // auth layer; a later sign-up through the local provider
                    // claims the row with real credentials
                    sqlx::query(
                        "INSERT OR IGNORE INTO user_profile (id, email, created_at) VALUES (?, ?, ?)",
                    )
                    .bind(user_id.to_string())
                    .bind("unknown@example.com")
                    .bind(Utc::now().to_rfc3339())
                    .execute(&self.pool)
                    .await
                    .map_err(|e| classify("ensure_owner", e))?;
                }
            }
            Ok(())
        })
        .await
    }
}
