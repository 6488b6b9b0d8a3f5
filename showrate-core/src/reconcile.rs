//! Evaluation upsert reconciliation
//!
//! The check-then-act sequence here is not atomic: between the existence
//! check and the write, another tab or device may insert or delete the same
//! (owner, performance) row. The store's unique index is the final arbiter;
//! this module recovers from each race exactly once by crossing to the other
//! write path:
//!
//! - update hits `NotFound` (row deleted under us) -> insert instead
//! - insert hits `ConstraintViolation` (concurrent insert won) -> re-fetch,
//!   update the winner's row
//!
//! The single-retry bound makes convergence auditable: any interleaving of
//! at most two concurrent writers ends with exactly one row. Three or more
//! writers on one pair can exhaust the recovery and fail fatally; that is a
//! documented limitation, not a silent bug.

use showrate_common::db::models::Evaluation;
use showrate_common::{Error, Result};
use tracing::debug;
use uuid::Uuid;

use crate::identity::ViewerIdentity;
use crate::rating;
use crate::store::EvaluationStore;

/// Which write path the single recovery attempt takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recovery {
    /// First update failed `NotFound`; insert fresh.
    ViaInsert,
    /// First insert failed `ConstraintViolation`; re-fetch and update the
    /// row the concurrent winner created.
    ViaRefetchUpdate,
}

/// Upsert protocol phases. One pass through `Writing`, at most one pass
/// through `RecoveringOnce`.
#[derive(Debug)]
enum UpsertPhase {
    Checking,
    Writing { existing: Option<Evaluation> },
    RecoveringOnce(Recovery),
}

/// Save a rating for (owner, performance), inserting or updating as needed.
///
/// Both raw ratings must be set (> 0): a rating with either axis unset
/// lives only in transient UI state and is never persisted. Raw values are
/// normalized onto the 0.5 grid before any store call.
pub async fn upsert(
    store: &dyn EvaluationStore,
    owner: &ViewerIdentity,
    performance_id: Uuid,
    raw_star: f64,
    raw_like: f64,
) -> Result<Evaluation> {
    if raw_star <= 0.0 || raw_like <= 0.0 {
        return Err(Error::Validation(
            "both ratings must be set before saving".to_string(),
        ));
    }
    let star = rating::normalize(raw_star);
    let like = rating::normalize(raw_like);

    store.ensure_owner(owner).await?;

    let mut phase = UpsertPhase::Checking;
    loop {
        phase = match phase {
            UpsertPhase::Checking => {
                let existing = store
                    .find_by_owner_and_performance(owner, performance_id)
                    .await?;
                UpsertPhase::Writing { existing }
            }

            UpsertPhase::Writing { existing: Some(row) } => {
                match store.update(row.id, star, like).await {
                    Ok(saved) => return Ok(saved),
                    Err(Error::NotFound(msg)) => {
                        debug!(
                            "Evaluation {} vanished between check and update ({}); recovering via insert",
                            row.id, msg
                        );
                        UpsertPhase::RecoveringOnce(Recovery::ViaInsert)
                    }
                    Err(e) => return Err(e),
                }
            }

            UpsertPhase::Writing { existing: None } => {
                match store.insert(owner, performance_id, star, like).await {
                    Ok(saved) => return Ok(saved),
                    Err(Error::ConstraintViolation(msg)) => {
                        debug!(
                            "Concurrent insert won the race for performance {} ({}); recovering via update",
                            performance_id, msg
                        );
                        UpsertPhase::RecoveringOnce(Recovery::ViaRefetchUpdate)
                    }
                    Err(e) => return Err(e),
                }
            }

            UpsertPhase::RecoveringOnce(Recovery::ViaInsert) => {
                return match store.insert(owner, performance_id, star, like).await {
                    Ok(saved) => Ok(saved),
                    Err(e @ (Error::ConstraintViolation(_) | Error::NotFound(_))) => {
                        Err(Error::Internal(format!(
                            "upsert recovery failed for performance {}: {}",
                            performance_id, e
                        )))
                    }
                    Err(e) => Err(e),
                };
            }

            UpsertPhase::RecoveringOnce(Recovery::ViaRefetchUpdate) => {
                let winner = store
                    .find_by_owner_and_performance(owner, performance_id)
                    .await?
                    .ok_or_else(|| {
                        Error::Internal(format!(
                            "upsert recovery failed for performance {}: winning row vanished",
                            performance_id
                        ))
                    })?;

                return match store.update(winner.id, star, like).await {
                    Ok(saved) => Ok(saved),
                    Err(e @ (Error::ConstraintViolation(_) | Error::NotFound(_))) => {
                        Err(Error::Internal(format!(
                            "upsert recovery failed for performance {}: {}",
                            performance_id, e
                        )))
                    }
                    Err(e) => Err(e),
                };
            }
        };
    }
}
