//! Guest-to-user evaluation migration
//!
//! On the first sign-in/sign-up after a guest session, every guest-owned
//! evaluation is re-parented to the authenticated identity. Collisions -
//! the user already rated the same performance under their account on
//! another device - are resolved by discarding the guest row; the account
//! row wins unconditionally, with no value or timestamp comparison.
//!
//! The scan-and-reparent loop is non-transactional: each row's decision is
//! independent, per-row failures are counted and logged rather than thrown,
//! and nothing is rolled back when a later row fails. Running the migration
//! again with the same pair finds zero guest rows and reports `{0, 0}`.

use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::identity::ViewerIdentity;
use crate::store::EvaluationStore;
use showrate_common::Error;

/// Counts reported by one migration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationOutcome {
    /// Rows re-parented to the user
    pub migrated: u32,
    /// Rows that failed to move or to be discarded
    pub errors: u32,
}

/// Re-parent every evaluation owned by `guest_id` to `user_id`.
///
/// Best-effort: the caller gets counts, never an error. A failure of the
/// initial scan itself yields `{0, 0}` after logging.
pub async fn migrate_guest_to_user(
    store: &dyn EvaluationStore,
    guest_id: Uuid,
    user_id: Uuid,
) -> MigrationOutcome {
    let guest_owner = ViewerIdentity::Anonymous { guest_id };
    let user_owner = ViewerIdentity::Authenticated { user_id };

    let guest_rows = match store.list_by_owner(&guest_owner).await {
        Ok(rows) => rows,
        Err(e) => {
            error!("Failed to fetch guest evaluations for {}: {}", guest_id, e);
            return MigrationOutcome::default();
        }
    };

    if guest_rows.is_empty() {
        return MigrationOutcome::default();
    }

    // Re-parenting sets user_id; the profile row its foreign key needs must
    // exist before the loop starts
    if let Err(e) = store.ensure_owner(&user_owner).await {
        error!("Cannot prepare user {} for migration: {}", user_id, e);
        return MigrationOutcome::default();
    }

    let mut migrated = 0;
    let mut errors = 0;

    for row in guest_rows {
        let collision = match store
            .find_by_owner_and_performance(&user_owner, row.performance_id)
            .await
        {
            Ok(existing) => existing.is_some(),
            Err(e) => {
                warn!("Collision probe failed for evaluation {}: {}", row.id, e);
                errors += 1;
                continue;
            }
        };

        if collision {
            // The user's own evaluation wins; drop the guest's
            match store.delete(row.id).await {
                Ok(()) => {
                    debug!(
                        "Discarded guest evaluation {} (user already rated performance {})",
                        row.id, row.performance_id
                    );
                }
                Err(e) => {
                    warn!("Failed to discard guest evaluation {}: {}", row.id, e);
                    errors += 1;
                }
            }
            continue;
        }

        match store.reparent(row.id, &user_owner).await {
            Ok(()) => migrated += 1,
            Err(Error::ConstraintViolation(_)) => {
                // The user rated this performance between our probe and the
                // reparent; same collision, same resolution
                match store.delete(row.id).await {
                    Ok(()) => {
                        debug!(
                            "Discarded guest evaluation {} (user row appeared mid-migration)",
                            row.id
                        );
                    }
                    Err(e) => {
                        warn!("Failed to discard guest evaluation {}: {}", row.id, e);
                        errors += 1;
                    }
                }
            }
            Err(e) => {
                warn!("Failed to migrate evaluation {}: {}", row.id, e);
                errors += 1;
            }
        }
    }

    info!(
        "Guest migration {} -> {}: {} migrated, {} errors",
        guest_id, user_id, migrated, errors
    );

    MigrationOutcome { migrated, errors }
}
