//! The produced interface
//!
//! `EvaluationService` is the surface a presentation layer consumes: the
//! upsert, the owner retraction, the guest migration trigger, and the two
//! aggregation views. It layers the optimistic pending-write queue over the
//! reconciler so callers can display a rating the instant it is entered and
//! reconcile if persistence fails.

use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::identity::ViewerIdentity;
use crate::migrate::{self, MigrationOutcome};
use crate::pending::PendingWrites;
use crate::rating;
use crate::reconcile;
use crate::stats::{self, PerformanceStats};
use crate::store::EvaluationStore;
use showrate_common::db::models::Evaluation;
use showrate_common::{Error, Result};

pub struct EvaluationService {
    store: Arc<dyn EvaluationStore>,
    pending: PendingWrites,
}

impl EvaluationService {
    pub fn new(store: Arc<dyn EvaluationStore>) -> Self {
        Self {
            store,
            pending: PendingWrites::new(),
        }
    }

    /// In-flight optimistic values, for display while writes resolve.
    pub fn pending(&self) -> &PendingWrites {
        &self.pending
    }

    /// Save a rating, inserting or updating as needed. The normalized value
    /// is visible via [`pending`](Self::pending) for the duration of the
    /// store round trip.
    pub async fn upsert_evaluation(
        &self,
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

        self.pending.apply(
            performance_id,
            rating::normalize(raw_star),
            rating::normalize(raw_like),
        );

        match reconcile::upsert(self.store.as_ref(), owner, performance_id, raw_star, raw_like)
            .await
        {
            Ok(saved) => {
                self.pending.confirm(performance_id);
                Ok(saved)
            }
            Err(e) => {
                self.pending.rollback(performance_id);
                warn!(
                    "Failed to save evaluation for performance {}: {}",
                    performance_id, e
                );
                Err(e)
            }
        }
    }

    /// Owner retraction ("not seen"): remove the viewer's evaluation of a
    /// performance entirely. Retracting a performance the viewer never rated
    /// is a no-op success.
    pub async fn delete_evaluation(
        &self,
        owner: &ViewerIdentity,
        performance_id: Uuid,
    ) -> Result<()> {
        self.pending.rollback(performance_id);

        match self
            .store
            .find_by_owner_and_performance(owner, performance_id)
            .await?
        {
            Some(row) => self.store.delete(row.id).await,
            None => Ok(()),
        }
    }

    /// Re-parent all of a guest's evaluations to an authenticated user.
    /// Best-effort; returns counts, never an error.
    pub async fn migrate_guest_to_user(&self, guest_id: Uuid, user_id: Uuid) -> MigrationOutcome {
        migrate::migrate_guest_to_user(self.store.as_ref(), guest_id, user_id).await
    }

    /// Community rating summary for one performance.
    pub async fn performance_stats(&self, performance_id: Uuid) -> Result<PerformanceStats> {
        stats::per_performance_stats(self.store.as_ref(), performance_id).await
    }

    /// How many performances the viewer has evaluated.
    pub async fn viewer_total(&self, owner: &ViewerIdentity) -> Result<usize> {
        stats::total_evaluated_by_viewer(self.store.as_ref(), owner).await
    }
}
