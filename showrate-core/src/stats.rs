//! Aggregated community ratings
//!
//! Both views re-query the store in full on every call - no incremental
//! counters, no caching. O(evaluations) per call; acceptable at the
//! system's expected scale but a known limit if evaluation volume grows.

use serde::Serialize;
use uuid::Uuid;

use crate::identity::ViewerIdentity;
use crate::store::EvaluationStore;
use showrate_common::Result;

/// Community rating summary for one performance.
///
/// `None` averages mean "no evaluations yet", which is distinct from any
/// numeric value a real evaluation could produce (the rating floor is 0.5).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerformanceStats {
    pub count: usize,
    pub avg_star: Option<f64>,
    pub avg_like: Option<f64>,
}

/// Evaluation count and arithmetic mean of both rating axes over every
/// evaluation of the performance, regardless of owner type.
pub async fn per_performance_stats(
    store: &dyn EvaluationStore,
    performance_id: Uuid,
) -> Result<PerformanceStats> {
    let ratings = store.list_ratings_by_performance(performance_id).await?;

    if ratings.is_empty() {
        return Ok(PerformanceStats {
            count: 0,
            avg_star: None,
            avg_like: None,
        });
    }

    let n = ratings.len() as f64;
    let star_sum: f64 = ratings.iter().map(|r| r.star).sum();
    let like_sum: f64 = ratings.iter().map(|r| r.like).sum();

    Ok(PerformanceStats {
        count: ratings.len(),
        avg_star: Some(star_sum / n),
        avg_like: Some(like_sum / n),
    })
}

/// How many performances the viewer has evaluated, used for progress display
/// and the "finished rating everything" gate.
pub async fn total_evaluated_by_viewer(
    store: &dyn EvaluationStore,
    owner: &ViewerIdentity,
) -> Result<usize> {
    Ok(store.list_by_owner(owner).await?.len())
}
