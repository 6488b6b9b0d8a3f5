//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated principal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// An anonymous principal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guest {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A theatrical performance; content entity owned by administration,
/// read-only here
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Performance {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub poster_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One viewer's rating of one performance
///
/// Exactly one of `user_id` / `guest_id` is set. Both ratings lie in
/// [0.5, 5.0] on a 0.5 grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub guest_id: Option<Uuid>,
    pub performance_id: Uuid,
    pub star_rating: f64,
    pub like_rating: f64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Rating pair projected out for aggregation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RatingPair {
    pub star: f64,
    pub like: f64,
}
