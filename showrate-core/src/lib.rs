//! # Showrate Core
//!
//! The evaluation identity and merge protocol behind the showrate rating
//! application: viewers - authenticated or anonymous guests - rate
//! performances on two 0.5-5.0 axes, and the "one evaluation per viewer per
//! performance" invariant must hold across retries, concurrent tabs, and the
//! guest-to-account hand-off at login.
//!
//! Modules, leaf to root:
//! - [`identity`] - who is rating: authenticated user id or persisted guest id
//! - [`rating`] - snapping raw input onto the 0.5 grid
//! - [`store`] - the query/command surface over the relational store
//! - [`reconcile`] - the insert-or-update protocol with single-shot race recovery
//! - [`migrate`] - re-parenting guest evaluations to a fresh account
//! - [`stats`] - per-performance and per-viewer aggregation
//! - [`pending`] - optimistic values awaiting store confirmation
//! - [`auth`] / [`session`] - the auth seam and the login-time orchestration
//! - [`service`] - the facade a presentation layer consumes

pub mod auth;
pub mod identity;
pub mod migrate;
pub mod pending;
pub mod rating;
pub mod reconcile;
pub mod service;
pub mod session;
pub mod stats;
pub mod store;

pub use auth::{AuthProvider, AuthUser, LocalAuthProvider};
pub use identity::{
    resolve_identity, FileIdentityStore, IdentityStore, MemoryIdentityStore, ViewerIdentity,
};
pub use migrate::MigrationOutcome;
pub use pending::{PendingRating, PendingWrites};
pub use service::EvaluationService;
pub use stats::PerformanceStats;
pub use store::{EvaluationStore, SqliteEvaluationStore};

pub use showrate_common::db::models::{Evaluation, Performance, RatingPair};
pub use showrate_common::{Error, Result};
