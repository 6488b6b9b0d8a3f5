//! Produced-interface tests: the five operations a presentation layer uses,
//! plus the optimistic pending-write behavior around them.

mod common;

use showrate_common::Error;
use showrate_core::{EvaluationService, MigrationOutcome, ViewerIdentity};
use uuid::Uuid;

fn guest() -> ViewerIdentity {
    ViewerIdentity::Anonymous {
        guest_id: Uuid::new_v4(),
    }
}

#[tokio::test]
async fn upsert_confirms_the_pending_write_on_success() {
    let ctx = common::setup().await;
    let performance = common::seed_performance(&ctx.pool, "Saved").await;
    let service = EvaluationService::new(ctx.store.clone());
    let owner = guest();

    let saved = service
        .upsert_evaluation(&owner, performance, 3.7, 4.2)
        .await
        .expect("upsert");
    assert_eq!(saved.star_rating, 3.5);
    assert_eq!(saved.like_rating, 4.0);
    assert!(
        service.pending().is_empty(),
        "confirmed writes must leave the pending queue"
    );
}

#[tokio::test]
async fn failed_upsert_rolls_the_pending_write_back() {
    let ctx = common::setup().await;
    let service = EvaluationService::new(ctx.store.clone());
    let owner = guest();

    // Unknown performance: the store rejects the foreign key
    let err = service
        .upsert_evaluation(&owner, Uuid::new_v4(), 3.0, 3.0)
        .await
        .expect_err("unknown performance must fail");
    assert!(matches!(err, Error::Internal(_)), "got: {:?}", err);
    assert!(
        service.pending().is_empty(),
        "failed writes must not linger as pending"
    );
}

#[tokio::test]
async fn unset_rating_is_rejected_before_any_store_call() {
    let ctx = common::setup().await;
    let performance = common::seed_performance(&ctx.pool, "Partial").await;
    let service = EvaluationService::new(ctx.store.clone());
    let owner = guest();

    let err = service
        .upsert_evaluation(&owner, performance, 0.0, 4.0)
        .await
        .expect_err("partial rating must not persist");
    assert!(matches!(err, Error::Validation(_)), "got: {:?}", err);
    assert!(service.pending().is_empty());
    assert_eq!(common::evaluation_count(&ctx.pool).await, 0);
}

#[tokio::test]
async fn delete_retracts_the_viewers_row() {
    let ctx = common::setup().await;
    let performance = common::seed_performance(&ctx.pool, "Retracted").await;
    let service = EvaluationService::new(ctx.store.clone());
    let owner = guest();

    service
        .upsert_evaluation(&owner, performance, 4.0, 4.0)
        .await
        .expect("rate first");
    assert_eq!(common::evaluation_count(&ctx.pool).await, 1);

    service
        .delete_evaluation(&owner, performance)
        .await
        .expect("retract");
    assert_eq!(common::evaluation_count(&ctx.pool).await, 0);

    // Retracting again is a no-op success
    service
        .delete_evaluation(&owner, performance)
        .await
        .expect("second retraction is fine");
}

#[tokio::test]
async fn delete_only_touches_the_callers_row() {
    let ctx = common::setup().await;
    let performance = common::seed_performance(&ctx.pool, "Shared").await;
    let service = EvaluationService::new(ctx.store.clone());
    let owner_a = guest();
    let owner_b = guest();

    service
        .upsert_evaluation(&owner_a, performance, 4.0, 4.0)
        .await
        .expect("a rates");
    service
        .upsert_evaluation(&owner_b, performance, 2.0, 2.0)
        .await
        .expect("b rates");

    service
        .delete_evaluation(&owner_a, performance)
        .await
        .expect("a retracts");

    assert_eq!(common::evaluation_count_for(&ctx.pool, performance).await, 1);
    let stats = service.performance_stats(performance).await.expect("stats");
    assert_eq!(stats.count, 1);
    assert_eq!(stats.avg_star, Some(2.0));
}

#[tokio::test]
async fn service_surface_covers_migration_and_aggregation() {
    let ctx = common::setup().await;
    let performance = common::seed_performance(&ctx.pool, "Full loop").await;
    let service = EvaluationService::new(ctx.store.clone());

    let guest_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();
    let guest = ViewerIdentity::Anonymous { guest_id };
    let user = ViewerIdentity::Authenticated { user_id };

    service
        .upsert_evaluation(&guest, performance, 4.0, 1.0)
        .await
        .expect("guest rates");

    let outcome = service.migrate_guest_to_user(guest_id, user_id).await;
    assert_eq!(outcome, MigrationOutcome { migrated: 1, errors: 0 });

    assert_eq!(service.viewer_total(&user).await.unwrap(), 1);
    assert_eq!(service.viewer_total(&guest).await.unwrap(), 0);

    let stats = service.performance_stats(performance).await.expect("stats");
    assert_eq!(stats.count, 1);
    assert_eq!(stats.avg_star, Some(4.0));
    assert_eq!(stats.avg_like, Some(1.0));
}
