//! Session orchestration tests: the guest-to-account hand-off end to end.

mod common;

use showrate_core::reconcile::upsert;
use showrate_core::stats::total_evaluated_by_viewer;
use showrate_core::{
    resolve_identity, session, AuthProvider, EvaluationStore, IdentityStore, LocalAuthProvider,
    MemoryIdentityStore, ViewerIdentity,
};
use showrate_common::Error;

#[tokio::test]
async fn sign_up_absorbs_guest_history() {
    let ctx = common::setup().await;
    let perf_a = common::seed_performance(&ctx.pool, "A").await;
    let perf_b = common::seed_performance(&ctx.pool, "B").await;

    let auth = LocalAuthProvider::new(ctx.pool.clone());
    let ids = MemoryIdentityStore::new();

    // Guest session: rate two performances
    let guest = resolve_identity(&auth, &ids).await;
    let guest_id = guest.guest_id().expect("anonymous session");
    upsert(ctx.store.as_ref(), &guest, perf_a, 4.0, 3.5)
        .await
        .expect("guest rates A");
    upsert(ctx.store.as_ref(), &guest, perf_b, 2.0, 2.0)
        .await
        .expect("guest rates B");

    // Sign-up runs the migration and discards the guest id
    let user = session::sign_up(&auth, &ids, ctx.store.as_ref(), "new@example.com", "pw123456")
        .await
        .expect("sign up");

    let account = ViewerIdentity::Authenticated { user_id: user.id };
    let former_guest = ViewerIdentity::Anonymous { guest_id };

    assert_eq!(
        total_evaluated_by_viewer(ctx.store.as_ref(), &account).await.unwrap(),
        2
    );
    assert_eq!(
        total_evaluated_by_viewer(ctx.store.as_ref(), &former_guest).await.unwrap(),
        0,
        "rows moved, not duplicated"
    );
    assert_eq!(ids.get(), None, "guest id is discarded after migration");

    // The session now resolves to the account
    let identity = resolve_identity(&auth, &ids).await;
    assert_eq!(identity, account);
}

#[tokio::test]
async fn sign_in_collision_prefers_the_account_row() {
    let ctx = common::setup().await;
    let performance = common::seed_performance(&ctx.pool, "Contested").await;

    let auth = LocalAuthProvider::new(ctx.pool.clone());
    let ids = MemoryIdentityStore::new();

    // Earlier authenticated session on another device: user rates the
    // performance under the account
    let user = auth
        .sign_up("returning@example.com", "pw123456")
        .await
        .expect("account exists");
    let account = ViewerIdentity::Authenticated { user_id: user.id };
    upsert(ctx.store.as_ref(), &account, performance, 5.0, 2.0)
        .await
        .expect("account rating");
    auth.sign_out().await;

    // Fresh guest session on this device rates the same performance
    let guest = resolve_identity(&auth, &ids).await;
    upsert(ctx.store.as_ref(), &guest, performance, 3.0, 4.0)
        .await
        .expect("guest rating");

    session::sign_in(&auth, &ids, ctx.store.as_ref(), "returning@example.com", "pw123456")
        .await
        .expect("sign in");

    assert_eq!(common::evaluation_count_for(&ctx.pool, performance).await, 1);
    let survivor = ctx
        .store
        .find_by_owner_and_performance(&account, performance)
        .await
        .unwrap()
        .expect("account row survives");
    assert_eq!(survivor.star_rating, 5.0);
    assert_eq!(survivor.like_rating, 2.0);
}

#[tokio::test]
async fn sign_in_with_wrong_password_is_an_opaque_auth_error() {
    let ctx = common::setup().await;
    let auth = LocalAuthProvider::new(ctx.pool.clone());
    let ids = MemoryIdentityStore::new();

    auth.sign_up("someone@example.com", "correct-horse")
        .await
        .expect("sign up");
    auth.sign_out().await;

    let err = session::sign_in(&auth, &ids, ctx.store.as_ref(), "someone@example.com", "wrong")
        .await
        .expect_err("wrong password must fail");
    assert!(matches!(err, Error::Auth(_)), "got: {:?}", err);
    assert!(auth.current_user().await.is_none());
}

#[tokio::test]
async fn duplicate_sign_up_is_rejected() {
    let ctx = common::setup().await;
    let auth = LocalAuthProvider::new(ctx.pool.clone());

    auth.sign_up("taken@example.com", "first-pw").await.expect("first sign up");
    auth.sign_out().await;

    let err = auth
        .sign_up("taken@example.com", "second-pw")
        .await
        .expect_err("email is taken");
    assert!(matches!(err, Error::Auth(_)), "got: {:?}", err);
}

#[tokio::test]
async fn sign_out_clears_the_guest_id() {
    let ctx = common::setup().await;
    let auth = LocalAuthProvider::new(ctx.pool.clone());
    let ids = MemoryIdentityStore::new();

    let guest = resolve_identity(&auth, &ids).await;
    let old_guest_id = guest.guest_id().expect("anonymous session");

    session::sign_out(&auth, &ids).await;
    assert_eq!(ids.get(), None);

    // The next anonymous session gets a fresh id, never the old one
    let fresh = resolve_identity(&auth, &ids).await;
    assert_ne!(fresh.guest_id(), Some(old_guest_id));
}

#[tokio::test]
async fn sign_up_without_guest_history_still_succeeds() {
    let ctx = common::setup().await;
    let auth = LocalAuthProvider::new(ctx.pool.clone());
    let ids = MemoryIdentityStore::new();

    let user = session::sign_up(&auth, &ids, ctx.store.as_ref(), "clean@example.com", "pw123456")
        .await
        .expect("sign up with no prior guest session");

    let account = ViewerIdentity::Authenticated { user_id: user.id };
    assert_eq!(
        total_evaluated_by_viewer(ctx.store.as_ref(), &account).await.unwrap(),
        0
    );
}
