//! Session orchestration
//!
//! Ties the auth provider, the identity store, and the evaluation store
//! together at the sign-in boundary. This is where the guest-to-user hand-off
//! happens: a successful sign-in or sign-up after a guest session migrates
//! every guest-owned evaluation and then discards the local guest id, which
//! is never reused.

use std::time::Duration;
use tracing::{info, warn};

use crate::auth::{AuthProvider, AuthUser};
use crate::identity::{IdentityStore, ViewerIdentity};
use crate::migrate;
use crate::store::EvaluationStore;
use showrate_common::Result;

const PROFILE_ENSURE_ATTEMPTS: u32 = 3;
const PROFILE_ENSURE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Sign in and absorb any guest history into the account.
///
/// Auth failure propagates (message surfaced verbatim). Migration failures
/// do not: they are logged and counted, and the sign-in still succeeds.
pub async fn sign_in(
    auth: &dyn AuthProvider,
    ids: &dyn IdentityStore,
    store: &dyn EvaluationStore,
    email: &str,
    password: &str,
) -> Result<AuthUser> {
    let user = auth.sign_in(email, password).await?;
    absorb_guest_session(ids, store, &user).await;
    Ok(user)
}

/// Sign up and absorb any guest history into the new account.
pub async fn sign_up(
    auth: &dyn AuthProvider,
    ids: &dyn IdentityStore,
    store: &dyn EvaluationStore,
    email: &str,
    password: &str,
) -> Result<AuthUser> {
    let user = auth.sign_up(email, password).await?;
    absorb_guest_session(ids, store, &user).await;
    Ok(user)
}

/// Sign out and clear the guest id so the next anonymous session starts
/// fresh rather than inheriting pre-login history.
pub async fn sign_out(auth: &dyn AuthProvider, ids: &dyn IdentityStore) {
    auth.sign_out().await;
    ids.clear();
}

async fn absorb_guest_session(
    ids: &dyn IdentityStore,
    store: &dyn EvaluationStore,
    user: &AuthUser,
) {
    ensure_profile_with_retry(store, user).await;

    if let Some(guest_id) = ids.get() {
        let outcome = migrate::migrate_guest_to_user(store, guest_id, user.id).await;
        info!(
            "Absorbed guest session {}: {} migrated, {} errors",
            guest_id, outcome.migrated, outcome.errors
        );
    }

    // Discarded even when there was nothing to migrate; a guest id must
    // never span an authentication boundary
    ids.clear();
}

/// The profile row is required by evaluation foreign keys; transient store
/// hiccups here should not fail an otherwise successful authentication.
async fn ensure_profile_with_retry(store: &dyn EvaluationStore, user: &AuthUser) {
    let owner = ViewerIdentity::Authenticated { user_id: user.id };

    for attempt in 1..=PROFILE_ENSURE_ATTEMPTS {
        match store.ensure_owner(&owner).await {
            Ok(()) => return,
            Err(e) if attempt < PROFILE_ENSURE_ATTEMPTS => {
                warn!(
                    "Profile bootstrap for {} failed (attempt {}/{}): {}",
                    user.id, attempt, PROFILE_ENSURE_ATTEMPTS, e
                );
                tokio::time::sleep(PROFILE_ENSURE_RETRY_DELAY).await;
            }
            Err(e) => {
                warn!(
                    "Profile bootstrap for {} failed after {} attempts: {}",
                    user.id, PROFILE_ENSURE_ATTEMPTS, e
                );
            }
        }
    }
}
