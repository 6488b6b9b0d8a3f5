//! Viewer identity resolution
//!
//! Every rating request runs under exactly one viewer identity: an
//! authenticated user id issued by the auth provider, or a locally persisted
//! anonymous guest id. Resolution is total - it never fails, falling back to
//! the guest path when the auth provider has no current principal (or cannot
//! answer at all).

use crate::auth::AuthProvider;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// The authenticated-or-anonymous principal making rating requests.
///
/// Never both at once: an evaluation row is owned by a user id or a guest
/// id, exclusively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewerIdentity {
    Authenticated { user_id: Uuid },
    Anonymous { guest_id: Uuid },
}

impl ViewerIdentity {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, ViewerIdentity::Authenticated { .. })
    }

    /// The user id when authenticated
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            ViewerIdentity::Authenticated { user_id } => Some(*user_id),
            ViewerIdentity::Anonymous { .. } => None,
        }
    }

    /// The guest id when anonymous
    pub fn guest_id(&self) -> Option<Uuid> {
        match self {
            ViewerIdentity::Authenticated { .. } => None,
            ViewerIdentity::Anonymous { guest_id } => Some(*guest_id),
        }
    }
}

/// Local persistence for the anonymous guest id.
///
/// Injected rather than read from a hidden global so tests can substitute
/// an in-memory fake. The surface is infallible: implementations log and
/// swallow I/O problems, since a lost guest id only costs the viewer their
/// anonymous history.
pub trait IdentityStore: Send + Sync {
    fn get(&self) -> Option<Uuid>;
    fn set(&self, id: Uuid);
    fn clear(&self);
}

/// Guest id persisted as a text file under the showrate root folder.
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl IdentityStore for FileIdentityStore {
    fn get(&self) -> Option<Uuid> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read guest id file {}: {}", self.path.display(), e);
                return None;
            }
        };
        match Uuid::parse_str(content.trim()) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Ignoring malformed guest id file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn set(&self, id: Uuid) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("Failed to create {}: {}", parent.display(), e);
                return;
            }
        }
        if let Err(e) = std::fs::write(&self.path, id.to_string()) {
            warn!("Failed to persist guest id to {}: {}", self.path.display(), e);
        }
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to clear guest id file {}: {}", self.path.display(), e),
        }
    }
}

/// In-memory identity store for tests and embedded use.
#[derive(Default)]
pub struct MemoryIdentityStore {
    inner: RwLock<Option<Uuid>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn get(&self) -> Option<Uuid> {
        *self.inner.read().unwrap()
    }

    fn set(&self, id: Uuid) {
        *self.inner.write().unwrap() = Some(id);
    }

    fn clear(&self) {
        *self.inner.write().unwrap() = None;
    }
}

/// Determine the active viewer identity for the current session.
///
/// An authenticated principal always wins. Otherwise the guest id is read
/// from the identity store, generating and persisting a fresh v4 UUID on
/// first use.
pub async fn resolve_identity(
    auth: &dyn AuthProvider,
    ids: &dyn IdentityStore,
) -> ViewerIdentity {
    if let Some(user) = auth.current_user().await {
        return ViewerIdentity::Authenticated { user_id: user.id };
    }

    match ids.get() {
        Some(guest_id) => ViewerIdentity::Anonymous { guest_id },
        None => {
            let guest_id = Uuid::new_v4();
            ids.set(guest_id);
            debug!("Generated new guest id {}", guest_id);
            ViewerIdentity::Anonymous { guest_id }
        }
    }
}
