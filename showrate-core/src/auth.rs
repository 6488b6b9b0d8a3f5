//! Auth provider seam
//!
//! The protocol never issues tokens itself; it consumes an opaque
//! `AuthProvider` capability. Provider error messages are surfaced verbatim
//! to the caller - the core attaches no meaning to them.
//!
//! `LocalAuthProvider` is a self-contained implementation over the
//! `user_profile` table (salted SHA-256 digests, in-process session slot),
//! used for development and tests. Production embeds a real provider behind
//! the same trait.

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use sha2::{Digest, Sha256};
use showrate_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use std::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// An authenticated principal as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// Opaque authentication capability consumed by the core.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Register a new principal. Errors are opaque messages.
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser>;

    /// Authenticate an existing principal. Errors are opaque messages.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser>;

    /// The currently signed-in principal, if any. A provider that cannot
    /// answer reports none; callers fall back to the guest path.
    async fn current_user(&self) -> Option<AuthUser>;

    /// End the current session.
    async fn sign_out(&self);
}

/// Email/password provider backed by the `user_profile` table.
pub struct LocalAuthProvider {
    pool: SqlitePool,
    session: RwLock<Option<AuthUser>>,
}

impl LocalAuthProvider {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            session: RwLock::new(None),
        }
    }
}

fn generate_salt() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser> {
        if email.is_empty() || password.is_empty() {
            return Err(Error::Auth("email and password are required".to_string()));
        }

        // A profile row with credentials means the address is taken; a row
        // without credentials is a placeholder created by the owner
        // bootstrap and may be claimed
        let existing = sqlx::query(
            "SELECT id, password_hash FROM user_profile WHERE email = ? LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let salt = generate_salt();
        let hash = hash_password(&salt, password);

        let user = match existing {
            Some(row) if !row.get::<String, _>("password_hash").is_empty() => {
                return Err(Error::Auth("email already registered".to_string()));
            }
            Some(row) => {
                let id: String = row.get("id");
                sqlx::query(
                    "UPDATE user_profile SET password_hash = ?, password_salt = ? WHERE id = ?",
                )
                .bind(&hash)
                .bind(&salt)
                .bind(&id)
                .execute(&self.pool)
                .await?;
                AuthUser {
                    id: Uuid::parse_str(&id)
                        .map_err(|e| Error::Internal(format!("malformed user id: {}", e)))?,
                    email: email.to_string(),
                }
            }
            None => {
                let id = Uuid::new_v4();
                sqlx::query(
                    "INSERT INTO user_profile (id, email, password_hash, password_salt, created_at)
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(id.to_string())
                .bind(email)
                .bind(&hash)
                .bind(&salt)
                .bind(Utc::now().to_rfc3339())
                .execute(&self.pool)
                .await?;
                AuthUser {
                    id,
                    email: email.to_string(),
                }
            }
        };

        info!("Registered user {}", user.id);
        *self.session.write().unwrap() = Some(user.clone());
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let row = sqlx::query(
            "SELECT id, password_hash, password_salt FROM user_profile
             WHERE email = ? AND password_hash != '' LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or_else(|| Error::Auth("invalid email or password".to_string()))?;
        let stored_hash: String = row.get("password_hash");
        let salt: String = row.get("password_salt");

        if hash_password(&salt, password) != stored_hash {
            return Err(Error::Auth("invalid email or password".to_string()));
        }

        let id: String = row.get("id");
        let user = AuthUser {
            id: Uuid::parse_str(&id)
                .map_err(|e| Error::Internal(format!("malformed user id: {}", e)))?,
            email: email.to_string(),
        };

        *self.session.write().unwrap() = Some(user.clone());
        Ok(user)
    }

    async fn current_user(&self) -> Option<AuthUser> {
        self.session.read().unwrap().clone()
    }

    async fn sign_out(&self) {
        *self.session.write().unwrap() = None;
    }
}
