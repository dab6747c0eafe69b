//! User identity resolution.
//!
//! The effective user id falls back through three sources in precedence
//! order: the persistent local store, the auth provider's current user,
//! then the in-memory profile. Hosting and commenting fail with
//! [`Error::IdentityUnavailable`] when none resolve.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use geolive_core::models::{ResolvedProfile, UserId};
use geolive_core::{Error, Result};

/// Display name used for join and comment payloads when no profile name
/// resolves.
pub const DEFAULT_DISPLAY_NAME: &str = "Anonymous";

/// Persistent local key-value store remembering the user id across
/// restarts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn stored_user_id(&self) -> Option<UserId>;
}

/// The currently authenticated user, as the auth provider reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
    pub email: Option<String>,
}

/// Synchronous view onto the auth provider's session.
#[cfg_attr(test, mockall::automock)]
pub trait AuthProvider: Send + Sync {
    fn current_user(&self) -> Option<AuthUser>;
}

/// Resolves the effective identity for session operations.
pub struct IdentityResolver {
    store: Arc<dyn IdentityStore>,
    auth: Arc<dyn AuthProvider>,
    profile: RwLock<Option<ResolvedProfile>>,
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("has_profile", &self.profile.read().is_some())
            .finish()
    }
}

impl IdentityResolver {
    #[must_use]
    pub fn new(store: Arc<dyn IdentityStore>, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            store,
            auth,
            profile: RwLock::new(None),
        }
    }

    /// Seed the in-memory profile, the last identity fallback.
    pub fn set_profile(&self, profile: ResolvedProfile) {
        *self.profile.write() = Some(profile);
    }

    /// The effective user id: stored id, then auth id, then profile id.
    pub async fn resolve_user_id(&self) -> Result<UserId> {
        if let Some(id) = self.store.stored_user_id().await {
            return Ok(id);
        }
        if let Some(user) = self.auth.current_user() {
            return Ok(user.id);
        }
        if let Some(profile) = self.profile.read().as_ref() {
            return Ok(profile.id.clone());
        }
        Err(Error::IdentityUnavailable)
    }

    /// The auth provider's id, used as the fallback owner when the backend
    /// reports an ownership mismatch.
    #[must_use]
    pub fn auth_user_id(&self) -> Option<UserId> {
        self.auth.current_user().map(|user| user.id)
    }

    /// Display name for join/comment payloads: profile name, auth display
    /// name, email local part, then `"Anonymous"`.
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(profile) = self.profile.read().as_ref() {
            if !profile.name.trim().is_empty() {
                return profile.name.clone();
            }
        }
        if let Some(user) = self.auth.current_user() {
            if let Some(name) = user.display_name.filter(|n| !n.trim().is_empty()) {
                return name;
            }
            if let Some(email) = user.email {
                if let Some(local) = email.trim().split('@').next().filter(|l| !l.is_empty()) {
                    return local.to_string();
                }
            }
        }
        DEFAULT_DISPLAY_NAME.to_string()
    }

    /// Avatar URL for join/comment payloads; empty when nothing resolves.
    #[must_use]
    pub fn avatar(&self) -> String {
        if let Some(profile) = self.profile.read().as_ref() {
            if !profile.avatar.is_empty() {
                return profile.avatar.clone();
            }
        }
        self.auth
            .current_user()
            .and_then(|user| user.avatar)
            .unwrap_or_default()
    }
}
