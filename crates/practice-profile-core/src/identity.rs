//! Identity of the signed-in user.
//!
//! The session only needs an opaque key to look profiles up by; it never
//! validates or refreshes it.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::models::UserId;

/// Supplies the current user's identifier, if one has been resolved.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user_id(&self) -> Option<UserId>;
}

/// Identity fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<UserId>);

impl StaticIdentity {
    pub fn signed_in(id: impl Into<UserId>) -> Self {
        Self(Some(id.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user_id(&self) -> Option<UserId> {
        self.0.clone()
    }
}

/// Identity that the host resolves after the session has started,
/// e.g. once its auth callback completes.
#[derive(Debug, Default)]
pub struct SessionIdentity {
    current: RwLock<Option<UserId>>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, id: impl Into<UserId>) {
        let id = id.into();
        tracing::info!(user = %id, "Identity resolved");
        match self.current.write() {
            Ok(mut current) => *current = Some(id),
            Err(poisoned) => *poisoned.into_inner() = Some(id),
        }
    }

    pub fn sign_out(&self) {
        tracing::info!("Identity cleared");
        match self.current.write() {
            Ok(mut current) => *current = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    fn get(&self) -> Option<UserId> {
        match self.current.read() {
            Ok(current) => current.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl IdentityProvider for SessionIdentity {
    async fn current_user_id(&self) -> Option<UserId> {
        self.get()
    }
}
