//! Save and load reconciliation against the record store.
//!
//! A save resolves the current user, looks the profile up, then issues
//! exactly one `create` or `update`. Lookup and write are two separate store
//! calls with no lock or version token between them: a concurrent writer for
//! the same user can race in that window. This is accepted for a store that
//! holds one profile per user.

use std::sync::Arc;

use crate::identity::IdentityProvider;
use crate::models::{
    LoadOutcome, PractitionerProfile, ProfileFields, SaveBranch, SaveOutcome, UserId,
};
use crate::store::{RecordStore, StoreError};

use super::{SessionError, SessionResult};

/// A save that has been admitted by the session and not yet run.
///
/// Owns everything the store round-trip needs so the session itself can stay
/// unlocked while it is in flight.
pub struct PendingSave {
    pub(super) store: Arc<dyn RecordStore>,
    pub(super) identity: Arc<dyn IdentityProvider>,
    pub(super) fields: ProfileFields,
}

impl PendingSave {
    /// Fields that will be written.
    pub fn fields(&self) -> &ProfileFields {
        &self.fields
    }

    /// Run the lookup and the single create-or-update. Never retries.
    pub async fn run(self) -> SessionResult<SaveOutcome> {
        let user_id = self
            .identity
            .current_user_id()
            .await
            .ok_or(SessionError::IdentityUnavailable)?;

        let existing = self.store.find(&user_id).await?;
        if let Some(found) = &existing {
            check_owner(&user_id, found)?;
        }

        let (branch, record) = match existing {
            Some(_) => {
                tracing::debug!(user = %user_id, "Profile exists, updating");
                let record = self.store.update(&user_id, &self.fields).await?;
                (SaveBranch::Updated, record)
            }
            None => {
                tracing::debug!(user = %user_id, "No profile yet, creating");
                let record = self.store.create(&user_id, &self.fields).await?;
                (SaveBranch::Created, record)
            }
        };
        check_owner(&user_id, &record)?;

        Ok(SaveOutcome { branch, record })
    }
}

/// A load that has been admitted by the session and not yet run.
pub struct PendingLoad {
    pub(super) store: Arc<dyn RecordStore>,
    pub(super) identity: Arc<dyn IdentityProvider>,
    pub(super) generation: u64,
}

impl PendingLoad {
    /// Number of successful saves the session had seen when this load was
    /// admitted. Pass it back to `finish_load`.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn run(self) -> SessionResult<LoadOutcome> {
        let user_id = self
            .identity
            .current_user_id()
            .await
            .ok_or(SessionError::IdentityUnavailable)?;

        match self.store.find(&user_id).await? {
            Some(record) => {
                check_owner(&user_id, &record)?;
                Ok(LoadOutcome::Loaded(record))
            }
            None => Ok(LoadOutcome::NotFound),
        }
    }
}

/// The session never adopts a record stored under someone else's id.
fn check_owner(expected: &UserId, record: &PractitionerProfile) -> Result<(), StoreError> {
    if &record.id == expected {
        Ok(())
    } else {
        Err(StoreError::IdentifierMismatch {
            expected: expected.clone(),
            returned: record.id.clone(),
        })
    }
}
