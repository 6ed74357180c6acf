//! In-process profile store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{RecordStore, StoreError, StoreResult};
use crate::models::{PractitionerProfile, ProfileFields, UserId};

/// Profile store kept in a `HashMap`. Same contract as the SQLite store.
#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: Mutex<HashMap<UserId, PractitionerProfile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing profile.
    pub fn with_profile(profile: PractitionerProfile) -> Self {
        let store = Self::default();
        if let Ok(mut profiles) = store.profiles.lock() {
            profiles.insert(profile.id.clone(), profile);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.profiles().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn profiles(&self) -> StoreResult<MutexGuard<'_, HashMap<UserId, PractitionerProfile>>> {
        self.profiles
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("Lock poisoned: {}", e)))
    }
}

#[async_trait]
impl RecordStore for MemoryProfileStore {
    async fn find(&self, id: &UserId) -> StoreResult<Option<PractitionerProfile>> {
        Ok(self.profiles()?.get(id).cloned())
    }

    async fn create(
        &self,
        id: &UserId,
        fields: &ProfileFields,
    ) -> StoreResult<PractitionerProfile> {
        let mut profiles = self.profiles()?;
        if profiles.contains_key(id) {
            return Err(StoreError::AlreadyExists(id.clone()));
        }
        let profile = PractitionerProfile::new(id.clone(), fields.clone());
        profiles.insert(id.clone(), profile.clone());
        Ok(profile)
    }

    async fn update(
        &self,
        id: &UserId,
        fields: &ProfileFields,
    ) -> StoreResult<PractitionerProfile> {
        let mut profiles = self.profiles()?;
        let profile = profiles
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        profile.fields = fields.clone();
        profile.updated_at = chrono::Utc::now().to_rfc3339();
        Ok(profile.clone())
    }
}
