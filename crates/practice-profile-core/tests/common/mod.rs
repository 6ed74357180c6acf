//! Shared test doubles.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use practice_profile_core::models::{PractitionerProfile, ProfileFields, UserId};
use practice_profile_core::store::{RecordStore, StoreError, StoreResult};

/// A store call as observed by [`CountingStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Find(UserId),
    Create(UserId, ProfileFields),
    Update(UserId, ProfileFields),
}

/// Wraps a real store, recording every call and optionally failing `find`.
pub struct CountingStore<S> {
    inner: S,
    calls: Mutex<Vec<Call>>,
    failing_finds: AtomicUsize,
}

impl<S: RecordStore> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            failing_finds: AtomicUsize::new(0),
        }
    }

    /// Make the next `n` lookups fail with a transport error.
    pub fn fail_next_finds(&self, n: usize) {
        self.failing_finds.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn creates(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Create(..)))
            .count()
    }

    pub fn updates(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Update(..)))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for CountingStore<S> {
    async fn find(&self, id: &UserId) -> StoreResult<Option<PractitionerProfile>> {
        self.record(Call::Find(id.clone()));
        let failing = self
            .failing_finds
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Unavailable("connection reset by peer".into()));
        }
        self.inner.find(id).await
    }

    async fn create(
        &self,
        id: &UserId,
        fields: &ProfileFields,
    ) -> StoreResult<PractitionerProfile> {
        self.record(Call::Create(id.clone(), fields.clone()));
        self.inner.create(id, fields).await
    }

    async fn update(
        &self,
        id: &UserId,
        fields: &ProfileFields,
    ) -> StoreResult<PractitionerProfile> {
        self.record(Call::Update(id.clone(), fields.clone()));
        self.inner.update(id, fields).await
    }
}

/// Store whose first `find` parks until released, to hold a save or load in
/// flight. Later lookups pass straight through.
pub struct GatedStore<S> {
    inner: S,
    gated: AtomicBool,
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl<S: RecordStore> GatedStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            gated: AtomicBool::new(true),
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for GatedStore<S> {
    async fn find(&self, id: &UserId) -> StoreResult<Option<PractitionerProfile>> {
        if self.gated.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.find(id).await
    }

    async fn create(
        &self,
        id: &UserId,
        fields: &ProfileFields,
    ) -> StoreResult<PractitionerProfile> {
        self.inner.create(id, fields).await
    }

    async fn update(
        &self,
        id: &UserId,
        fields: &ProfileFields,
    ) -> StoreResult<PractitionerProfile> {
        self.inner.update(id, fields).await
    }
}
