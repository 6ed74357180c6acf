//! Thread-safe handle on a [`ProfileSession`].

use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::{LoadOutcome, SaveOutcome};
use crate::store::StoreError;

use super::{ProfileSession, SessionError, SessionResult};

/// Cloneable handle for hosts that drive the session from several threads.
///
/// The lock is only held for synchronous state changes, never across a store
/// round-trip, so a save in flight shows up as `EditMode::Saving` to every
/// other caller.
///
/// Store round-trips run on a spawned tokio task that also applies the
/// result, so dropping the future returned by [`save`](Self::save) never
/// leaves the session stuck in `Saving`. Requires a tokio runtime.
#[derive(Clone)]
pub struct SharedProfileSession {
    inner: Arc<Mutex<ProfileSession>>,
}

impl SharedProfileSession {
    pub fn new(session: ProfileSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    // Session state is plain data; a panic elsewhere cannot leave it torn.
    fn lock(&self) -> MutexGuard<'_, ProfileSession> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read session state.
    pub fn with<R>(&self, f: impl FnOnce(&ProfileSession) -> R) -> R {
        f(&self.lock())
    }

    /// Apply a synchronous change (field edits, mode transitions).
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut ProfileSession) -> R) -> R {
        f(&mut self.lock())
    }

    pub async fn save(&self) -> SessionResult<SaveOutcome> {
        let pending = self.with_mut(|session| session.begin_save())?;
        let handle = self.clone();
        let task = tokio::spawn(async move {
            let result = pending.run().await;
            handle.with_mut(|session| session.finish_save(result))
        });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                let failed = Err(SessionError::Store(StoreError::Unavailable(format!(
                    "Save task failed: {}",
                    e
                ))));
                self.with_mut(|session| session.finish_save(failed))
            }
        }
    }

    pub async fn load(&self) -> SessionResult<LoadOutcome> {
        let pending = self.with(|session| session.begin_load())?;
        let generation = pending.generation();
        let handle = self.clone();
        let task = tokio::spawn(async move {
            let result = pending.run().await;
            handle.with_mut(|session| session.finish_load(generation, result))
        });

        match task.await {
            Ok(result) => result,
            Err(e) => Err(SessionError::Store(StoreError::Unavailable(format!(
                "Load task failed: {}",
                e
            )))),
        }
    }
}
