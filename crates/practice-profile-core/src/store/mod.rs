//! Record store layer for practitioner profiles.
//!
//! The store is keyed by the identity provider's user id and holds at most
//! one profile per user. Lookup and write are separate calls; nothing here
//! makes a find-then-create sequence atomic.

mod memory;
mod schema;
mod sqlite;

pub use memory::*;
pub use schema::*;
pub use sqlite::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{PractitionerProfile, ProfileFields, UserId};

/// Record store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Profile not found: {0}")]
    NotFound(UserId),

    #[error("Profile already exists: {0}")]
    AlreadyExists(UserId),

    #[error("Store returned profile {returned} for user {expected}")]
    IdentifierMismatch { expected: UserId, returned: UserId },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed persistence for one profile per user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up the profile stored under `id`.
    async fn find(&self, id: &UserId) -> StoreResult<Option<PractitionerProfile>>;

    /// Store a new profile under `id`. Fails if one already exists.
    async fn create(&self, id: &UserId, fields: &ProfileFields)
        -> StoreResult<PractitionerProfile>;

    /// Overwrite every field of the profile stored under `id`.
    ///
    /// The identifier only selects the row; it is never part of the payload.
    async fn update(&self, id: &UserId, fields: &ProfileFields)
        -> StoreResult<PractitionerProfile>;
}
