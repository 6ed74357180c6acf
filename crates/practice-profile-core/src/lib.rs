//! Practice Profile Core Library
//!
//! Lets the signed-in practitioner view and edit their own profile record and
//! persist it with an upsert-style save.
//!
//! # Architecture
//!
//! ```text
//!        host UI (form)
//!              │  begin_edit / update_field / save / cancel_edit
//!              ▼
//!     ┌─────────────────────┐   current_user_id   ┌────────────────────┐
//!     │   ProfileSession    │ ──────────────────▶ │  IdentityProvider  │
//!     │  draft, mode, error │                     └────────────────────┘
//!     └──────────┬──────────┘
//!                │  find ─▶ update (exists) | create (absent)
//!                ▼
//!     ┌─────────────────────┐
//!     │    RecordStore      │  SQLite / in-memory
//!     └─────────────────────┘
//! ```
//!
//! # Core Principle
//!
//! **A failed save never loses edits.** The session stays in `Editing` with
//! the draft untouched and the cause recorded until the user retries or
//! cancels.
//!
//! # Modules
//!
//! - [`models`]: Profile record, field enum, edit-session state
//! - [`session`]: Edit-session controller and save reconciliation
//! - [`store`]: Record store trait with SQLite and in-memory backends
//! - [`identity`]: Identity provider trait and implementations
//! - [`config`]: TOML configuration
//! - [`telemetry`]: `tracing` subscriber setup

pub mod config;
pub mod identity;
pub mod models;
pub mod session;
pub mod store;
pub mod telemetry;

// Re-export commonly used types
pub use config::ProfileConfig;
pub use identity::{IdentityProvider, SessionIdentity, StaticIdentity};
pub use models::{
    EditMode, PractitionerProfile, ProfileField, ProfileFields, RecordState, SaveBranch,
    SaveFailure, UserId,
};
pub use session::{ProfileSession, SessionError, SharedProfileSession};
pub use store::{MemoryProfileStore, RecordStore, SqliteProfileStore, StoreError};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::Arc;

use models::LoadOutcome;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ProfileError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Identity unavailable: {0}")]
    IdentityUnavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<StoreError> for ProfileError {
    fn from(e: StoreError) -> Self {
        ProfileError::DatabaseError(e.to_string())
    }
}

impl From<SessionError> for ProfileError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::IdentityUnavailable => ProfileError::IdentityUnavailable(e.to_string()),
            SessionError::Store(store) => store.into(),
            SessionError::SaveInProgress
            | SessionError::NotEditing
            | SessionError::EditInProgress => ProfileError::Rejected(e.to_string()),
        }
    }
}

impl From<config::ConfigError> for ProfileError {
    fn from(e: config::ConfigError) -> Self {
        ProfileError::ConfigError(e.to_string())
    }
}

impl From<models::UnknownField> for ProfileError {
    fn from(e: models::UnknownField) -> Self {
        ProfileError::InvalidInput(e.to_string())
    }
}

impl From<serde_json::Error> for ProfileError {
    fn from(e: serde_json::Error) -> Self {
        ProfileError::SerializationError(e.to_string())
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a profile database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<ProfileCore>, ProfileError> {
    let store = SqliteProfileStore::open(&path)?;
    Ok(ProfileCore::new(Arc::new(store), ProfileFields::default()))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<ProfileCore>, ProfileError> {
    let store = SqliteProfileStore::open_in_memory()?;
    Ok(ProfileCore::new(Arc::new(store), ProfileFields::default()))
}

/// Open the database described by a TOML config and install logging.
#[uniffi::export]
pub fn open_with_config(config_toml: String) -> Result<Arc<ProfileCore>, ProfileError> {
    let config = ProfileConfig::from_toml_str(&config_toml)?;
    telemetry::init_logging(&config.logging);

    let store = match &config.database.path {
        Some(path) => SqliteProfileStore::open(path)?,
        None => SqliteProfileStore::open_in_memory()?,
    };
    Ok(ProfileCore::new(Arc::new(store), config.defaults))
}

/// Install the `tracing` subscriber. Returns `false` if one already exists.
#[uniffi::export]
pub fn init_logging(filter: String, json: bool) -> bool {
    telemetry::init_logging(&config::LoggingConfig { filter, json })
}

// =========================================================================
// Main API Object
// =========================================================================

/// Profile edit session for the host UI.
#[derive(uniffi::Object)]
pub struct ProfileCore {
    identity: Arc<SessionIdentity>,
    session: SharedProfileSession,
}

impl std::fmt::Debug for ProfileCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileCore")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl ProfileCore {
    fn new(store: Arc<dyn RecordStore>, defaults: ProfileFields) -> Arc<Self> {
        let identity = Arc::new(SessionIdentity::new());
        let session = ProfileSession::with_defaults(store, identity.clone(), defaults);
        Arc::new(Self {
            identity,
            session: SharedProfileSession::new(session),
        })
    }
}

#[uniffi::export]
impl ProfileCore {
    // =========================================================================
    // Identity
    // =========================================================================

    /// Record the identity provider's id for the signed-in user.
    pub fn sign_in(&self, user_id: String) {
        self.identity.sign_in(user_id);
    }

    pub fn sign_out(&self) {
        self.identity.sign_out();
    }

    // =========================================================================
    // View State
    // =========================================================================

    /// Current draft values.
    pub fn draft(&self) -> FfiProfileFields {
        self.session.with(|s| s.draft().clone().into())
    }

    pub fn mode(&self) -> FfiEditMode {
        self.session.with(|s| s.mode().into())
    }

    /// Message of the last failed save or load, if any.
    pub fn last_error(&self) -> Option<String> {
        self.session
            .with(|s| s.last_error().map(|failure| failure.message.clone()))
    }

    pub fn is_editable(&self) -> bool {
        self.session.with(|s| s.is_editable())
    }

    pub fn can_save(&self) -> bool {
        self.session.with(|s| s.can_save())
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.session.with(|s| s.has_unsaved_changes())
    }

    /// Avatar fallback text.
    pub fn initials(&self) -> String {
        self.session.with(|s| s.draft().initials())
    }

    /// Last persisted record as JSON.
    pub fn persisted_json(&self) -> Result<Option<String>, ProfileError> {
        let persisted = self.session.with(|s| s.persisted().cloned());
        Ok(persisted.map(|p| p.to_json()).transpose()?)
    }

    // =========================================================================
    // Editing
    // =========================================================================

    pub fn begin_edit(&self) -> Result<(), ProfileError> {
        Ok(self.session.with_mut(|s| s.begin_edit())?)
    }

    /// Leave editing, discarding unsaved edits.
    pub fn cancel_edit(&self) -> Result<(), ProfileError> {
        Ok(self.session.with_mut(|s| s.cancel_edit())?)
    }

    pub fn toggle_edit(&self) -> Result<FfiEditMode, ProfileError> {
        let mode = self.session.with_mut(|s| s.toggle_edit())?;
        Ok(mode.into())
    }

    /// Set one field by its form name (`name`, `specialty`, `email`, ...).
    pub fn update_field(&self, field: String, value: String) -> Result<(), ProfileError> {
        let field: ProfileField = field.parse()?;
        self.session.with_mut(|s| s.update_field(field, value));
        Ok(())
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl ProfileCore {
    /// Save the draft: update the stored profile or create it.
    pub async fn save(&self) -> Result<FfiSaveOutcome, ProfileError> {
        let outcome = self.session.save().await?;
        Ok(outcome.into())
    }

    /// Replace the draft with the stored profile. Returns `false` if the
    /// user has none yet, or if a save finished first and made the loaded
    /// record stale.
    pub async fn load(&self) -> Result<bool, ProfileError> {
        match self.session.load().await? {
            LoadOutcome::Loaded(_) => Ok(true),
            LoadOutcome::NotFound | LoadOutcome::Superseded => Ok(false),
        }
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe edit mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiEditMode {
    Viewing,
    Editing,
    Saving,
}

impl From<EditMode> for FfiEditMode {
    fn from(mode: EditMode) -> Self {
        match mode {
            EditMode::Viewing => FfiEditMode::Viewing,
            EditMode::Editing => FfiEditMode::Editing,
            EditMode::Saving => FfiEditMode::Saving,
        }
    }
}

/// FFI-safe profile fields.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct FfiProfileFields {
    pub name: String,
    pub specialty: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub bio: String,
    pub education: String,
    pub certifications: String,
}

impl From<ProfileFields> for FfiProfileFields {
    fn from(fields: ProfileFields) -> Self {
        Self {
            name: fields.name,
            specialty: fields.specialty,
            email: fields.email,
            phone: fields.phone,
            address: fields.address,
            bio: fields.bio,
            education: fields.education,
            certifications: fields.certifications,
        }
    }
}

/// FFI-safe persisted profile.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiProfile {
    pub id: String,
    pub fields: FfiProfileFields,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PractitionerProfile> for FfiProfile {
    fn from(profile: PractitionerProfile) -> Self {
        Self {
            id: profile.id.to_string(),
            fields: profile.fields.into(),
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

/// FFI-safe save result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSaveOutcome {
    /// "created" or "updated"
    pub branch: String,
    pub profile: FfiProfile,
}

impl From<models::SaveOutcome> for FfiSaveOutcome {
    fn from(outcome: models::SaveOutcome) -> Self {
        let branch = match outcome.branch {
            SaveBranch::Created => "created",
            SaveBranch::Updated => "updated",
        };
        Self {
            branch: branch.to_string(),
            profile: outcome.record.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_core_round_trip() {
        let core = open_database_in_memory().unwrap();
        core.sign_in("kp_123".into());

        assert_eq!(core.mode(), FfiEditMode::Viewing);
        assert!(!core.load().await.unwrap());

        assert_eq!(core.toggle_edit().unwrap(), FfiEditMode::Editing);
        core.update_field("phone".into(), "+1 (555) 999-0000".into())
            .unwrap();
        assert!(core.has_unsaved_changes());

        let first = core.save().await.unwrap();
        assert_eq!(first.branch, "created");
        assert_eq!(first.profile.id, "kp_123");
        assert_eq!(core.mode(), FfiEditMode::Viewing);

        core.begin_edit().unwrap();
        let second = core.save().await.unwrap();
        assert_eq!(second.branch, "updated");
        assert_eq!(second.profile.fields.phone, "+1 (555) 999-0000");

        let json = core.persisted_json().unwrap().unwrap();
        assert!(json.contains("kp_123"));
    }

    #[test]
    fn test_unknown_field_is_invalid_input() {
        let core = open_database_in_memory().unwrap();
        let err = core.update_field("id".into(), "kp_999".into()).unwrap_err();
        assert!(matches!(err, ProfileError::InvalidInput(_)));
        assert_eq!(core.draft(), FfiProfileFields::from(ProfileFields::default()));
    }

    #[tokio::test]
    async fn test_save_without_identity() {
        let core = open_database_in_memory().unwrap();
        core.begin_edit().unwrap();

        let err = core.save().await.unwrap_err();

        assert!(matches!(err, ProfileError::IdentityUnavailable(_)));
        assert_eq!(core.mode(), FfiEditMode::Editing);
        assert!(core.last_error().is_some());
        assert!(core.can_save());
    }

    #[test]
    fn test_open_with_config_defaults() {
        let core = open_with_config(
            r#"
            [defaults]
            name = "Dr. Ada Lovelace"
            "#
            .into(),
        )
        .unwrap();

        assert_eq!(core.draft().name, "Dr. Ada Lovelace");
        assert_eq!(core.initials(), "DAL");
    }

    #[test]
    fn test_open_with_bad_config() {
        let err = open_with_config("[database]\npath = 7".into()).unwrap_err();
        assert!(matches!(err, ProfileError::ConfigError(_)));
    }
}
