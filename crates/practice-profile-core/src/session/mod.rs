//! Edit session for the signed-in practitioner's profile.
//!
//! ```text
//!              begin_edit                 begin_save
//!   Viewing ───────────────▶ Editing ───────────────▶ Saving
//!      ▲  ◀─────────────────    ▲                       │
//!      │      cancel_edit       │      save failed      │
//!      │   (restore snapshot)   └───────────────────────┤
//!      │                                                │
//!      └────────────────────── save succeeded ──────────┘
//! ```
//!
//! The draft is edited one field at a time and is only written to the store
//! by a save. A failed save keeps the user's edits and stays in `Editing`.

mod reconcile;
mod shared;

pub use reconcile::*;
pub use shared::*;

use std::sync::Arc;

use thiserror::Error;

use crate::identity::IdentityProvider;
use crate::models::{
    EditMode, FailureKind, LoadOutcome, PractitionerProfile, ProfileField, ProfileFields,
    RecordState, SaveFailure, SaveOutcome,
};
use crate::store::{RecordStore, StoreError};

/// Session errors.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("User identity is not available")]
    IdentityUnavailable,

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("A save is already in progress")]
    SaveInProgress,

    #[error("Profile is not being edited")]
    NotEditing,

    #[error("Profile has edits in progress")]
    EditInProgress,
}

impl SessionError {
    fn to_failure(&self) -> SaveFailure {
        let kind = match self {
            SessionError::IdentityUnavailable => FailureKind::IdentityUnavailable,
            _ => FailureKind::Store,
        };
        SaveFailure {
            kind,
            message: self.to_string(),
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Owns the draft, the edit mode and the last operation error.
pub struct ProfileSession {
    store: Arc<dyn RecordStore>,
    identity: Arc<dyn IdentityProvider>,
    defaults: ProfileFields,
    draft: ProfileFields,
    snapshot: Option<ProfileFields>,
    persisted: Option<PractitionerProfile>,
    mode: EditMode,
    last_error: Option<SaveFailure>,
    // Successful saves so far; stale loads are detected against it.
    generation: u64,
}

impl ProfileSession {
    /// Start a session whose draft holds the sample practitioner.
    pub fn new(store: Arc<dyn RecordStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self::with_defaults(store, identity, ProfileFields::default())
    }

    /// Start a session whose draft holds `defaults`.
    pub fn with_defaults(
        store: Arc<dyn RecordStore>,
        identity: Arc<dyn IdentityProvider>,
        defaults: ProfileFields,
    ) -> Self {
        Self {
            store,
            identity,
            draft: defaults.clone(),
            defaults,
            snapshot: None,
            persisted: None,
            mode: EditMode::Viewing,
            last_error: None,
            generation: 0,
        }
    }

    // =========================================================================
    // Observable state
    // =========================================================================

    pub fn draft(&self) -> &ProfileFields {
        &self.draft
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn last_error(&self) -> Option<&SaveFailure> {
        self.last_error.as_ref()
    }

    /// Last record confirmed by the store, if any.
    pub fn persisted(&self) -> Option<&PractitionerProfile> {
        self.persisted.as_ref()
    }

    pub fn record_state(&self) -> RecordState {
        match &self.persisted {
            Some(record) => RecordState::Persisted(record.id.clone()),
            None => RecordState::Unpersisted,
        }
    }

    /// Draft differs from the persisted record (or from the defaults before
    /// anything was persisted).
    pub fn has_unsaved_changes(&self) -> bool {
        let baseline = self
            .persisted
            .as_ref()
            .map(|record| &record.fields)
            .unwrap_or(&self.defaults);
        &self.draft != baseline
    }

    /// Inputs accept edits.
    pub fn is_editable(&self) -> bool {
        self.mode == EditMode::Editing
    }

    /// The save action is offered.
    pub fn can_save(&self) -> bool {
        self.mode == EditMode::Editing
    }

    // =========================================================================
    // Draft
    // =========================================================================

    /// Replace one draft field verbatim. No trimming, no validation.
    pub fn update_field(&mut self, field: ProfileField, value: impl Into<String>) {
        self.draft.set(field, value.into());
    }

    // =========================================================================
    // Mode transitions
    // =========================================================================

    /// Enter editing, remembering the draft so a cancel can restore it.
    pub fn begin_edit(&mut self) -> SessionResult<()> {
        match self.mode {
            EditMode::Viewing => {
                self.snapshot = Some(self.draft.clone());
                self.mode = EditMode::Editing;
                tracing::info!("Editing profile");
                Ok(())
            }
            EditMode::Editing => Ok(()),
            EditMode::Saving => Err(SessionError::SaveInProgress),
        }
    }

    /// Leave editing and discard every edit made since `begin_edit`.
    pub fn cancel_edit(&mut self) -> SessionResult<()> {
        match self.mode {
            EditMode::Editing => {
                if let Some(snapshot) = self.snapshot.take() {
                    self.draft = snapshot;
                }
                self.last_error = None;
                self.mode = EditMode::Viewing;
                tracing::info!("Edit cancelled");
                Ok(())
            }
            EditMode::Viewing => Ok(()),
            EditMode::Saving => Err(SessionError::SaveInProgress),
        }
    }

    /// The single Edit/Cancel button.
    pub fn toggle_edit(&mut self) -> SessionResult<EditMode> {
        match self.mode {
            EditMode::Viewing => self.begin_edit()?,
            EditMode::Editing => self.cancel_edit()?,
            EditMode::Saving => return Err(SessionError::SaveInProgress),
        }
        Ok(self.mode)
    }

    // =========================================================================
    // Save
    // =========================================================================

    /// Admit a save: `Editing` becomes `Saving` and the previous error is
    /// cleared. Rejected while another save is in flight.
    pub fn begin_save(&mut self) -> SessionResult<PendingSave> {
        match self.mode {
            EditMode::Editing => {}
            EditMode::Saving => {
                tracing::warn!("Save rejected: another save is in progress");
                return Err(SessionError::SaveInProgress);
            }
            EditMode::Viewing => return Err(SessionError::NotEditing),
        }

        self.mode = EditMode::Saving;
        self.last_error = None;
        tracing::info!("Saving profile");

        Ok(PendingSave {
            store: Arc::clone(&self.store),
            identity: Arc::clone(&self.identity),
            fields: self.draft.clone(),
        })
    }

    /// Apply the result of a [`PendingSave`] and hand it back to the caller.
    pub fn finish_save(
        &mut self,
        result: SessionResult<SaveOutcome>,
    ) -> SessionResult<SaveOutcome> {
        match &result {
            Ok(outcome) => {
                tracing::info!(
                    user = %outcome.record.id,
                    branch = ?outcome.branch,
                    "Profile saved successfully"
                );
                self.persisted = Some(outcome.record.clone());
                self.snapshot = None;
                self.last_error = None;
                self.mode = EditMode::Viewing;
                self.generation += 1;
            }
            Err(e) => {
                tracing::warn!("Error saving profile: {}", e);
                self.last_error = Some(e.to_failure());
                self.mode = EditMode::Editing;
            }
        }
        result
    }

    /// Reconcile the draft with the store: update if the user already has a
    /// profile, create it otherwise.
    pub async fn save(&mut self) -> SessionResult<SaveOutcome> {
        let pending = self.begin_save()?;
        let result = pending.run().await;
        self.finish_save(result)
    }

    // =========================================================================
    // Load
    // =========================================================================

    /// Admit a load. Only allowed while viewing so edits are never clobbered.
    pub fn begin_load(&self) -> SessionResult<PendingLoad> {
        match self.mode {
            EditMode::Viewing => Ok(PendingLoad {
                store: Arc::clone(&self.store),
                identity: Arc::clone(&self.identity),
                generation: self.generation,
            }),
            EditMode::Editing => Err(SessionError::EditInProgress),
            EditMode::Saving => Err(SessionError::SaveInProgress),
        }
    }

    /// Apply the result of a [`PendingLoad`] admitted at `admitted`
    /// (see [`PendingLoad::generation`]).
    ///
    /// If a save completed since then, the result is older than `persisted`
    /// and is dropped: a successful load reports `Superseded`, a failed one is
    /// returned without touching the session. Otherwise the loaded record
    /// becomes the persisted baseline. Draft and last error are only touched
    /// while viewing, so a load never clobbers an edit in progress or the
    /// error from a failed save.
    pub fn finish_load(
        &mut self,
        admitted: u64,
        result: SessionResult<LoadOutcome>,
    ) -> SessionResult<LoadOutcome> {
        if admitted != self.generation {
            tracing::debug!("Discarding load result older than the last save");
            return result.map(|_| LoadOutcome::Superseded);
        }

        let viewing = self.mode == EditMode::Viewing;
        match &result {
            Ok(LoadOutcome::Loaded(record)) => {
                tracing::info!(user = %record.id, "Profile loaded");
                self.persisted = Some(record.clone());
                if viewing {
                    self.draft = record.fields.clone();
                    self.last_error = None;
                }
            }
            Ok(LoadOutcome::NotFound) => {
                tracing::info!("No stored profile, keeping defaults");
                if viewing {
                    self.last_error = None;
                }
            }
            Ok(LoadOutcome::Superseded) => {}
            Err(e) => {
                tracing::warn!("Error loading profile: {}", e);
                if viewing {
                    self.last_error = Some(e.to_failure());
                }
            }
        }
        result
    }

    /// Replace the draft with the user's stored profile, if there is one.
    pub async fn load(&mut self) -> SessionResult<LoadOutcome> {
        let pending = self.begin_load()?;
        let admitted = pending.generation();
        let result = pending.run().await;
        self.finish_load(admitted, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{MockIdentityProvider, StaticIdentity};
    use crate::models::{SaveBranch, UserId};
    use crate::store::MockRecordStore;

    fn signed_in() -> Arc<dyn IdentityProvider> {
        Arc::new(StaticIdentity::signed_in("kp_123"))
    }

    fn existing(fields: &ProfileFields) -> PractitionerProfile {
        PractitionerProfile::new("kp_123".into(), fields.clone())
    }

    fn editing_session(store: MockRecordStore) -> ProfileSession {
        let mut session = ProfileSession::new(Arc::new(store), signed_in());
        session.begin_edit().unwrap();
        session
    }

    #[test]
    fn test_initial_state() {
        let session = ProfileSession::new(Arc::new(MockRecordStore::new()), signed_in());

        assert_eq!(session.mode(), EditMode::Viewing);
        assert_eq!(session.draft(), &ProfileFields::default());
        assert!(session.last_error().is_none());
        assert_eq!(session.record_state(), RecordState::Unpersisted);
        assert!(!session.is_editable());
        assert!(!session.can_save());
        assert!(!session.has_unsaved_changes());
    }

    #[test]
    fn test_update_field_changes_only_that_field() {
        let mut session = ProfileSession::new(Arc::new(MockRecordStore::new()), signed_in());
        let before = session.draft().clone();

        session.update_field(ProfileField::Specialty, "Neurology");

        assert_eq!(session.draft().specialty, "Neurology");
        for field in ProfileField::ALL {
            if field != ProfileField::Specialty {
                assert_eq!(session.draft().get(field), before.get(field));
            }
        }
        assert!(session.has_unsaved_changes());
    }

    #[test]
    fn test_cancel_discards_edits() {
        let mut session = editing_session(MockRecordStore::new());
        session.update_field(ProfileField::Name, "Dr. Someone Else");

        session.cancel_edit().unwrap();

        assert_eq!(session.mode(), EditMode::Viewing);
        assert_eq!(session.draft(), &ProfileFields::default());
    }

    #[test]
    fn test_toggle_edit_follows_button() {
        let mut session = ProfileSession::new(Arc::new(MockRecordStore::new()), signed_in());

        assert_eq!(session.toggle_edit().unwrap(), EditMode::Editing);
        session.update_field(ProfileField::Phone, "");
        assert_eq!(session.toggle_edit().unwrap(), EditMode::Viewing);
        assert_eq!(session.draft().phone, ProfileFields::default().phone);
    }

    #[test]
    fn test_begin_edit_twice_keeps_first_snapshot() {
        let mut session = editing_session(MockRecordStore::new());
        session.update_field(ProfileField::Bio, "changed");
        session.begin_edit().unwrap();

        session.cancel_edit().unwrap();
        assert_eq!(session.draft().bio, ProfileFields::default().bio);
    }

    #[tokio::test]
    async fn test_save_creates_when_absent() {
        let mut store = MockRecordStore::new();
        store.expect_find().times(1).returning(|_| Ok(None));
        store
            .expect_create()
            .times(1)
            .withf(|id, fields| id.as_str() == "kp_123" && *fields == ProfileFields::default())
            .returning(|id, fields| Ok(PractitionerProfile::new(id.clone(), fields.clone())));
        store.expect_update().never();

        let mut session = editing_session(store);
        let outcome = session.save().await.unwrap();

        assert_eq!(outcome.branch, SaveBranch::Created);
        assert_eq!(session.mode(), EditMode::Viewing);
        assert!(session.last_error().is_none());
        assert_eq!(
            session.record_state(),
            RecordState::Persisted(UserId::from("kp_123"))
        );
    }

    #[tokio::test]
    async fn test_save_updates_when_present() {
        let mut store = MockRecordStore::new();
        store
            .expect_find()
            .times(1)
            .returning(|_| Ok(Some(existing(&ProfileFields::default()))));
        store
            .expect_update()
            .times(1)
            .withf(|id, fields| id.as_str() == "kp_123" && fields.phone == "+1 (555) 999-0000")
            .returning(|_, fields| Ok(existing(fields)));
        store.expect_create().never();

        let mut session = editing_session(store);
        session.update_field(ProfileField::Phone, "+1 (555) 999-0000");
        let outcome = session.save().await.unwrap();

        assert_eq!(outcome.branch, SaveBranch::Updated);
        assert_eq!(outcome.record.fields.phone, "+1 (555) 999-0000");
        assert_eq!(session.mode(), EditMode::Viewing);
        assert!(!session.has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_lookup_failure_keeps_editing() {
        let mut store = MockRecordStore::new();
        store
            .expect_find()
            .times(1)
            .returning(|_| Err(StoreError::Unavailable("connection reset".into())));
        store.expect_create().never();
        store.expect_update().never();

        let mut session = editing_session(store);
        session.update_field(ProfileField::Address, "1 Elm St");
        let draft_before = session.draft().clone();

        let err = session.save().await.unwrap_err();

        assert!(matches!(err, SessionError::Store(StoreError::Unavailable(_))));
        assert_eq!(session.mode(), EditMode::Editing);
        assert_eq!(session.draft(), &draft_before);
        let failure = session.last_error().unwrap();
        assert_eq!(failure.kind, FailureKind::Store);
        assert!(!failure.message.is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_keeps_editing() {
        let mut store = MockRecordStore::new();
        store.expect_find().returning(|_| Ok(None));
        store
            .expect_create()
            .times(1)
            .returning(|_, _| Err(StoreError::Unavailable("timeout".into())));

        let mut session = editing_session(store);
        session.save().await.unwrap_err();

        assert_eq!(session.mode(), EditMode::Editing);
        assert_eq!(session.record_state(), RecordState::Unpersisted);
        assert!(session.last_error().is_some());
    }

    #[tokio::test]
    async fn test_no_identity_no_store_contact() {
        let mut store = MockRecordStore::new();
        store.expect_find().never();
        store.expect_create().never();
        store.expect_update().never();

        let mut session =
            ProfileSession::new(Arc::new(store), Arc::new(StaticIdentity::anonymous()));
        session.begin_edit().unwrap();
        session.update_field(ProfileField::Email, "jane@clinic.test");
        let draft_before = session.draft().clone();

        let err = session.save().await.unwrap_err();

        assert!(matches!(err, SessionError::IdentityUnavailable));
        assert_eq!(session.mode(), EditMode::Editing);
        assert_eq!(session.draft(), &draft_before);
        assert_eq!(
            session.last_error().map(|f| f.kind),
            Some(FailureKind::IdentityUnavailable)
        );
    }

    #[tokio::test]
    async fn test_identity_resolved_once_per_save() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_current_user_id()
            .times(1)
            .returning(|| Some("kp_123".into()));
        let mut store = MockRecordStore::new();
        store.expect_find().returning(|_| Ok(None));
        store
            .expect_create()
            .returning(|id, fields| Ok(PractitionerProfile::new(id.clone(), fields.clone())));

        let mut session = ProfileSession::new(Arc::new(store), Arc::new(identity));
        session.begin_edit().unwrap();
        session.save().await.unwrap();
    }

    #[tokio::test]
    async fn test_foreign_record_is_rejected() {
        let mut store = MockRecordStore::new();
        store.expect_find().returning(|_| Ok(None));
        store
            .expect_create()
            .returning(|_, fields| Ok(PractitionerProfile::new("someone-else".into(), fields.clone())));

        let mut session = editing_session(store);
        let err = session.save().await.unwrap_err();

        assert!(matches!(
            err,
            SessionError::Store(StoreError::IdentifierMismatch { .. })
        ));
        assert_eq!(session.mode(), EditMode::Editing);
        assert!(session.persisted().is_none());
    }

    #[tokio::test]
    async fn test_retry_after_failure_clears_error() {
        let mut store = MockRecordStore::new();
        let mut calls = 0;
        store.expect_find().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(StoreError::Unavailable("offline".into()))
            } else {
                Ok(None)
            }
        });
        store
            .expect_create()
            .times(1)
            .returning(|id, fields| Ok(PractitionerProfile::new(id.clone(), fields.clone())));

        let mut session = editing_session(store);
        session.save().await.unwrap_err();
        assert!(session.last_error().is_some());

        session.save().await.unwrap();
        assert!(session.last_error().is_none());
        assert_eq!(session.mode(), EditMode::Viewing);
    }

    #[test]
    fn test_second_save_rejected_while_saving() {
        let mut session = editing_session(MockRecordStore::new());

        session.update_field(ProfileField::Phone, "555");
        let pending = session.begin_save().unwrap();
        assert_eq!(pending.fields().phone, "555");
        assert_eq!(session.mode(), EditMode::Saving);

        assert!(matches!(session.begin_save(), Err(SessionError::SaveInProgress)));
        assert!(matches!(session.begin_edit(), Err(SessionError::SaveInProgress)));
        assert!(matches!(session.cancel_edit(), Err(SessionError::SaveInProgress)));
        assert_eq!(session.mode(), EditMode::Saving);
    }

    #[test]
    fn test_save_while_viewing_is_rejected() {
        let mut session = ProfileSession::new(Arc::new(MockRecordStore::new()), signed_in());
        assert!(matches!(session.begin_save(), Err(SessionError::NotEditing)));
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn test_load_replaces_draft() {
        let mut stored = ProfileFields::default();
        stored.name = "Dr. Gregory House".into();
        let record = existing(&stored);

        let mut store = MockRecordStore::new();
        store
            .expect_find()
            .times(1)
            .returning(move |_| Ok(Some(record.clone())));

        let mut session = ProfileSession::new(Arc::new(store), signed_in());
        let outcome = session.load().await.unwrap();

        assert!(matches!(outcome, LoadOutcome::Loaded(_)));
        assert_eq!(session.draft().name, "Dr. Gregory House");
        assert_eq!(session.draft().initials(), "DGH");
        assert!(!session.has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_load_rejected_while_editing() {
        let mut store = MockRecordStore::new();
        store.expect_find().never();

        let mut session = editing_session(store);
        assert!(matches!(
            session.load().await,
            Err(SessionError::EditInProgress)
        ));
    }

    #[tokio::test]
    async fn test_load_older_than_save_is_discarded() {
        let stale = existing(&ProfileFields::default());
        let mut store = MockRecordStore::new();
        store
            .expect_find()
            .times(2)
            .returning(move |_| Ok(Some(stale.clone())));
        store.expect_create().never();
        store
            .expect_update()
            .times(1)
            .returning(|_, fields| Ok(existing(fields)));

        let mut session = ProfileSession::new(Arc::new(store), signed_in());
        let load = session.begin_load().unwrap();
        let admitted = load.generation();
        let loaded = load.run().await;

        session.begin_edit().unwrap();
        session.update_field(ProfileField::Phone, "+1 (555) 999-0000");
        let saved = session.begin_save().unwrap().run().await;
        session.finish_save(saved).unwrap();

        let outcome = session.finish_load(admitted, loaded).unwrap();

        assert_eq!(outcome, LoadOutcome::Superseded);
        assert_eq!(session.draft().phone, "+1 (555) 999-0000");
        assert_eq!(
            session.persisted().map(|r| r.fields.phone.as_str()),
            Some("+1 (555) 999-0000")
        );
    }

    #[test]
    fn test_load_keeps_save_error_while_editing() {
        let mut session = ProfileSession::new(Arc::new(MockRecordStore::new()), signed_in());
        let admitted = session.begin_load().unwrap().generation();

        session.begin_edit().unwrap();
        session.begin_save().unwrap();
        session
            .finish_save(Err(StoreError::Unavailable("offline".into()).into()))
            .unwrap_err();

        session.finish_load(admitted, Ok(LoadOutcome::NotFound)).unwrap();
        assert_eq!(session.mode(), EditMode::Editing);
        assert_eq!(session.last_error().map(|f| f.kind), Some(FailureKind::Store));

        session
            .finish_load(admitted, Err(SessionError::IdentityUnavailable))
            .unwrap_err();
        assert_eq!(session.last_error().map(|f| f.kind), Some(FailureKind::Store));
    }
}
