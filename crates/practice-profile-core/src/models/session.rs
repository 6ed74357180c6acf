//! Edit-session state models.

use serde::{Deserialize, Serialize};

use super::profile::{PractitionerProfile, UserId};

/// Presentation mode of the profile form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EditMode {
    /// Read-only display (initial state)
    #[default]
    Viewing,
    /// Inputs enabled, draft may diverge from the persisted record
    Editing,
    /// A save is in flight; further saves are rejected
    Saving,
}

/// Whether the draft has ever been written to the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordState {
    Unpersisted,
    Persisted(UserId),
}

/// Which store write a save ended up issuing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveBranch {
    Created,
    Updated,
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub branch: SaveBranch,
    pub record: PractitionerProfile,
}

/// Result of a successful load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded(PractitionerProfile),
    NotFound,
    /// A save finished while the load was in flight; its result was dropped.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    IdentityUnavailable,
    Store,
}

/// Last-operation error kept on the session for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveFailure {
    pub kind: FailureKind,
    /// Rendered cause, never empty
    pub message: String,
}
