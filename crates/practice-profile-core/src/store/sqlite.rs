//! SQLite-backed profile store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use super::{RecordStore, StoreError, StoreResult, SCHEMA};
use crate::models::{PractitionerProfile, ProfileFields, UserId};

const SELECT_PROFILE: &str = r#"
    SELECT id, name, specialty, email, phone, address, bio,
           education, certifications, created_at, updated_at
    FROM practitioner_profiles
    WHERE id = ?
"#;

/// Profile store over a single SQLite connection.
pub struct SqliteProfileStore {
    conn: Mutex<Connection>,
}

impl SqliteProfileStore {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("Lock poisoned: {}", e)))
    }

    /// Get a profile by user id.
    pub fn get_profile(&self, id: &UserId) -> StoreResult<Option<PractitionerProfile>> {
        let conn = self.conn()?;
        conn.query_row(SELECT_PROFILE, [id.as_str()], profile_from_row)
            .optional()
            .map_err(Into::into)
    }

    /// Insert a new profile.
    pub fn insert_profile(&self, profile: &PractitionerProfile) -> StoreResult<()> {
        let conn = self.conn()?;
        let fields = &profile.fields;
        conn.execute(
            r#"
            INSERT INTO practitioner_profiles (
                id, name, specialty, email, phone, address, bio,
                education, certifications, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                profile.id.as_str(),
                fields.name,
                fields.specialty,
                fields.email,
                fields.phone,
                fields.address,
                fields.bio,
                fields.education,
                fields.certifications,
                profile.created_at,
                profile.updated_at,
            ],
        )
        .map_err(|e| match e.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => StoreError::AlreadyExists(profile.id.clone()),
            _ => e.into(),
        })?;
        Ok(())
    }

    /// Overwrite the editable fields of an existing profile.
    pub fn update_profile(&self, id: &UserId, fields: &ProfileFields) -> StoreResult<bool> {
        let conn = self.conn()?;
        let rows_affected = conn.execute(
            r#"
            UPDATE practitioner_profiles SET
                name = ?2,
                specialty = ?3,
                email = ?4,
                phone = ?5,
                address = ?6,
                bio = ?7,
                education = ?8,
                certifications = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
            params![
                id.as_str(),
                fields.name,
                fields.specialty,
                fields.email,
                fields.phone,
                fields.address,
                fields.bio,
                fields.education,
                fields.certifications,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(rows_affected > 0)
    }

    fn require_profile(&self, id: &UserId) -> StoreResult<PractitionerProfile> {
        self.get_profile(id)?
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}

#[async_trait]
impl RecordStore for SqliteProfileStore {
    async fn find(&self, id: &UserId) -> StoreResult<Option<PractitionerProfile>> {
        self.get_profile(id)
    }

    async fn create(
        &self,
        id: &UserId,
        fields: &ProfileFields,
    ) -> StoreResult<PractitionerProfile> {
        let profile = PractitionerProfile::new(id.clone(), fields.clone());
        self.insert_profile(&profile)?;
        tracing::debug!(user = %id, "Inserted profile row");
        Ok(profile)
    }

    async fn update(
        &self,
        id: &UserId,
        fields: &ProfileFields,
    ) -> StoreResult<PractitionerProfile> {
        if !self.update_profile(id, fields)? {
            return Err(StoreError::NotFound(id.clone()));
        }
        tracing::debug!(user = %id, "Updated profile row");
        self.require_profile(id)
    }
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<PractitionerProfile> {
    let id: String = row.get(0)?;
    Ok(PractitionerProfile {
        id: UserId::new(id),
        fields: ProfileFields {
            name: row.get(1)?,
            specialty: row.get(2)?,
            email: row.get(3)?,
            phone: row.get(4)?,
            address: row.get(5)?,
            bio: row.get(6)?,
            education: row.get(7)?,
            certifications: row.get(8)?,
        },
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
