//! SQLite schema definition.

/// Complete database schema for the profile store.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Practitioner Profiles (one row per signed-in user)
-- ============================================================================

CREATE TABLE IF NOT EXISTS practitioner_profiles (
    id TEXT PRIMARY KEY,                         -- identity provider user id
    name TEXT NOT NULL DEFAULT '',
    specialty TEXT NOT NULL DEFAULT '',
    email TEXT NOT NULL DEFAULT '',
    phone TEXT NOT NULL DEFAULT '',
    address TEXT NOT NULL DEFAULT '',
    bio TEXT NOT NULL DEFAULT '',
    education TEXT NOT NULL DEFAULT '',
    certifications TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;
