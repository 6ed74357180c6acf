//! Practitioner profile models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque identifier of the signed-in user, assigned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One editable field of the profile form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Name,
    Specialty,
    Email,
    Phone,
    Address,
    Bio,
    Education,
    Certifications,
}

/// Form section a field is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSection {
    Personal,
    Contact,
    Professional,
}

/// Input control used to edit a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Email,
    Tel,
    Multiline,
}

impl ProfileField {
    /// All editable fields, in form order.
    pub const ALL: [ProfileField; 8] = [
        ProfileField::Name,
        ProfileField::Specialty,
        ProfileField::Bio,
        ProfileField::Email,
        ProfileField::Phone,
        ProfileField::Address,
        ProfileField::Education,
        ProfileField::Certifications,
    ];

    /// Form/column name of the field.
    pub fn name(self) -> &'static str {
        match self {
            ProfileField::Name => "name",
            ProfileField::Specialty => "specialty",
            ProfileField::Email => "email",
            ProfileField::Phone => "phone",
            ProfileField::Address => "address",
            ProfileField::Bio => "bio",
            ProfileField::Education => "education",
            ProfileField::Certifications => "certifications",
        }
    }

    /// Human-readable label shown next to the input.
    pub fn label(self) -> &'static str {
        match self {
            ProfileField::Name => "Full Name",
            ProfileField::Specialty => "Specialty",
            ProfileField::Email => "Email",
            ProfileField::Phone => "Phone",
            ProfileField::Address => "Address",
            ProfileField::Bio => "Biography",
            ProfileField::Education => "Education",
            ProfileField::Certifications => "Certifications",
        }
    }

    pub fn section(self) -> FieldSection {
        match self {
            ProfileField::Name | ProfileField::Specialty | ProfileField::Bio => {
                FieldSection::Personal
            }
            ProfileField::Email | ProfileField::Phone | ProfileField::Address => {
                FieldSection::Contact
            }
            ProfileField::Education | ProfileField::Certifications => FieldSection::Professional,
        }
    }

    pub fn input_kind(self) -> InputKind {
        match self {
            ProfileField::Email => InputKind::Email,
            ProfileField::Phone => InputKind::Tel,
            ProfileField::Bio => InputKind::Multiline,
            _ => InputKind::Text,
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a host binds a form input by a name that is not a profile field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown profile field: {0}")]
pub struct UnknownField(pub String);

impl FromStr for ProfileField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProfileField::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// The full set of editable profile values. Doubles as the edit draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileFields {
    /// Display name
    pub name: String,
    pub specialty: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    /// Biography (multi-line)
    pub bio: String,
    pub education: String,
    pub certifications: String,
}

impl Default for ProfileFields {
    /// The sample practitioner shown before any record is loaded.
    fn default() -> Self {
        Self {
            name: "Dr. Jane Smith".into(),
            specialty: "Cardiologist".into(),
            email: "jane.smith@example.com".into(),
            phone: "+1 (555) 123-4567".into(),
            address: "123 Medical Center Dr, Healthville, MC 12345".into(),
            bio: "Dr. Jane Smith is a board-certified cardiologist...".into(),
            education: "MD from Harvard Medical School".into(),
            certifications: "American Board of Internal Medicine - Cardiovascular Disease"
                .into(),
        }
    }
}

impl ProfileFields {
    pub fn get(&self, field: ProfileField) -> &str {
        match field {
            ProfileField::Name => &self.name,
            ProfileField::Specialty => &self.specialty,
            ProfileField::Email => &self.email,
            ProfileField::Phone => &self.phone,
            ProfileField::Address => &self.address,
            ProfileField::Bio => &self.bio,
            ProfileField::Education => &self.education,
            ProfileField::Certifications => &self.certifications,
        }
    }

    /// Replace one field verbatim. Every other field is left alone.
    pub fn set(&mut self, field: ProfileField, value: String) {
        let slot = match field {
            ProfileField::Name => &mut self.name,
            ProfileField::Specialty => &mut self.specialty,
            ProfileField::Email => &mut self.email,
            ProfileField::Phone => &mut self.phone,
            ProfileField::Address => &mut self.address,
            ProfileField::Bio => &mut self.bio,
            ProfileField::Education => &mut self.education,
            ProfileField::Certifications => &mut self.certifications,
        };
        *slot = value;
    }

    /// Avatar fallback: first character of each word of the display name.
    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .collect()
    }
}

/// A profile record as confirmed by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PractitionerProfile {
    /// Owner's identifier, never changes once persisted
    pub id: UserId,
    #[serde(flatten)]
    pub fields: ProfileFields,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl PractitionerProfile {
    /// Build a freshly created record for `id`.
    pub fn new(id: UserId, fields: ProfileFields) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id,
            fields,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
