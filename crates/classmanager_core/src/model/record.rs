//! Shared record contracts for the three collections.
//!
//! # Responsibility
//! - Name the collections and their natural-key fields.
//! - Define the flat key-value serialization contract shared by all records.
//! - Validate record and patch input before persistence.
//!
//! # Invariants
//! - A flat record never carries the storage identity field (`_id`).
//! - List-valued attributes are always materialized, empty when unset.
//! - Key fields are never blank.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage identity field name; owned by the store, never by records.
pub const IDENTITY_FIELD: &str = "_id";

/// Inclusive grade bounds accepted for students.
pub const MIN_GRADE_LEVEL: u32 = 1;
pub const MAX_GRADE_LEVEL: u32 = 20;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("valid email regex"));

/// Flat key-value representation of one record.
pub type FlatRecord = Map<String, Value>;

/// One of the three independent document collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Students,
    Teachers,
    Courses,
}

impl Collection {
    /// Collection name as stored.
    pub fn name(self) -> &'static str {
        match self {
            Self::Students => "students",
            Self::Teachers => "teachers",
            Self::Courses => "courses",
        }
    }

    /// Natural-key field of documents in this collection.
    pub fn key_field(self) -> &'static str {
        match self {
            Self::Students => "student_id",
            Self::Teachers => "teacher_id",
            Self::Courses => "course_code",
        }
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Validation failures for record or patch input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValidationError {
    /// Natural key is empty after trimming.
    BlankKey { field: &'static str },
    /// Grade level outside `MIN_GRADE_LEVEL..=MAX_GRADE_LEVEL`.
    GradeLevelOutOfRange(u32),
    /// Email is non-empty but not `local@domain` shaped.
    InvalidEmail(String),
}

impl Display for RecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankKey { field } => write!(f, "{field} must not be blank"),
            Self::GradeLevelOutOfRange(value) => write!(
                f,
                "grade_level must be between {MIN_GRADE_LEVEL} and {MAX_GRADE_LEVEL}, got {value}"
            ),
            Self::InvalidEmail(value) => write!(f, "invalid email address `{value}`"),
        }
    }
}

impl Error for RecordValidationError {}

/// A stored record kind with a natural key and flat serialization.
pub trait Record: Serialize + DeserializeOwned {
    /// Collection holding records of this kind.
    const COLLECTION: Collection;

    /// Partial field replacement accepted by `update`.
    type Patch: RecordPatch;

    /// Natural-key value.
    fn key(&self) -> &str;

    /// Checks field-level invariants before persistence.
    fn validate(&self) -> Result<(), RecordValidationError>;

    /// Canonical flat record: exactly the record attributes, no identity.
    fn to_flat_record(&self) -> FlatRecord;

    /// Decodes a stored document, ignoring the identity field.
    fn from_flat_record(record: FlatRecord) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(record))
    }
}

/// Partial update for one record kind.
///
/// Patches only ever touch scalar attributes; relationship lists change
/// through the relationship manager.
pub trait RecordPatch {
    /// Checks the provided fields.
    fn validate(&self) -> Result<(), RecordValidationError>;

    /// Fields to `$set`; empty when nothing is provided.
    fn to_field_set(&self) -> FlatRecord;

    /// Whether the patch provides no field at all.
    fn is_empty(&self) -> bool {
        self.to_field_set().is_empty()
    }
}

/// Person-like records share identity, name and contact fields.
pub trait Person {
    fn person_id(&self) -> &str;
    fn name(&self) -> &str;
    fn email(&self) -> &str;
}

/// Validates the fields every person-like record carries.
pub(crate) fn validate_person<P: Person>(
    person: &P,
    key_field: &'static str,
) -> Result<(), RecordValidationError> {
    validate_key(person.person_id(), key_field)?;
    validate_email(person.email())
}

pub(crate) fn validate_key(value: &str, field: &'static str) -> Result<(), RecordValidationError> {
    if value.trim().is_empty() {
        return Err(RecordValidationError::BlankKey { field });
    }
    Ok(())
}

pub(crate) fn validate_email(value: &str) -> Result<(), RecordValidationError> {
    if value.is_empty() || EMAIL_RE.is_match(value) {
        return Ok(());
    }
    Err(RecordValidationError::InvalidEmail(value.to_string()))
}

pub(crate) fn validate_grade_level(value: u32) -> Result<(), RecordValidationError> {
    if (MIN_GRADE_LEVEL..=MAX_GRADE_LEVEL).contains(&value) {
        return Ok(());
    }
    Err(RecordValidationError::GradeLevelOutOfRange(value))
}

pub(crate) fn string_list(values: &[String]) -> Value {
    Value::Array(values.iter().cloned().map(Value::String).collect())
}
