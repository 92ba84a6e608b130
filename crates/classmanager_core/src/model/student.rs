//! Student record.

use super::record::{
    string_list, validate_email, validate_grade_level, validate_person, Collection, FlatRecord,
    Person, Record, RecordPatch, RecordValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One student and the courses they are enrolled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// Natural key.
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub grade_level: u32,
    /// Course codes, insertion ordered, no duplicates.
    #[serde(default)]
    pub enrollments: Vec<String>,
}

impl Student {
    /// Creates a student with no enrollments.
    pub fn new(
        student_id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        grade_level: u32,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            name: name.into(),
            email: email.into(),
            grade_level,
            enrollments: Vec::new(),
        }
    }

    /// Returns whether this student lists `course_code`.
    pub fn is_enrolled_in(&self, course_code: &str) -> bool {
        self.enrollments.iter().any(|code| code == course_code)
    }
}

impl Person for Student {
    fn person_id(&self) -> &str {
        &self.student_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn email(&self) -> &str {
        &self.email
    }
}

impl Record for Student {
    const COLLECTION: Collection = Collection::Students;
    type Patch = StudentPatch;

    fn key(&self) -> &str {
        &self.student_id
    }

    fn validate(&self) -> Result<(), RecordValidationError> {
        validate_person(self, Self::COLLECTION.key_field())?;
        validate_grade_level(self.grade_level)
    }

    fn to_flat_record(&self) -> FlatRecord {
        let mut record = FlatRecord::new();
        record.insert("student_id".into(), Value::from(self.student_id.as_str()));
        record.insert("name".into(), Value::from(self.name.as_str()));
        record.insert("email".into(), Value::from(self.email.as_str()));
        record.insert("grade_level".into(), Value::from(self.grade_level));
        record.insert("enrollments".into(), string_list(&self.enrollments));
        record
    }
}

/// Partial update for a student.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub grade_level: Option<u32>,
}

impl RecordPatch for StudentPatch {
    fn validate(&self) -> Result<(), RecordValidationError> {
        if let Some(email) = self.email.as_deref() {
            validate_email(email)?;
        }
        if let Some(grade_level) = self.grade_level {
            validate_grade_level(grade_level)?;
        }
        Ok(())
    }

    fn to_field_set(&self) -> FlatRecord {
        let mut fields = FlatRecord::new();
        if let Some(name) = &self.name {
            fields.insert("name".into(), Value::from(name.as_str()));
        }
        if let Some(email) = &self.email {
            fields.insert("email".into(), Value::from(email.as_str()));
        }
        if let Some(grade_level) = self.grade_level {
            fields.insert("grade_level".into(), Value::from(grade_level));
        }
        fields
    }
}
