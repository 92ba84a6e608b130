//! Teacher record.

use super::record::{
    string_list, validate_email, validate_person, Collection, FlatRecord, Person, Record,
    RecordPatch, RecordValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One teacher and the courses they have been assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    /// Natural key.
    pub teacher_id: String,
    pub name: String,
    pub email: String,
    pub specialization: String,
    /// Course codes, insertion ordered, no duplicates.
    ///
    /// May still list a course that was later reassigned to someone else.
    #[serde(default)]
    pub courses: Vec<String>,
}

impl Teacher {
    /// Creates a teacher with no courses.
    pub fn new(
        teacher_id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        specialization: impl Into<String>,
    ) -> Self {
        Self {
            teacher_id: teacher_id.into(),
            name: name.into(),
            email: email.into(),
            specialization: specialization.into(),
            courses: Vec::new(),
        }
    }

    /// Returns whether this teacher lists `course_code`.
    pub fn teaches(&self, course_code: &str) -> bool {
        self.courses.iter().any(|code| code == course_code)
    }
}

impl Person for Teacher {
    fn person_id(&self) -> &str {
        &self.teacher_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn email(&self) -> &str {
        &self.email
    }
}

impl Record for Teacher {
    const COLLECTION: Collection = Collection::Teachers;
    type Patch = TeacherPatch;

    fn key(&self) -> &str {
        &self.teacher_id
    }

    fn validate(&self) -> Result<(), RecordValidationError> {
        validate_person(self, Self::COLLECTION.key_field())
    }

    fn to_flat_record(&self) -> FlatRecord {
        let mut record = FlatRecord::new();
        record.insert("teacher_id".into(), Value::from(self.teacher_id.as_str()));
        record.insert("name".into(), Value::from(self.name.as_str()));
        record.insert("email".into(), Value::from(self.email.as_str()));
        record.insert(
            "specialization".into(),
            Value::from(self.specialization.as_str()),
        );
        record.insert("courses".into(), string_list(&self.courses));
        record
    }
}

/// Partial update for a teacher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeacherPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub specialization: Option<String>,
}

impl RecordPatch for TeacherPatch {
    fn validate(&self) -> Result<(), RecordValidationError> {
        match self.email.as_deref() {
            Some(email) => validate_email(email),
            None => Ok(()),
        }
    }

    fn to_field_set(&self) -> FlatRecord {
        let mut fields = FlatRecord::new();
        if let Some(name) = &self.name {
            fields.insert("name".into(), Value::from(name.as_str()));
        }
        if let Some(email) = &self.email {
            fields.insert("email".into(), Value::from(email.as_str()));
        }
        if let Some(specialization) = &self.specialization {
            fields.insert("specialization".into(), Value::from(specialization.as_str()));
        }
        fields
    }
}
