//! Course record.

use super::record::{
    string_list, validate_key, Collection, FlatRecord, Record, RecordPatch, RecordValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One course, its assigned teacher and its enrolled students.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Natural key.
    pub course_code: String,
    pub title: String,
    pub schedule: String,
    /// `None` while unassigned. Never names a deleted teacher.
    #[serde(default)]
    pub teacher_id: Option<String>,
    /// Student ids, insertion ordered, no duplicates.
    #[serde(default)]
    pub students: Vec<String>,
}

impl Course {
    /// Creates an unassigned course with no students.
    pub fn new(
        course_code: impl Into<String>,
        title: impl Into<String>,
        schedule: impl Into<String>,
    ) -> Self {
        Self {
            course_code: course_code.into(),
            title: title.into(),
            schedule: schedule.into(),
            teacher_id: None,
            students: Vec::new(),
        }
    }

    /// Returns whether `student_id` is listed on this course.
    pub fn has_student(&self, student_id: &str) -> bool {
        self.students.iter().any(|id| id == student_id)
    }
}

impl Record for Course {
    const COLLECTION: Collection = Collection::Courses;
    type Patch = CoursePatch;

    fn key(&self) -> &str {
        &self.course_code
    }

    fn validate(&self) -> Result<(), RecordValidationError> {
        validate_key(&self.course_code, Self::COLLECTION.key_field())
    }

    fn to_flat_record(&self) -> FlatRecord {
        let mut record = FlatRecord::new();
        record.insert("course_code".into(), Value::from(self.course_code.as_str()));
        record.insert("title".into(), Value::from(self.title.as_str()));
        record.insert("schedule".into(), Value::from(self.schedule.as_str()));
        record.insert(
            "teacher_id".into(),
            self.teacher_id
                .as_deref()
                .map_or(Value::Null, Value::from),
        );
        record.insert("students".into(), string_list(&self.students));
        record
    }
}

/// Partial update for a course. The teacher link is not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoursePatch {
    pub title: Option<String>,
    pub schedule: Option<String>,
}

impl RecordPatch for CoursePatch {
    fn validate(&self) -> Result<(), RecordValidationError> {
        Ok(())
    }

    fn to_field_set(&self) -> FlatRecord {
        let mut fields = FlatRecord::new();
        if let Some(title) = &self.title {
            fields.insert("title".into(), Value::from(title.as_str()));
        }
        if let Some(schedule) = &self.schedule {
            fields.insert("schedule".into(), Value::from(schedule.as_str()));
        }
        fields
    }
}
