//! Relationship maintenance between students, teachers and courses.
//!
//! # Responsibility
//! - Link teachers to courses and students to courses on both sides.
//! - Scrub back-references before deleting a record.
//!
//! # Invariants
//! - Lookups happen before any write; a missing record aborts with no write.
//! - List appends are idempotent (`$addToSet`), so no list gains duplicates.
//! - Cascading cleanup runs before the owning record is deleted.
//! - Reassigning a course does not remove it from the previous teacher's
//!   `courses`, and deleting a course leaves teachers' `courses` untouched.
//!
//! Every operation issues several single-document writes. Run it against a
//! store bound to one transaction when the writes must land together.

use crate::model::course::Course;
use crate::model::record::Collection;
use crate::model::student::Student;
use crate::model::teacher::Teacher;
use crate::repo::record_repo::{RecordRepository, RepoError};
use crate::store::{DocumentStore, Filter, Update};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RelationResult<T> = Result<T, RelationError>;

/// Errors from relationship operations.
#[derive(Debug)]
pub enum RelationError {
    /// Teacher or course lookup failed during assignment.
    TeacherOrCourseNotFound {
        teacher_id: String,
        course_code: String,
    },
    /// Student or course lookup failed during (un)enrollment.
    StudentOrCourseNotFound {
        student_id: String,
        course_code: String,
    },
    /// Target record of a delete/unassign does not exist.
    RecordNotFound { collection: Collection, key: String },
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for RelationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TeacherOrCourseNotFound { .. } => write!(f, "Teacher or course not found"),
            Self::StudentOrCourseNotFound { .. } => write!(f, "Student or course not found"),
            Self::RecordNotFound { collection, key } => {
                write!(f, "{collection} has no key `{key}`")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RelationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RelationError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { collection, key } => Self::RecordNotFound { collection, key },
            other => Self::Repo(other),
        }
    }
}

impl From<crate::store::StoreError> for RelationError {
    fn from(value: crate::store::StoreError) -> Self {
        Self::Repo(value.into())
    }
}

/// Relationship manager over one document store.
pub struct RelationshipManager<'store, S: DocumentStore> {
    store: &'store S,
}

impl<'store, S: DocumentStore> RelationshipManager<'store, S> {
    pub fn new(store: &'store S) -> Self {
        Self { store }
    }

    fn students(&self) -> RecordRepository<'store, S, Student> {
        RecordRepository::new(self.store)
    }

    fn teachers(&self) -> RecordRepository<'store, S, Teacher> {
        RecordRepository::new(self.store)
    }

    fn courses(&self) -> RecordRepository<'store, S, Course> {
        RecordRepository::new(self.store)
    }

    /// Points `course_code` at `teacher_id` and lists the course on the teacher.
    ///
    /// Overwrites any previous assignment without unlisting the course from
    /// the previous teacher.
    pub fn assign_teacher(&self, teacher_id: &str, course_code: &str) -> RelationResult<()> {
        let teacher = self.teachers().get(teacher_id)?;
        let course = self.courses().get(course_code)?;
        if teacher.is_none() || course.is_none() {
            return Err(RelationError::TeacherOrCourseNotFound {
                teacher_id: teacher_id.to_string(),
                course_code: course_code.to_string(),
            });
        }

        self.store.update_one(
            Collection::Courses,
            course_code,
            &Update::set_field("teacher_id", teacher_id),
        )?;
        self.store.update_one(
            Collection::Teachers,
            teacher_id,
            &Update::add_to_set("courses", course_code),
        )?;
        Ok(())
    }

    /// Clears the course's teacher and unlists the course from that teacher.
    ///
    /// Returns the previous teacher id, or `None` when the course had none.
    pub fn unassign_teacher(&self, course_code: &str) -> RelationResult<Option<String>> {
        let course = self.courses().require(course_code)?;
        let Some(teacher_id) = course.teacher_id else {
            return Ok(None);
        };

        self.store.update_one(
            Collection::Courses,
            course_code,
            &Update::set_field("teacher_id", Value::Null),
        )?;
        // The teacher may already be gone if another writer skipped cleanup.
        self.store.update_one(
            Collection::Teachers,
            &teacher_id,
            &Update::pull("courses", course_code),
        )?;
        Ok(Some(teacher_id))
    }

    /// Lists the student on the course and the course on the student.
    pub fn enroll_student(&self, student_id: &str, course_code: &str) -> RelationResult<()> {
        self.require_student_and_course(student_id, course_code)?;

        self.store.update_one(
            Collection::Courses,
            course_code,
            &Update::add_to_set("students", student_id),
        )?;
        self.store.update_one(
            Collection::Students,
            student_id,
            &Update::add_to_set("enrollments", course_code),
        )?;
        Ok(())
    }

    /// Removes the enrollment from both sides. Idempotent.
    pub fn unenroll_student(&self, student_id: &str, course_code: &str) -> RelationResult<()> {
        self.require_student_and_course(student_id, course_code)?;

        self.store.update_one(
            Collection::Courses,
            course_code,
            &Update::pull("students", student_id),
        )?;
        self.store.update_one(
            Collection::Students,
            student_id,
            &Update::pull("enrollments", course_code),
        )?;
        Ok(())
    }

    /// Pulls the student from every course, then deletes the student.
    pub fn delete_student(&self, student_id: &str) -> RelationResult<()> {
        self.students().require(student_id)?;
        self.store.update_many(
            Collection::Courses,
            &Filter::contains("students", student_id),
            &Update::pull("students", student_id),
        )?;
        self.students().delete(student_id)?;
        Ok(())
    }

    /// Unassigns the teacher from every course it holds, then deletes it.
    pub fn delete_teacher(&self, teacher_id: &str) -> RelationResult<()> {
        self.teachers().require(teacher_id)?;
        self.store.update_many(
            Collection::Courses,
            &Filter::eq("teacher_id", teacher_id),
            &Update::set_field("teacher_id", Value::Null),
        )?;
        self.teachers().delete(teacher_id)?;
        Ok(())
    }

    /// Pulls the course from every student's enrollments, then deletes it.
    pub fn delete_course(&self, course_code: &str) -> RelationResult<()> {
        self.courses().require(course_code)?;
        self.store.update_many(
            Collection::Students,
            &Filter::contains("enrollments", course_code),
            &Update::pull("enrollments", course_code),
        )?;
        self.courses().delete(course_code)?;
        Ok(())
    }

    fn require_student_and_course(&self, student_id: &str, course_code: &str) -> RelationResult<()> {
        let student_exists = self.students().get(student_id)?.is_some();
        let course_exists = self.courses().get(course_code)?.is_some();
        if !student_exists || !course_exists {
            return Err(RelationError::StudentOrCourseNotFound {
                student_id: student_id.to_string(),
                course_code: course_code.to_string(),
            });
        }
        Ok(())
    }
}
