//! Reconciliation sweep for the bidirectional relationship lists.
//!
//! # Responsibility
//! - Detect references to missing records, half-present pairings and
//!   repeated list entries.
//! - Optionally repair them with idempotent list updates.
//!
//! # Invariants
//! - Detection works on one snapshot of all three collections.
//! - Stale teacher `courses` entries that still name an existing course
//!   are kept; reassignment leaves them by design of the linkage rules.
//! - `DryRun` never writes.
//! - Deduplicating writes are queued before every other repair, so later
//!   `$addToSet`/`$pull` repairs apply to the deduplicated lists.

use crate::model::course::Course;
use crate::model::record::Collection;
use crate::model::student::Student;
use crate::model::teacher::Teacher;
use crate::repo::record_repo::RecordRepository;
use crate::service::relationship_service::RelationResult;
use crate::store::{DocumentStore, Update};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Whether the sweep writes repairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    DryRun,
    Repair,
}

/// Counts of inconsistencies found (and repaired, in `Repair` mode).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Courses whose `teacher_id` named a missing teacher.
    pub dangling_course_teachers: usize,
    /// Assigned courses missing from their teacher's `courses`.
    pub missing_teacher_courses: usize,
    /// Teacher `courses` entries naming missing courses.
    pub dangling_teacher_courses: usize,
    /// Course `students` entries naming missing students.
    pub dangling_course_students: usize,
    /// Student `enrollments` entries naming missing courses.
    pub dangling_enrollments: usize,
    /// Enrollment pairs present on only one side.
    pub half_enrollments: usize,
    /// Repeated entries in `students`, `courses` or `enrollments` lists.
    pub duplicate_list_entries: usize,
}

impl ReconcileReport {
    pub fn total(&self) -> usize {
        self.dangling_course_teachers
            + self.missing_teacher_courses
            + self.dangling_teacher_courses
            + self.dangling_course_students
            + self.dangling_enrollments
            + self.half_enrollments
            + self.duplicate_list_entries
    }

    pub fn is_consistent(&self) -> bool {
        self.total() == 0
    }
}

/// Runs the sweep against `store`.
pub fn reconcile<S: DocumentStore>(store: &S, mode: ReconcileMode) -> RelationResult<ReconcileReport> {
    let students: HashMap<String, Student> = RecordRepository::<S, Student>::new(store)
        .read_all()?
        .into_iter()
        .map(|student| (student.student_id.clone(), student))
        .collect();
    let teachers: HashMap<String, Teacher> = RecordRepository::<S, Teacher>::new(store)
        .read_all()?
        .into_iter()
        .map(|teacher| (teacher.teacher_id.clone(), teacher))
        .collect();
    let courses = RecordRepository::<S, Course>::new(store).read_all()?;
    let course_index: HashMap<&str, &Course> = courses
        .iter()
        .map(|course| (course.course_code.as_str(), course))
        .collect();

    let mut report = ReconcileReport::default();
    let mut repairs: Vec<(Collection, String, Update)> = Vec::new();

    for course in &courses {
        queue_dedup(
            &mut report,
            &mut repairs,
            (Collection::Courses, course.course_code.as_str()),
            "students",
            &course.students,
        );
    }
    for teacher in teachers.values() {
        queue_dedup(
            &mut report,
            &mut repairs,
            (Collection::Teachers, teacher.teacher_id.as_str()),
            "courses",
            &teacher.courses,
        );
    }
    for student in students.values() {
        queue_dedup(
            &mut report,
            &mut repairs,
            (Collection::Students, student.student_id.as_str()),
            "enrollments",
            &student.enrollments,
        );
    }

    for course in &courses {
        let code = course.course_code.as_str();
        if let Some(teacher_id) = course.teacher_id.as_deref() {
            match teachers.get(teacher_id) {
                None => {
                    report.dangling_course_teachers += 1;
                    repairs.push((
                        Collection::Courses,
                        code.to_string(),
                        Update::set_field("teacher_id", Value::Null),
                    ));
                }
                Some(teacher) if !teacher.teaches(code) => {
                    report.missing_teacher_courses += 1;
                    repairs.push((
                        Collection::Teachers,
                        teacher_id.to_string(),
                        Update::add_to_set("courses", code),
                    ));
                }
                Some(_) => {}
            }
        }

        for student_id in unique(&course.students) {
            match students.get(student_id) {
                None => {
                    report.dangling_course_students += 1;
                    repairs.push((
                        Collection::Courses,
                        code.to_string(),
                        Update::pull("students", student_id.as_str()),
                    ));
                }
                Some(student) if !student.is_enrolled_in(code) => {
                    report.half_enrollments += 1;
                    repairs.push((
                        Collection::Students,
                        student_id.clone(),
                        Update::add_to_set("enrollments", code),
                    ));
                }
                Some(_) => {}
            }
        }
    }

    for teacher in teachers.values() {
        for code in unique(&teacher.courses) {
            if !course_index.contains_key(code.as_str()) {
                report.dangling_teacher_courses += 1;
                repairs.push((
                    Collection::Teachers,
                    teacher.teacher_id.clone(),
                    Update::pull("courses", code.as_str()),
                ));
            }
        }
    }

    for student in students.values() {
        for code in unique(&student.enrollments) {
            match course_index.get(code.as_str()) {
                None => {
                    report.dangling_enrollments += 1;
                    repairs.push((
                        Collection::Students,
                        student.student_id.clone(),
                        Update::pull("enrollments", code.as_str()),
                    ));
                }
                Some(course) if !course.has_student(&student.student_id) => {
                    report.half_enrollments += 1;
                    repairs.push((
                        Collection::Courses,
                        code.clone(),
                        Update::add_to_set("students", student.student_id.as_str()),
                    ));
                }
                Some(_) => {}
            }
        }
    }

    if mode == ReconcileMode::Repair {
        for (collection, key, update) in &repairs {
            store.update_one(*collection, key, update)?;
        }
    }

    Ok(report)
}

/// Queues a `$set` of the deduplicated list when `values` repeats an entry.
fn queue_dedup(
    report: &mut ReconcileReport,
    repairs: &mut Vec<(Collection, String, Update)>,
    (collection, key): (Collection, &str),
    field: &'static str,
    values: &[String],
) {
    let deduped: Vec<&String> = unique(values).collect();
    let repeats = values.len() - deduped.len();
    if repeats == 0 {
        return;
    }

    report.duplicate_list_entries += repeats;
    let list = Value::Array(deduped.into_iter().cloned().map(Value::String).collect());
    repairs.push((collection, key.to_string(), Update::set_field(field, list)));
}

/// First occurrence of each entry, in list order.
fn unique(values: &[String]) -> impl Iterator<Item = &String> {
    let mut seen = HashSet::new();
    values.iter().filter(move |value| seen.insert(value.as_str()))
}

#[cfg(test)]
mod tests {
    use super::{unique, ReconcileReport};

    #[test]
    fn empty_report_is_consistent() {
        let report = ReconcileReport::default();
        assert!(report.is_consistent());
        assert_eq!(report.total(), 0);
    }

    #[test]
    fn total_sums_every_counter() {
        let report = ReconcileReport {
            dangling_course_teachers: 1,
            missing_teacher_courses: 2,
            dangling_teacher_courses: 3,
            dangling_course_students: 4,
            dangling_enrollments: 5,
            half_enrollments: 6,
            duplicate_list_entries: 7,
        };
        assert_eq!(report.total(), 28);
        assert!(!report.is_consistent());
    }

    #[test]
    fn unique_keeps_first_occurrence_order() {
        let values: Vec<String> = ["B", "A", "B", "C", "A"].map(String::from).to_vec();
        let kept: Vec<&str> = unique(&values).map(String::as_str).collect();
        assert_eq!(kept, vec!["B", "A", "C"]);
    }
}
