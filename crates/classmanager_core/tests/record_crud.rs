use classmanager_core::db::open_db_in_memory;
use classmanager_core::{
    Collection, Course, CoursePatch, Record, RecordRepository, RecordValidationError, RepoError,
    SqliteDocumentStore, Student, StudentPatch, Teacher, TeacherPatch,
};
use serde_json::json;

#[test]
fn flat_records_carry_exact_fields_and_no_identity() {
    let student = Student::new("S1", "Ada", "ada@example.org", 10);
    let flat = student.to_flat_record();
    let mut keys: Vec<&str> = flat.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec!["email", "enrollments", "grade_level", "name", "student_id"]
    );
    assert_eq!(flat["enrollments"], json!([]));

    let course = Course::new("MATH101", "Algebra", "Tue 10:00").to_flat_record();
    assert_eq!(course["teacher_id"], json!(null));
    assert_eq!(course["students"], json!([]));
    assert!(!course.contains_key("_id"));

    let teacher = Teacher::new("T1", "Grace", "", "Math").to_flat_record();
    assert_eq!(teacher["courses"], json!([]));
    assert_eq!(teacher.len(), 5);
}

#[test]
fn decoding_ignores_identity_and_defaults_missing_lists() {
    let stored = json!({
        "_id": "3f0c7a4e-0000-4000-8000-000000000000",
        "course_code": "ART1",
        "title": "Drawing",
        "schedule": "Fri 14:00"
    })
    .as_object()
    .cloned()
    .unwrap();

    let course = Course::from_flat_record(stored).unwrap();
    assert_eq!(course.teacher_id, None);
    assert!(course.students.is_empty());
}

#[test]
fn create_then_read_all_in_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let students = RecordRepository::<_, Student>::new(&store);

    students.create(&Student::new("S2", "Bo", "", 3)).unwrap();
    students
        .create(&Student::new("S1", "Ada", "ada@example.org", 10))
        .unwrap();

    let all = students.read_all().unwrap();
    let ids: Vec<&str> = all.iter().map(|s| s.student_id.as_str()).collect();
    assert_eq!(ids, vec!["S2", "S1"]);
    assert_eq!(all[1], Student::new("S1", "Ada", "ada@example.org", 10));
    assert_eq!(students.count().unwrap(), 2);
}

#[test]
fn duplicate_create_keeps_existing_record() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let teachers = RecordRepository::<_, Teacher>::new(&store);
    teachers.create(&Teacher::new("T1", "Grace", "", "Math")).unwrap();

    let err = teachers
        .create(&Teacher::new("T1", "Someone Else", "", "Art"))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::DuplicateKey {
            collection: Collection::Teachers,
            ..
        }
    ));
    assert_eq!(teachers.require("T1").unwrap().name, "Grace");
}

#[test]
fn create_validates_before_writing() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let students = RecordRepository::<_, Student>::new(&store);

    let err = students.create(&Student::new("  ", "Blank", "", 5)).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(RecordValidationError::BlankKey { .. })
    ));

    let err = students.create(&Student::new("S9", "Old", "", 21)).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(RecordValidationError::GradeLevelOutOfRange(21))
    ));

    let err = students
        .create(&Student::new("S9", "Typo", "not-an-email", 5))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(RecordValidationError::InvalidEmail(_))
    ));
    assert_eq!(students.count().unwrap(), 0);
}

#[test]
fn update_replaces_only_provided_fields() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let courses = RecordRepository::<_, Course>::new(&store);
    courses
        .create(&Course::new("MATH101", "Algebra", "Tue 10:00"))
        .unwrap();

    courses
        .update(
            "MATH101",
            &CoursePatch {
                title: Some("Algebra I".to_string()),
                schedule: None,
            },
        )
        .unwrap();

    let course = courses.require("MATH101").unwrap();
    assert_eq!(course.title, "Algebra I");
    assert_eq!(course.schedule, "Tue 10:00");
}

#[test]
fn update_missing_record_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let teachers = RecordRepository::<_, Teacher>::new(&store);

    let err = teachers
        .update(
            "T404",
            &TeacherPatch {
                specialization: Some("Physics".to_string()),
                ..TeacherPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));

    let err = teachers.update("T404", &TeacherPatch::default()).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));
}

#[test]
fn update_rejects_invalid_patch() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let students = RecordRepository::<_, Student>::new(&store);
    students.create(&Student::new("S1", "Ada", "", 9)).unwrap();

    let err = students
        .update(
            "S1",
            &StudentPatch {
                grade_level: Some(0),
                ..StudentPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(students.require("S1").unwrap().grade_level, 9);
}

#[test]
fn delete_is_raw_and_reports_missing() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let students = RecordRepository::<_, Student>::new(&store);
    students.create(&Student::new("S1", "Ada", "", 9)).unwrap();

    students.delete("S1").unwrap();
    assert!(students.get("S1").unwrap().is_none());
    assert!(matches!(
        students.delete("S1").unwrap_err(),
        RepoError::NotFound { .. }
    ));
}
