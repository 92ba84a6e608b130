use classmanager_core::db::open_db_in_memory;
use classmanager_core::{
    Collection, Course, RecordRepository, RelationError, RelationshipManager, SqliteDocumentStore,
    Student, Teacher,
};
use rusqlite::Connection;

fn seed(conn: &Connection) {
    let store = SqliteDocumentStore::try_new(conn).unwrap();
    let students = RecordRepository::<_, Student>::new(&store);
    students.create(&Student::new("S1", "Ada", "", 9)).unwrap();
    students.create(&Student::new("S2", "Bo", "", 10)).unwrap();
    let teachers = RecordRepository::<_, Teacher>::new(&store);
    teachers.create(&Teacher::new("T1", "Grace", "", "Math")).unwrap();
    teachers.create(&Teacher::new("T2", "Alan", "", "Logic")).unwrap();
    let courses = RecordRepository::<_, Course>::new(&store);
    courses
        .create(&Course::new("MATH101", "Algebra", "Tue 10:00"))
        .unwrap();
    courses
        .create(&Course::new("CS101", "Programming", "Wed 13:00"))
        .unwrap();
}

#[test]
fn enroll_links_both_sides() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let store = SqliteDocumentStore::try_new(&conn).unwrap();

    RelationshipManager::new(&store)
        .enroll_student("S1", "MATH101")
        .unwrap();

    let student = RecordRepository::<_, Student>::new(&store)
        .require("S1")
        .unwrap();
    let course = RecordRepository::<_, Course>::new(&store)
        .require("MATH101")
        .unwrap();
    assert_eq!(student.enrollments, vec!["MATH101"]);
    assert_eq!(course.students, vec!["S1"]);
}

#[test]
fn enroll_twice_is_idempotent_on_both_sides() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let manager = RelationshipManager::new(&store);

    manager.enroll_student("S1", "MATH101").unwrap();
    manager.enroll_student("S1", "MATH101").unwrap();

    let student = RecordRepository::<_, Student>::new(&store)
        .require("S1")
        .unwrap();
    let course = RecordRepository::<_, Course>::new(&store)
        .require("MATH101")
        .unwrap();
    assert_eq!(student.enrollments, vec!["MATH101"]);
    assert_eq!(course.students, vec!["S1"]);
}

#[test]
fn enroll_with_missing_side_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let manager = RelationshipManager::new(&store);

    let err = manager.enroll_student("S404", "MATH101").unwrap_err();
    assert!(matches!(err, RelationError::StudentOrCourseNotFound { .. }));
    assert_eq!(err.to_string(), "Student or course not found");

    let err = manager.enroll_student("S1", "NOPE").unwrap_err();
    assert!(matches!(err, RelationError::StudentOrCourseNotFound { .. }));

    let course = RecordRepository::<_, Course>::new(&store)
        .require("MATH101")
        .unwrap();
    let student = RecordRepository::<_, Student>::new(&store)
        .require("S1")
        .unwrap();
    assert!(course.students.is_empty());
    assert!(student.enrollments.is_empty());
}

#[test]
fn reassignment_keeps_course_on_previous_teacher() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let manager = RelationshipManager::new(&store);

    manager.assign_teacher("T1", "MATH101").unwrap();
    manager.assign_teacher("T2", "MATH101").unwrap();

    let course = RecordRepository::<_, Course>::new(&store)
        .require("MATH101")
        .unwrap();
    assert_eq!(course.teacher_id.as_deref(), Some("T2"));

    let teachers = RecordRepository::<_, Teacher>::new(&store);
    assert_eq!(teachers.require("T1").unwrap().courses, vec!["MATH101"]);
    assert_eq!(teachers.require("T2").unwrap().courses, vec!["MATH101"]);
}

#[test]
fn delete_student_pulls_from_every_course() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let manager = RelationshipManager::new(&store);
    manager.enroll_student("S1", "MATH101").unwrap();
    manager.enroll_student("S1", "CS101").unwrap();
    manager.enroll_student("S2", "CS101").unwrap();

    manager.delete_student("S1").unwrap();

    let courses = RecordRepository::<_, Course>::new(&store);
    assert!(courses.require("MATH101").unwrap().students.is_empty());
    assert_eq!(courses.require("CS101").unwrap().students, vec!["S2"]);
    assert!(RecordRepository::<_, Student>::new(&store)
        .get("S1")
        .unwrap()
        .is_none());
}

#[test]
fn delete_course_pulls_from_every_student_but_not_teachers() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let manager = RelationshipManager::new(&store);
    manager.enroll_student("S1", "MATH101").unwrap();
    manager.enroll_student("S2", "MATH101").unwrap();
    manager.enroll_student("S2", "CS101").unwrap();
    manager.assign_teacher("T1", "MATH101").unwrap();

    manager.delete_course("MATH101").unwrap();

    let students = RecordRepository::<_, Student>::new(&store);
    assert!(students.require("S1").unwrap().enrollments.is_empty());
    assert_eq!(students.require("S2").unwrap().enrollments, vec!["CS101"]);
    assert_eq!(
        RecordRepository::<_, Teacher>::new(&store)
            .require("T1")
            .unwrap()
            .courses,
        vec!["MATH101"]
    );
}

#[test]
fn delete_teacher_clears_every_assignment() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let manager = RelationshipManager::new(&store);
    manager.assign_teacher("T1", "MATH101").unwrap();
    manager.assign_teacher("T1", "CS101").unwrap();

    manager.delete_teacher("T1").unwrap();

    let courses = RecordRepository::<_, Course>::new(&store);
    assert_eq!(courses.require("MATH101").unwrap().teacher_id, None);
    assert_eq!(courses.require("CS101").unwrap().teacher_id, None);
    assert!(RecordRepository::<_, Teacher>::new(&store)
        .get("T1")
        .unwrap()
        .is_none());
}

#[test]
fn deleting_missing_records_fails() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let manager = RelationshipManager::new(&store);

    for (err, expected) in [
        (manager.delete_student("S404").unwrap_err(), Collection::Students),
        (manager.delete_teacher("T404").unwrap_err(), Collection::Teachers),
        (manager.delete_course("C404").unwrap_err(), Collection::Courses),
    ] {
        match err {
            RelationError::RecordNotFound { collection, .. } => assert_eq!(collection, expected),
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[test]
fn unassign_missing_course_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let store = SqliteDocumentStore::try_new(&conn).unwrap();

    let err = RelationshipManager::new(&store)
        .unassign_teacher("C404")
        .unwrap_err();
    assert!(matches!(
        err,
        RelationError::RecordNotFound {
            collection: Collection::Courses,
            ..
        }
    ));
}
