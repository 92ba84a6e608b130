use classmanager_core::db::open_db_in_memory;
use classmanager_core::store::{Document, Filter, Projection, Update};
use classmanager_core::{Collection, DocumentStore, SqliteDocumentStore, StoreError};
use serde_json::{json, Value};

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

#[test]
fn insert_assigns_identity_and_find_one_returns_it() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();

    let id = store
        .insert_one(
            Collection::Students,
            doc(json!({ "student_id": "S1", "name": "Ada", "_id": "forged" })),
        )
        .unwrap();

    let found = store.find_one(Collection::Students, "S1").unwrap().unwrap();
    assert_eq!(found["_id"], json!(id.to_string()));
    assert_eq!(found["name"], json!("Ada"));
    assert!(store.find_one(Collection::Teachers, "S1").unwrap().is_none());
}

#[test]
fn insert_rejects_duplicate_key_and_keeps_original() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    store
        .insert_one(
            Collection::Courses,
            doc(json!({ "course_code": "BIO1", "title": "Biology" })),
        )
        .unwrap();

    let err = store
        .insert_one(
            Collection::Courses,
            doc(json!({ "course_code": "BIO1", "title": "Other" })),
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateKey { ref key, .. } if key == "BIO1"));

    let found = store.find_one(Collection::Courses, "BIO1").unwrap().unwrap();
    assert_eq!(found["title"], json!("Biology"));
    assert_eq!(store.count(Collection::Courses).unwrap(), 1);
}

#[test]
fn insert_requires_natural_key() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();

    let err = store
        .insert_one(Collection::Teachers, doc(json!({ "name": "Nobody" })))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidDocument(_)));
}

#[test]
fn find_preserves_insertion_order_and_projection() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    for key in ["S3", "S1", "S2"] {
        store
            .insert_one(Collection::Students, doc(json!({ "student_id": key })))
            .unwrap();
    }

    let plain = store
        .find(Collection::Students, &Filter::All, Projection::ExcludeIdentity)
        .unwrap();
    let keys: Vec<&str> = plain
        .iter()
        .map(|d| d["student_id"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["S3", "S1", "S2"]);
    assert!(plain.iter().all(|d| !d.contains_key("_id")));

    let with_identity = store
        .find(
            Collection::Students,
            &Filter::eq("student_id", "S1"),
            Projection::IncludeIdentity,
        )
        .unwrap();
    assert_eq!(with_identity.len(), 1);
    assert!(with_identity[0].contains_key("_id"));
}

#[test]
fn update_one_reports_matched_and_modified() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    store
        .insert_one(
            Collection::Courses,
            doc(json!({ "course_code": "C1", "students": [] })),
        )
        .unwrap();

    let first = store
        .update_one(Collection::Courses, "C1", &Update::add_to_set("students", "S1"))
        .unwrap();
    assert_eq!((first.matched, first.modified), (1, 1));

    let repeat = store
        .update_one(Collection::Courses, "C1", &Update::add_to_set("students", "S1"))
        .unwrap();
    assert_eq!((repeat.matched, repeat.modified), (1, 0));

    let missing = store
        .update_one(Collection::Courses, "C9", &Update::add_to_set("students", "S1"))
        .unwrap();
    assert_eq!((missing.matched, missing.modified), (0, 0));

    let course = store.find_one(Collection::Courses, "C1").unwrap().unwrap();
    assert_eq!(course["students"], json!(["S1"]));
}

#[test]
fn update_many_pulls_from_every_matching_document() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    for (code, students) in [("C1", json!(["S1", "S2"])), ("C2", json!(["S2"])), ("C3", json!([]))] {
        store
            .insert_one(
                Collection::Courses,
                doc(json!({ "course_code": code, "students": students })),
            )
            .unwrap();
    }

    let result = store
        .update_many(
            Collection::Courses,
            &Filter::contains("students", "S2"),
            &Update::pull("students", "S2"),
        )
        .unwrap();
    assert_eq!((result.matched, result.modified), (2, 2));

    let remaining = store
        .find(
            Collection::Courses,
            &Filter::contains("students", "S2"),
            Projection::ExcludeIdentity,
        )
        .unwrap();
    assert!(remaining.is_empty());
}

#[test]
fn updates_cannot_touch_key_or_identity() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    store
        .insert_one(Collection::Teachers, doc(json!({ "teacher_id": "T1" })))
        .unwrap();

    let err = store
        .update_one(Collection::Teachers, "T1", &Update::set_field("teacher_id", "T2"))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidDocument(_)));

    let err = store
        .update_one(Collection::Teachers, "T1", &Update::set_field("_id", "x"))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidDocument(_)));
    assert!(store.find_one(Collection::Teachers, "T1").unwrap().is_some());
}

#[test]
fn delete_one_reports_existence() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    store
        .insert_one(Collection::Students, doc(json!({ "student_id": "S1" })))
        .unwrap();

    assert!(store.delete_one(Collection::Students, "S1").unwrap());
    assert!(!store.delete_one(Collection::Students, "S1").unwrap());
    assert_eq!(store.count(Collection::Students).unwrap(), 0);
}
