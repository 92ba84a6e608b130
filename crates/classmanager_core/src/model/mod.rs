//! Record shapes for the three collections.
//!
//! # Responsibility
//! - Define `Student`, `Teacher` and `Course` and their partial updates.
//! - Provide the flat key-value contract used by the document store.
//!
//! # Invariants
//! - Each record is identified by its natural key, never by storage identity.
//! - Relationship lists hold natural keys of the other collection.

pub mod course;
pub mod record;
pub mod student;
pub mod teacher;
