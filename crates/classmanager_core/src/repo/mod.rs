//! Repository layer over the document store.
//!
//! # Responsibility
//! - Map typed records to flat documents and back.
//! - Turn store outcomes into semantic errors (`DuplicateKey`, `NotFound`).
//!
//! # Invariants
//! - Repository writes must enforce `Record::validate()` before persistence.

pub mod record_repo;
