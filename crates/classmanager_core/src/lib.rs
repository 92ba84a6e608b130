//! Core domain logic for the class manager.
//! This crate is the single source of truth for record and linkage invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{AppConfig, ConfigError, DbLocation};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::course::{Course, CoursePatch};
pub use model::record::{Collection, Person, Record, RecordPatch, RecordValidationError};
pub use model::student::{Student, StudentPatch};
pub use model::teacher::{Teacher, TeacherPatch};
pub use repo::record_repo::{RecordRepository, RepoError, RepoResult};
pub use service::class_manager::{
    ClassManager, DashboardCounts, OpOutcome, SessionError, SessionResult,
};
pub use service::reconcile_service::{reconcile, ReconcileMode, ReconcileReport};
pub use service::relationship_service::{RelationError, RelationResult, RelationshipManager};
pub use store::{DocumentStore, SqliteDocumentStore, StoreError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
