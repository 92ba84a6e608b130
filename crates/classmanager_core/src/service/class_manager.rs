//! Session facade for presentation callers.
//!
//! # Responsibility
//! - Expose create/read/update/delete per collection plus the linkage
//!   operations, each returning a `(success, message)` outcome.
//! - Run multi-document operations inside one immediate transaction.
//! - Disable the session after any storage failure until `reconnect`.
//!
//! # Invariants
//! - Duplicate keys, missing records and invalid input never surface as
//!   `Err`; they become failed outcomes.
//! - After a storage failure every call returns `SessionError::Disabled`.
//! - Deletes always cascade through the relationship manager.

use crate::config::{AppConfig, ConfigError, DbLocation, DEFAULT_DB_NAME};
use crate::db::{open_db_in_memory, open_db_with_timeout};
use crate::model::course::{Course, CoursePatch};
use crate::model::record::{Collection, Record};
use crate::model::student::{Student, StudentPatch};
use crate::model::teacher::{Teacher, TeacherPatch};
use crate::repo::record_repo::{RecordRepository, RepoError};
use crate::service::reconcile_service::{reconcile, ReconcileMode, ReconcileReport};
use crate::service::relationship_service::{RelationError, RelationshipManager};
use crate::store::{SqliteDocumentStore, StoreError};
use log::{error, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Instant;

pub type SessionResult<T> = Result<T, SessionError>;

/// Result of one user-facing operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpOutcome {
    pub success: bool,
    pub message: String,
}

impl OpOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl From<OpOutcome> for (bool, String) {
    fn from(value: OpOutcome) -> Self {
        (value.success, value.message)
    }
}

/// Fatal session failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Configuration, open or storage failure that just happened.
    Connection(String),
    /// An earlier failure disabled the session.
    Disabled(String),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection(details) => write!(f, "database connection failed: {details}"),
            Self::Disabled(details) => write!(
                f,
                "session disabled after database failure ({details}); reconnect to continue"
            ),
        }
    }
}

impl Error for SessionError {}

impl From<ConfigError> for SessionError {
    fn from(value: ConfigError) -> Self {
        Self::Connection(value.to_string())
    }
}

/// Record counts per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardCounts {
    pub students: usize,
    pub teachers: usize,
    pub courses: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Single,
    Transaction,
}

/// One user session over one database connection.
pub struct ClassManager {
    config: AppConfig,
    conn: Option<Connection>,
    failure: Option<String>,
}

impl ClassManager {
    /// Loads configuration from the environment and connects.
    pub fn connect_from_env() -> SessionResult<Self> {
        let config = AppConfig::load()?;
        Self::connect(config)
    }

    /// Opens, migrates and pings the configured database.
    pub fn connect(config: AppConfig) -> SessionResult<Self> {
        let conn = open_connection(&config)?;
        Ok(Self {
            config,
            conn: Some(conn),
            failure: None,
        })
    }

    /// Wraps an already-open connection.
    ///
    /// `reconnect` reopens the same database file; only a connection without
    /// a backing file reconnects to a fresh in-memory database.
    pub fn from_connection(conn: Connection) -> SessionResult<Self> {
        SqliteDocumentStore::try_new(&conn)
            .map_err(|err| SessionError::Connection(err.to_string()))?;
        Ok(Self {
            config: config_for_connection(&conn),
            conn: Some(conn),
            failure: None,
        })
    }

    /// Drops the current connection and opens a new one, clearing any failure.
    pub fn reconnect(&mut self) -> SessionResult<()> {
        self.conn = None;
        match open_connection(&self.config) {
            Ok(conn) => {
                self.conn = Some(conn);
                self.failure = None;
                info!("event=session_reconnect module=service status=ok");
                Ok(())
            }
            Err(err) => {
                self.failure = Some(err.to_string());
                error!("event=session_reconnect module=service status=error error={err}");
                Err(err)
            }
        }
    }

    /// Whether data operations are currently allowed.
    pub fn is_active(&self) -> bool {
        self.failure.is_none() && self.conn.is_some()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Raw connection for diagnostics.
    pub fn connection(&self) -> Option<&Connection> {
        self.conn.as_ref()
    }

    pub fn create_student(&mut self, student: &Student) -> SessionResult<OpOutcome> {
        self.create_record(student, "student_create", "Student created")
    }

    pub fn read_students(&mut self) -> SessionResult<Vec<Student>> {
        self.read_all_records("student_list")
    }

    pub fn update_student(
        &mut self,
        student_id: &str,
        patch: &StudentPatch,
    ) -> SessionResult<OpOutcome> {
        self.update_record::<Student>("student_update", student_id, patch, "Student updated")
    }

    /// Deletes the student after pulling it from every course.
    pub fn delete_student(&mut self, student_id: &str) -> SessionResult<OpOutcome> {
        let result = self.execute("student_delete", Scope::Transaction, |store| {
            RelationshipManager::new(store).delete_student(student_id)
        })?;
        Ok(outcome(result, "Student deleted"))
    }

    pub fn create_teacher(&mut self, teacher: &Teacher) -> SessionResult<OpOutcome> {
        self.create_record(teacher, "teacher_create", "Teacher created")
    }

    pub fn read_teachers(&mut self) -> SessionResult<Vec<Teacher>> {
        self.read_all_records("teacher_list")
    }

    pub fn update_teacher(
        &mut self,
        teacher_id: &str,
        patch: &TeacherPatch,
    ) -> SessionResult<OpOutcome> {
        self.update_record::<Teacher>("teacher_update", teacher_id, patch, "Teacher updated")
    }

    /// Deletes the teacher after unassigning it from its courses.
    pub fn delete_teacher(&mut self, teacher_id: &str) -> SessionResult<OpOutcome> {
        let result = self.execute("teacher_delete", Scope::Transaction, |store| {
            RelationshipManager::new(store).delete_teacher(teacher_id)
        })?;
        Ok(outcome(result, "Teacher deleted"))
    }

    pub fn create_course(&mut self, course: &Course) -> SessionResult<OpOutcome> {
        self.create_record(course, "course_create", "Course created")
    }

    pub fn read_courses(&mut self) -> SessionResult<Vec<Course>> {
        self.read_all_records("course_list")
    }

    pub fn update_course(
        &mut self,
        course_code: &str,
        patch: &CoursePatch,
    ) -> SessionResult<OpOutcome> {
        self.update_record::<Course>("course_update", course_code, patch, "Course updated")
    }

    /// Deletes the course after pulling it from every student's enrollments.
    pub fn delete_course(&mut self, course_code: &str) -> SessionResult<OpOutcome> {
        let result = self.execute("course_delete", Scope::Transaction, |store| {
            RelationshipManager::new(store).delete_course(course_code)
        })?;
        Ok(outcome(result, "Course deleted"))
    }

    pub fn assign_teacher(
        &mut self,
        teacher_id: &str,
        course_code: &str,
    ) -> SessionResult<OpOutcome> {
        let result = self.execute("teacher_assign", Scope::Transaction, |store| {
            RelationshipManager::new(store).assign_teacher(teacher_id, course_code)
        })?;
        Ok(outcome(result, "Teacher assigned"))
    }

    pub fn unassign_teacher(&mut self, course_code: &str) -> SessionResult<OpOutcome> {
        let result = self.execute("teacher_unassign", Scope::Transaction, |store| {
            RelationshipManager::new(store).unassign_teacher(course_code)
        })?;
        Ok(match result {
            Ok(Some(_)) => OpOutcome::ok("Teacher unassigned"),
            Ok(None) => OpOutcome::ok("Course has no assigned teacher"),
            Err(err) => OpOutcome::failed(rejection_message(&err)),
        })
    }

    pub fn enroll_student(
        &mut self,
        student_id: &str,
        course_code: &str,
    ) -> SessionResult<OpOutcome> {
        let result = self.execute("student_enroll", Scope::Transaction, |store| {
            RelationshipManager::new(store).enroll_student(student_id, course_code)
        })?;
        Ok(outcome(result, "Student enrolled"))
    }

    pub fn unenroll_student(
        &mut self,
        student_id: &str,
        course_code: &str,
    ) -> SessionResult<OpOutcome> {
        let result = self.execute("student_unenroll", Scope::Transaction, |store| {
            RelationshipManager::new(store).unenroll_student(student_id, course_code)
        })?;
        Ok(outcome(result, "Student unenrolled"))
    }

    pub fn dashboard(&mut self) -> SessionResult<DashboardCounts> {
        self.read("dashboard", Scope::Single, |store| {
            Ok(DashboardCounts {
                students: RecordRepository::<_, Student>::new(store).count()?,
                teachers: RecordRepository::<_, Teacher>::new(store).count()?,
                courses: RecordRepository::<_, Course>::new(store).count()?,
            })
        })
    }

    /// Runs the consistency sweep; repairs commit atomically.
    pub fn reconcile(&mut self, mode: ReconcileMode) -> SessionResult<ReconcileReport> {
        let scope = match mode {
            ReconcileMode::DryRun => Scope::Single,
            ReconcileMode::Repair => Scope::Transaction,
        };
        let report = self.read("reconcile", scope, |store| reconcile(store, mode))?;
        info!(
            "event=reconcile module=service status=ok mode={mode:?} findings={}",
            report.total()
        );
        Ok(report)
    }

    fn create_record<R: Record>(
        &mut self,
        record: &R,
        event: &'static str,
        created: &str,
    ) -> SessionResult<OpOutcome> {
        let result = self.execute(event, Scope::Single, |store| {
            Ok(RecordRepository::<_, R>::new(store).create(record)?)
        })?;
        Ok(outcome(result, created))
    }

    fn update_record<R: Record>(
        &mut self,
        event: &'static str,
        key: &str,
        patch: &R::Patch,
        updated: &str,
    ) -> SessionResult<OpOutcome> {
        let result = self.execute(event, Scope::Single, |store| {
            Ok(RecordRepository::<_, R>::new(store).update(key, patch)?)
        })?;
        Ok(outcome(result, updated))
    }

    fn read_all_records<R: Record>(&mut self, event: &'static str) -> SessionResult<Vec<R>> {
        self.read(event, Scope::Single, |store| {
            Ok(RecordRepository::<_, R>::new(store).read_all()?)
        })
    }

    /// Like `execute`, for operations without expected failures.
    fn read<T>(
        &mut self,
        event: &'static str,
        scope: Scope,
        operation: impl FnOnce(&SqliteDocumentStore<'_>) -> Result<T, RelationError>,
    ) -> SessionResult<T> {
        match self.execute(event, scope, operation)? {
            Ok(value) => Ok(value),
            Err(err) => Err(self.disable(event, &err)),
        }
    }

    /// Runs `operation` and sorts its failure into expected (inner `Err`)
    /// or fatal (outer `Err`, session disabled).
    fn execute<T>(
        &mut self,
        event: &'static str,
        scope: Scope,
        operation: impl FnOnce(&SqliteDocumentStore<'_>) -> Result<T, RelationError>,
    ) -> SessionResult<Result<T, RelationError>> {
        let started_at = Instant::now();
        let result = run_in_scope(self.active_connection()?, scope, operation);
        let duration_ms = started_at.elapsed().as_millis();

        match result {
            Ok(value) => {
                info!("event={event} module=service status=ok duration_ms={duration_ms}");
                Ok(Ok(value))
            }
            Err(err) if is_expected(&err) => {
                info!(
                    "event={event} module=service status=rejected duration_ms={duration_ms} error_code={}",
                    error_code(&err)
                );
                Ok(Err(err))
            }
            Err(err) => Err(self.disable(event, &err)),
        }
    }

    fn active_connection(&self) -> SessionResult<&Connection> {
        if let Some(reason) = &self.failure {
            return Err(SessionError::Disabled(reason.clone()));
        }
        self.conn
            .as_ref()
            .ok_or_else(|| SessionError::Disabled("no open connection".to_string()))
    }

    fn disable(&mut self, event: &'static str, err: &RelationError) -> SessionError {
        let reason = err.to_string();
        error!(
            "event={event} module=service status=error error_code={} error={reason}",
            error_code(err)
        );
        self.failure = Some(reason.clone());
        SessionError::Connection(reason)
    }
}

fn open_connection(config: &AppConfig) -> SessionResult<Connection> {
    let conn = match &config.db_location {
        DbLocation::Memory => open_db_in_memory(),
        DbLocation::File(path) => {
            if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|err| {
                    SessionError::Connection(format!(
                        "cannot create database directory `{}`: {err}",
                        parent.display()
                    ))
                })?;
            }
            open_db_with_timeout(path, config.busy_timeout)
        }
    }
    .map_err(|err| SessionError::Connection(err.to_string()))?;

    SqliteDocumentStore::try_new(&conn).map_err(|err| SessionError::Connection(err.to_string()))?;
    Ok(conn)
}

/// Reopen target for a connection opened elsewhere.
fn config_for_connection(conn: &Connection) -> AppConfig {
    let Some(path) = conn.path().filter(|path| !path.is_empty()) else {
        return AppConfig::in_memory();
    };
    let path = PathBuf::from(path);
    let db_name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map_or_else(|| DEFAULT_DB_NAME.to_string(), str::to_string);
    AppConfig {
        db_location: DbLocation::File(path),
        db_name,
        ..AppConfig::in_memory()
    }
}

fn run_in_scope<T>(
    conn: &Connection,
    scope: Scope,
    operation: impl FnOnce(&SqliteDocumentStore<'_>) -> Result<T, RelationError>,
) -> Result<T, RelationError> {
    match scope {
        Scope::Single => operation(&SqliteDocumentStore::new_unchecked(conn)),
        Scope::Transaction => {
            let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
                .map_err(StoreError::from)?;
            let value = operation(&SqliteDocumentStore::new_unchecked(&tx))?;
            tx.commit().map_err(StoreError::from)?;
            Ok(value)
        }
    }
}

fn is_expected(err: &RelationError) -> bool {
    match err {
        RelationError::Repo(repo) => repo.is_expected(),
        RelationError::TeacherOrCourseNotFound { .. }
        | RelationError::StudentOrCourseNotFound { .. }
        | RelationError::RecordNotFound { .. } => true,
    }
}

fn error_code(err: &RelationError) -> &'static str {
    match err {
        RelationError::Repo(RepoError::DuplicateKey { .. }) => "duplicate_key",
        RelationError::Repo(RepoError::Validation(_)) => "invalid_input",
        RelationError::Repo(RepoError::NotFound { .. })
        | RelationError::RecordNotFound { .. }
        | RelationError::TeacherOrCourseNotFound { .. }
        | RelationError::StudentOrCourseNotFound { .. } => "not_found",
        RelationError::Repo(RepoError::InvalidData(_)) => "invalid_data",
        RelationError::Repo(RepoError::Store(_)) => "store_failure",
    }
}

fn outcome(result: Result<(), RelationError>, success_message: &str) -> OpOutcome {
    match result {
        Ok(()) => OpOutcome::ok(success_message),
        Err(err) => OpOutcome::failed(rejection_message(&err)),
    }
}

fn rejection_message(err: &RelationError) -> String {
    match err {
        RelationError::Repo(RepoError::DuplicateKey { collection, .. }) => {
            duplicate_message(*collection).to_string()
        }
        RelationError::Repo(RepoError::NotFound { collection, .. })
        | RelationError::RecordNotFound { collection, .. } => {
            format!("{} not found", entity_label(*collection))
        }
        RelationError::Repo(RepoError::Validation(err)) => format!("Invalid input: {err}"),
        other => other.to_string(),
    }
}

fn entity_label(collection: Collection) -> &'static str {
    match collection {
        Collection::Students => "Student",
        Collection::Teachers => "Teacher",
        Collection::Courses => "Course",
    }
}

fn duplicate_message(collection: Collection) -> &'static str {
    match collection {
        Collection::Students => "Student ID already exists",
        Collection::Teachers => "Teacher ID already exists",
        Collection::Courses => "Course code already exists",
    }
}

#[cfg(test)]
mod tests {
    use super::{duplicate_message, OpOutcome, SessionError};
    use crate::model::record::Collection;

    #[test]
    fn outcome_converts_to_pair() {
        let pair: (bool, String) = OpOutcome::failed("Student not found").into();
        assert_eq!(pair, (false, "Student not found".to_string()));
    }

    #[test]
    fn duplicate_messages_name_the_key_field() {
        assert_eq!(
            duplicate_message(Collection::Courses),
            "Course code already exists"
        );
        assert_eq!(
            duplicate_message(Collection::Teachers),
            "Teacher ID already exists"
        );
    }

    #[test]
    fn disabled_error_mentions_reconnect() {
        let err = SessionError::Disabled("disk I/O error".to_string());
        assert!(err.to_string().contains("reconnect"));
    }
}
