//! Document store boundary used by the record and relationship layers.
//!
//! # Responsibility
//! - Define the single-document operation set the core relies on.
//! - Keep SQL and JSON encoding details behind `SqliteDocumentStore`.
//!
//! # Invariants
//! - Every operation touches exactly one collection.
//! - A natural key is unique within its collection; the storage layer
//!   enforces this, not just the caller's pre-check.
//! - Updates never change a document's natural key or identity.

use crate::db::DbError;
use crate::model::record::Collection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod document;
pub mod sqlite_store;

pub use document::{Document, DocumentId, Filter, Projection, Update, UpdateResult};
pub use sqlite_store::SqliteDocumentStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by document store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Insert collided with an existing natural key.
    DuplicateKey { collection: Collection, key: String },
    /// Document body or requested mutation is malformed.
    InvalidDocument(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicateKey { collection, key } => {
                write!(f, "duplicate key `{key}` in {collection}")
            }
            Self::InvalidDocument(message) => write!(f, "invalid document: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "document store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "document store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "document store requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidDocument(value.to_string())
    }
}

/// Single-document operations over the three collections.
///
/// Each call is atomic on its own. Callers needing several writes to land
/// together run them against a store bound to one transaction.
pub trait DocumentStore {
    /// Loads one document by natural key, identity included.
    fn find_one(&self, collection: Collection, key: &str) -> StoreResult<Option<Document>>;
    /// Loads every matching document in insertion order.
    fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        projection: Projection,
    ) -> StoreResult<Vec<Document>>;
    /// Inserts a document carrying its natural key; returns the new identity.
    fn insert_one(&self, collection: Collection, document: Document) -> StoreResult<DocumentId>;
    /// Applies `update` to the document with `key`.
    fn update_one(
        &self,
        collection: Collection,
        key: &str,
        update: &Update,
    ) -> StoreResult<UpdateResult>;
    /// Applies `update` to every document matching `filter`.
    fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> StoreResult<UpdateResult>;
    /// Removes the document with `key`; returns whether one existed.
    fn delete_one(&self, collection: Collection, key: &str) -> StoreResult<bool>;
    /// Number of documents in the collection.
    fn count(&self, collection: Collection) -> StoreResult<usize>;
}
