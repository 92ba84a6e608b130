//! Record repository: create/read/update/delete per collection.
//!
//! # Responsibility
//! - Provide stable CRUD APIs for `Student`, `Teacher` and `Course`.
//! - Translate store outcomes into semantic errors (`DuplicateKey`, `NotFound`).
//!
//! # Invariants
//! - Write paths validate records and patches before touching storage.
//! - `create` pre-checks the key; the store's unique constraint still
//!   reports a racing insert as `DuplicateKey`.
//! - Read paths reject undecodable documents instead of masking them.
//! - `delete` here is a raw delete; cascading cleanup lives in the
//!   relationship manager.

use crate::model::record::{Collection, Record, RecordPatch, RecordValidationError};
use crate::store::{DocumentStore, Filter, Projection, StoreError, Update};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for record persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(RecordValidationError),
    DuplicateKey { collection: Collection, key: String },
    NotFound { collection: Collection, key: String },
    Store(StoreError),
    InvalidData(String),
}

impl RepoError {
    /// Whether this error is an expected, user-reportable outcome.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::DuplicateKey { .. } | Self::NotFound { .. }
        )
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateKey { collection, key } => {
                write!(f, "{collection} already contains key `{key}`")
            }
            Self::NotFound { collection, key } => write!(f, "{collection} has no key `{key}`"),
            Self::Store(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted record: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::DuplicateKey { .. } | Self::NotFound { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<RecordValidationError> for RepoError {
    fn from(value: RecordValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DuplicateKey { collection, key } => Self::DuplicateKey { collection, key },
            other => Self::Store(other),
        }
    }
}

/// Typed CRUD over one collection of a document store.
pub struct RecordRepository<'store, S: DocumentStore, R: Record> {
    store: &'store S,
    _record: PhantomData<R>,
}

impl<'store, S: DocumentStore, R: Record> RecordRepository<'store, S, R> {
    pub fn new(store: &'store S) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    /// Inserts a new record.
    ///
    /// Fails with `DuplicateKey` when the key is taken; the existing record
    /// is left untouched.
    pub fn create(&self, record: &R) -> RepoResult<()> {
        record.validate()?;
        let collection = R::COLLECTION;
        if self.store.find_one(collection, record.key())?.is_some() {
            return Err(RepoError::DuplicateKey {
                collection,
                key: record.key().to_string(),
            });
        }

        self.store.insert_one(collection, record.to_flat_record())?;
        Ok(())
    }

    /// Loads one record by natural key.
    pub fn get(&self, key: &str) -> RepoResult<Option<R>> {
        self.store
            .find_one(R::COLLECTION, key)?
            .map(decode_record::<R>)
            .transpose()
    }

    /// Loads one record or fails with `NotFound`.
    pub fn require(&self, key: &str) -> RepoResult<R> {
        self.get(key)?.ok_or_else(|| RepoError::NotFound {
            collection: R::COLLECTION,
            key: key.to_string(),
        })
    }

    /// All records in insertion order, identity stripped.
    pub fn read_all(&self) -> RepoResult<Vec<R>> {
        self.store
            .find(R::COLLECTION, &Filter::All, Projection::ExcludeIdentity)?
            .into_iter()
            .map(decode_record::<R>)
            .collect()
    }

    /// Replaces the fields set in `patch`. An empty patch only checks existence.
    pub fn update(&self, key: &str, patch: &R::Patch) -> RepoResult<()> {
        patch.validate()?;
        if patch.is_empty() {
            self.require(key)?;
            return Ok(());
        }

        let result =
            self.store
                .update_one(R::COLLECTION, key, &Update::Set(patch.to_field_set()))?;
        if result.matched == 0 {
            return Err(RepoError::NotFound {
                collection: R::COLLECTION,
                key: key.to_string(),
            });
        }
        Ok(())
    }

    /// Removes one record without touching references to it.
    pub fn delete(&self, key: &str) -> RepoResult<()> {
        if !self.store.delete_one(R::COLLECTION, key)? {
            return Err(RepoError::NotFound {
                collection: R::COLLECTION,
                key: key.to_string(),
            });
        }
        Ok(())
    }

    pub fn count(&self) -> RepoResult<usize> {
        Ok(self.store.count(R::COLLECTION)?)
    }
}

fn decode_record<R: Record>(document: crate::store::Document) -> RepoResult<R> {
    R::from_flat_record(document).map_err(|err| {
        RepoError::InvalidData(format!("cannot decode {} record: {err}", R::COLLECTION))
    })
}
