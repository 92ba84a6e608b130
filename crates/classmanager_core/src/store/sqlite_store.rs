//! SQLite-backed document store.
//!
//! # Responsibility
//! - Persist each document as a JSON body in the shared `documents` table.
//! - Evaluate filters and updates against decoded bodies.
//!
//! # Invariants
//! - `doc_key` always equals the body's natural-key field.
//! - Bodies never store `_id`; the identity lives in `doc_id`.
//! - Reads return documents ordered by insertion (`seq ASC`).

use super::document::{Document, DocumentId, Filter, Projection, Update, UpdateResult};
use super::{DocumentStore, StoreError, StoreResult};
use crate::db::migrations::{current_user_version, latest_version};
use crate::model::record::{Collection, IDENTITY_FIELD};
use rusqlite::{ffi, params, Connection, Row};
use serde_json::Value;
use uuid::Uuid;

const DOCUMENT_SELECT_SQL: &str = "SELECT
    doc_id,
    doc_key,
    body
FROM documents";

const REQUIRED_COLUMNS: [&str; 7] = [
    "seq",
    "doc_id",
    "collection",
    "doc_key",
    "body",
    "created_at",
    "updated_at",
];

/// One decoded row before projection.
struct StoredDocument {
    doc_id: String,
    body: Document,
}

impl StoredDocument {
    fn project(mut self, projection: Projection) -> Document {
        if projection == Projection::IncludeIdentity {
            self.body
                .insert(IDENTITY_FIELD.to_string(), Value::String(self.doc_id));
        }
        self.body
    }
}

/// Document store over a migrated SQLite connection or transaction.
pub struct SqliteDocumentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentStore<'conn> {
    /// Creates a store after verifying schema version, table and columns.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Creates a store without schema checks.
    ///
    /// The caller must already have verified `conn` (or the connection a
    /// transaction was opened on) with `try_new`.
    pub fn new_unchecked(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn load_one(&self, collection: Collection, key: &str) -> StoreResult<Option<StoredDocument>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DOCUMENT_SELECT_SQL}
             WHERE collection = ?1
               AND doc_key = ?2;"
        ))?;
        let mut rows = stmt.query(params![collection.name(), key])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_document_row(row, collection)?));
        }
        Ok(None)
    }

    fn load_all(&self, collection: Collection) -> StoreResult<Vec<StoredDocument>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DOCUMENT_SELECT_SQL}
             WHERE collection = ?1
             ORDER BY seq ASC;"
        ))?;
        let mut rows = stmt.query([collection.name()])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(parse_document_row(row, collection)?);
        }
        Ok(documents)
    }

    /// Applies `update` to one loaded document and persists it if changed.
    fn apply_and_write(
        &self,
        collection: Collection,
        stored: &mut StoredDocument,
        update: &Update,
    ) -> StoreResult<bool> {
        if !update.apply(&mut stored.body)? {
            return Ok(false);
        }

        let body = serde_json::to_string(&stored.body)?;
        self.conn.execute(
            "UPDATE documents
             SET
                body = ?2,
                updated_at = (CAST(strftime('%s', 'now') AS INTEGER) * 1000)
             WHERE doc_id = ?1
               AND collection = ?3;",
            params![stored.doc_id.as_str(), body, collection.name()],
        )?;
        Ok(true)
    }
}

impl DocumentStore for SqliteDocumentStore<'_> {
    fn find_one(&self, collection: Collection, key: &str) -> StoreResult<Option<Document>> {
        Ok(self
            .load_one(collection, key)?
            .map(|stored| stored.project(Projection::IncludeIdentity)))
    }

    fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        projection: Projection,
    ) -> StoreResult<Vec<Document>> {
        if let Filter::Eq {
            field,
            value: Value::String(key),
        } = filter
        {
            if *field == collection.key_field() {
                return Ok(self
                    .load_one(collection, key)?
                    .map(|stored| stored.project(projection))
                    .into_iter()
                    .collect());
            }
        }

        Ok(self
            .load_all(collection)?
            .into_iter()
            .filter(|stored| filter.matches(&stored.body))
            .map(|stored| stored.project(projection))
            .collect())
    }

    fn insert_one(&self, collection: Collection, mut document: Document) -> StoreResult<DocumentId> {
        document.remove(IDENTITY_FIELD);
        let key_field = collection.key_field();
        let key = document
            .get(key_field)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                StoreError::InvalidDocument(format!(
                    "{collection} document requires string field `{key_field}`"
                ))
            })?
            .to_string();

        let doc_id = Uuid::new_v4();
        let body = serde_json::to_string(&document)?;
        let inserted = self.conn.execute(
            "INSERT INTO documents (
                doc_id,
                collection,
                doc_key,
                body
            ) VALUES (?1, ?2, ?3, ?4);",
            params![doc_id.to_string(), collection.name(), key.as_str(), body],
        );

        match inserted {
            Ok(_) => Ok(doc_id),
            Err(rusqlite::Error::SqliteFailure(failure, _))
                if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(StoreError::DuplicateKey { collection, key })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn update_one(
        &self,
        collection: Collection,
        key: &str,
        update: &Update,
    ) -> StoreResult<UpdateResult> {
        ensure_update_allowed(collection, update)?;
        let Some(mut stored) = self.load_one(collection, key)? else {
            return Ok(UpdateResult::default());
        };

        let modified = self.apply_and_write(collection, &mut stored, update)?;
        Ok(UpdateResult {
            matched: 1,
            modified: usize::from(modified),
        })
    }

    fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> StoreResult<UpdateResult> {
        ensure_update_allowed(collection, update)?;
        let mut result = UpdateResult::default();
        for mut stored in self.load_all(collection)? {
            if !filter.matches(&stored.body) {
                continue;
            }
            result.matched += 1;
            if self.apply_and_write(collection, &mut stored, update)? {
                result.modified += 1;
            }
        }
        Ok(result)
    }

    fn delete_one(&self, collection: Collection, key: &str) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM documents
             WHERE collection = ?1
               AND doc_key = ?2;",
            params![collection.name(), key],
        )?;
        Ok(changed > 0)
    }

    fn count(&self, collection: Collection) -> StoreResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1;",
            [collection.name()],
            |row| row.get(0),
        )?;
        usize::try_from(count)
            .map_err(|_| StoreError::InvalidDocument(format!("invalid document count {count}")))
    }
}

fn ensure_update_allowed(collection: Collection, update: &Update) -> StoreResult<()> {
    for field in [collection.key_field(), IDENTITY_FIELD] {
        if update.touches(field) {
            return Err(StoreError::InvalidDocument(format!(
                "updates must not modify `{field}` in {collection}"
            )));
        }
    }
    Ok(())
}

fn parse_document_row(row: &Row<'_>, collection: Collection) -> StoreResult<StoredDocument> {
    let doc_id: String = row.get("doc_id")?;
    let doc_key: String = row.get("doc_key")?;
    let body_text: String = row.get("body")?;

    let body = match serde_json::from_str::<Value>(&body_text)? {
        Value::Object(body) => body,
        other => {
            return Err(StoreError::InvalidDocument(format!(
                "document `{doc_id}` in {collection} is not an object: {other}"
            )));
        }
    };

    let key_field = collection.key_field();
    if body.get(key_field).and_then(Value::as_str) != Some(doc_key.as_str()) {
        return Err(StoreError::InvalidDocument(format!(
            "document `{doc_id}` in {collection} has `{key_field}` out of sync with key `{doc_key}`"
        )));
    }

    Ok(StoredDocument { doc_id, body })
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "documents")? {
        return Err(StoreError::MissingRequiredTable("documents"));
    }

    for column in REQUIRED_COLUMNS {
        if !table_has_column(conn, "documents", column)? {
            return Err(StoreError::MissingRequiredColumn {
                table: "documents",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
