//! Document filters, updates and projections.
//!
//! These mirror the small operator set the record layer needs from a
//! document database: equality and array-membership filters, `$set`,
//! `$addToSet` and `$pull` updates, and `_id` projection.

use crate::model::record::FlatRecord;
use serde_json::Value;
use uuid::Uuid;

use super::{StoreError, StoreResult};

/// One stored document: a flat record plus, when projected, `_id`.
pub type Document = FlatRecord;

/// Storage identity assigned on insert.
pub type DocumentId = Uuid;

/// Document selection predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every document in the collection.
    All,
    /// `field == value`. A missing field compares equal to `null`.
    Eq { field: &'static str, value: Value },
    /// Array `field` contains `value`.
    Contains { field: &'static str, value: Value },
}

impl Filter {
    pub fn eq(field: &'static str, value: impl Into<Value>) -> Self {
        Self::Eq {
            field,
            value: value.into(),
        }
    }

    pub fn contains(field: &'static str, value: impl Into<Value>) -> Self {
        Self::Contains {
            field,
            value: value.into(),
        }
    }

    /// Returns whether `document` is selected by this filter.
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Self::All => true,
            Self::Eq { field, value } => document.get(*field).unwrap_or(&Value::Null) == value,
            Self::Contains { field, value } => document
                .get(*field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value)),
        }
    }
}

/// Single-document mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Replace the listed fields, leave the rest untouched.
    Set(Document),
    /// Append `value` to array `field` unless already present.
    AddToSet { field: &'static str, value: Value },
    /// Remove every occurrence of `value` from array `field`.
    Pull { field: &'static str, value: Value },
}

impl Update {
    pub fn set_field(field: &'static str, value: impl Into<Value>) -> Self {
        let mut fields = Document::new();
        fields.insert(field.to_string(), value.into());
        Self::Set(fields)
    }

    pub fn add_to_set(field: &'static str, value: impl Into<Value>) -> Self {
        Self::AddToSet {
            field,
            value: value.into(),
        }
    }

    pub fn pull(field: &'static str, value: impl Into<Value>) -> Self {
        Self::Pull {
            field,
            value: value.into(),
        }
    }

    /// Returns whether this update writes `field`.
    pub fn touches(&self, field: &str) -> bool {
        match self {
            Self::Set(fields) => fields.contains_key(field),
            Self::AddToSet { field: target, .. } | Self::Pull { field: target, .. } => {
                *target == field
            }
        }
    }

    /// Applies the update in place and reports whether anything changed.
    ///
    /// `AddToSet` creates a missing array; `Pull` on a missing field is a
    /// no-op. Both reject a field holding a non-array value.
    pub fn apply(&self, document: &mut Document) -> StoreResult<bool> {
        match self {
            Self::Set(fields) => {
                let mut changed = false;
                for (field, value) in fields {
                    if document.get(field) != Some(value) {
                        document.insert(field.clone(), value.clone());
                        changed = true;
                    }
                }
                Ok(changed)
            }
            Self::AddToSet { field, value } => {
                let slot = document
                    .entry(field.to_string())
                    .or_insert_with(|| Value::Array(Vec::new()));
                let items = slot
                    .as_array_mut()
                    .ok_or_else(|| not_an_array(field))?;
                if items.contains(value) {
                    return Ok(false);
                }
                items.push(value.clone());
                Ok(true)
            }
            Self::Pull { field, value } => {
                let Some(slot) = document.get_mut(*field) else {
                    return Ok(false);
                };
                let items = slot.as_array_mut().ok_or_else(|| not_an_array(field))?;
                let before = items.len();
                items.retain(|item| item != value);
                Ok(items.len() != before)
            }
        }
    }
}

/// Whether read results carry the `_id` identity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    ExcludeIdentity,
    IncludeIdentity,
}

/// Counts reported by update operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateResult {
    /// Documents selected by the key or filter.
    pub matched: usize,
    /// Documents whose body actually changed.
    pub modified: usize,
}

fn not_an_array(field: &str) -> StoreError {
    StoreError::InvalidDocument(format!("field `{field}` is not an array"))
}
