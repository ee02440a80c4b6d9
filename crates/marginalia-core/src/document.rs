// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document model for the per-user record store.
//!
//! Documents are flat JSON objects addressed by slash-separated paths that
//! alternate collection and document ids, e.g. `users/u1/books/b1`. Every
//! path produced by this module lives under `users/<uid>/`, which keeps the
//! namespaces of different users disjoint.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::MarginaliaError;

/// Field map of a single document.
pub type Fields = Map<String, Value>;

/// Root collection holding one document per user.
pub const USERS: &str = "users";
/// Per-user collection of book documents.
pub const BOOKS: &str = "books";
/// Per-user collection of highlight documents.
pub const HIGHLIGHTS: &str = "highlights";
/// Per-user collection holding bookkeeping documents.
pub const META: &str = "meta";
/// Document id of the processing status inside [`META`].
pub const PROCESSING_STATUS: &str = "processing_status";

/// Address of a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath {
    segments: Vec<String>,
}

impl DocumentPath {
    /// Build a path from its segments.
    ///
    /// A document path has an even, non-zero number of segments; no segment
    /// may be empty or contain `/`.
    pub fn new<I, S>(segments: I) -> Result<Self, MarginaliaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.len() % 2 != 0 {
            return Err(MarginaliaError::Internal(format!(
                "document path needs collection/id pairs, got {} segment(s)",
                segments.len()
            )));
        }
        if let Some(bad) = segments.iter().find(|s| s.is_empty() || s.contains('/')) {
            return Err(MarginaliaError::Internal(format!(
                "invalid document path segment `{bad}`"
            )));
        }
        Ok(Self { segments })
    }

    /// Parse a slash-separated path such as `users/u1/books/b1`.
    pub fn parse(path: &str) -> Result<Self, MarginaliaError> {
        Self::new(path.split('/'))
    }

    /// `users/<uid>/books/<book_id>`
    pub fn book(user_id: &str, book_id: &str) -> Result<Self, MarginaliaError> {
        Self::new([USERS, user_id, BOOKS, book_id])
    }

    /// `users/<uid>/highlights/<highlight_id>`
    pub fn highlight(user_id: &str, highlight_id: &str) -> Result<Self, MarginaliaError> {
        Self::new([USERS, user_id, HIGHLIGHTS, highlight_id])
    }

    /// `users/<uid>/meta/processing_status`
    pub fn processing_status(user_id: &str) -> Result<Self, MarginaliaError> {
        Self::new([USERS, user_id, META, PROCESSING_STATUS])
    }

    /// The document id (last segment).
    pub fn id(&self) -> &str {
        // Construction guarantees at least two segments.
        &self.segments[self.segments.len() - 1]
    }

    /// Path of the collection containing this document.
    pub fn collection(&self) -> CollectionPath {
        CollectionPath(self.segments[..self.segments.len() - 1].join("/"))
    }

    /// Owning user when the path lives under `users/<uid>/`.
    pub fn user_id(&self) -> Option<&str> {
        match self.segments.as_slice() {
            [root, uid, ..] if root == USERS => Some(uid.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Address of a collection, e.g. `users/u1/highlights`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// `users/<uid>/books`
    pub fn books(user_id: &str) -> Self {
        Self(format!("{USERS}/{user_id}/{BOOKS}"))
    }

    /// `users/<uid>/highlights`
    pub fn highlights(user_id: &str) -> Self {
        Self(format!("{USERS}/{user_id}/{HIGHLIGHTS}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored document together with its address.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: DocumentPath,
    pub fields: Fields,
}

/// One write inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Field-merge upsert.
    ///
    /// `fields` overwrite the stored values; stored fields not named here
    /// survive. `defaults` are written only for fields the stored document
    /// does not have yet.
    Merge {
        path: DocumentPath,
        fields: Fields,
        defaults: Fields,
    },
    /// Full replace of the document.
    Set { path: DocumentPath, fields: Fields },
}

impl WriteOp {
    pub fn path(&self) -> &DocumentPath {
        match self {
            WriteOp::Merge { path, .. } | WriteOp::Set { path, .. } => path,
        }
    }

    /// Apply this write to the currently stored fields, returning the new document.
    pub fn apply(&self, existing: Option<Fields>) -> Fields {
        match self {
            WriteOp::Merge {
                fields, defaults, ..
            } => {
                let mut doc = existing.unwrap_or_default();
                merge_fields(&mut doc, fields, defaults);
                doc
            }
            WriteOp::Set { fields, .. } => fields.clone(),
        }
    }
}

/// Merge `fields` into `doc`, seeding `defaults` for keys `doc` lacks.
pub fn merge_fields(doc: &mut Fields, fields: &Fields, defaults: &Fields) {
    for (key, value) in defaults {
        doc.entry(key.clone()).or_insert_with(|| value.clone());
    }
    for (key, value) in fields {
        doc.insert(key.clone(), value.clone());
    }
}

/// Ordered set of writes applied atomically by a [`crate::DocumentStore`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    /// Queue a field-merge upsert.
    pub fn merge(&mut self, path: DocumentPath, fields: Fields) {
        self.merge_with_defaults(path, fields, Fields::new());
    }

    /// Queue a field-merge upsert that seeds `defaults` on first write.
    pub fn merge_with_defaults(&mut self, path: DocumentPath, fields: Fields, defaults: Fields) {
        self.ops.push(WriteOp::Merge {
            path,
            fields,
            defaults,
        });
    }

    /// Queue a full replace.
    pub fn set(&mut self, path: DocumentPath, fields: Fields) {
        self.ops.push(WriteOp::Set { path, fields });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

impl FromIterator<WriteOp> for WriteBatch {
    fn from_iter<T: IntoIterator<Item = WriteOp>>(iter: T) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

/// Serialize a record into a document field map.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields, MarginaliaError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(MarginaliaError::Internal(format!(
            "expected a JSON object for a document, got {other}"
        ))),
        Err(e) => Err(MarginaliaError::Internal(format!(
            "failed to serialize document: {e}"
        ))),
    }
}
