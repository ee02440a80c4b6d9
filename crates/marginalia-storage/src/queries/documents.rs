// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document read and batch write operations.

use marginalia_core::{CollectionPath, Document, DocumentPath, Fields, MarginaliaError, WriteBatch};
use rusqlite::{params, OptionalExtension};
use serde_json::Value;

use crate::database::{map_tr_err, Database};

/// Apply every write of `batch` inside one transaction.
///
/// Merges read the stored document inside the same transaction, so the
/// batch sees its own earlier writes. Any failure rolls back the whole batch.
pub async fn commit_batch(db: &Database, batch: WriteBatch) -> Result<(), MarginaliaError> {
    let ops: Vec<(String, String, marginalia_core::WriteOp)> = batch
        .into_ops()
        .into_iter()
        .map(|op| {
            let path = op.path();
            (path.collection().to_string(), path.id().to_string(), op)
        })
        .collect();
    let count = ops.len();

    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            {
                let mut select =
                    tx.prepare_cached("SELECT data FROM documents WHERE collection = ?1 AND doc_id = ?2")?;
                let mut upsert = tx.prepare_cached(
                    "INSERT INTO documents (collection, doc_id, data) VALUES (?1, ?2, ?3)
                     ON CONFLICT (collection, doc_id) DO UPDATE SET
                        data = excluded.data,
                        updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                )?;
                for (collection, doc_id, op) in &ops {
                    let existing: Option<Value> = select
                        .query_row(params![collection, doc_id], |row| row.get(0))
                        .optional()?;
                    let existing = existing.and_then(|v| match v {
                        Value::Object(map) => Some(map),
                        _ => None,
                    });
                    let doc = Value::Object(op.apply(existing));
                    upsert.execute(params![collection, doc_id, doc])?;
                }
            }
            // Dropping an uncommitted transaction rolls it back.
            tx.commit()
        })
        .await
        .map_err(|e| MarginaliaError::write(format!("batch of {count} write(s) was not applied"), e))
}

/// Read a single document.
pub async fn get_document(
    db: &Database,
    path: &DocumentPath,
) -> Result<Option<Fields>, MarginaliaError> {
    let collection = path.collection().to_string();
    let doc_id = path.id().to_string();
    let value = db
        .connection()
        .call(move |conn| -> Result<Option<Value>, rusqlite::Error> {
            conn.query_row(
                "SELECT data FROM documents WHERE collection = ?1 AND doc_id = ?2",
                params![collection, doc_id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;

    Ok(value.and_then(|v| match v {
        Value::Object(map) => Some(map),
        _ => None,
    }))
}

/// List every document directly inside a collection, ordered by id.
pub async fn list_documents(
    db: &Database,
    collection: &CollectionPath,
) -> Result<Vec<Document>, MarginaliaError> {
    let name = collection.to_string();
    let rows = db
        .connection()
        .call(move |conn| -> Result<Vec<(String, Value)>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT doc_id, data FROM documents WHERE collection = ?1 ORDER BY doc_id ASC",
            )?;
            stmt.query_map(params![name], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect()
        })
        .await
        .map_err(map_tr_err)?;

    rows.into_iter()
        .filter_map(|(doc_id, value)| match value {
            Value::Object(fields) => Some((doc_id, fields)),
            _ => None,
        })
        .map(|(doc_id, fields)| {
            Ok(Document {
                path: DocumentPath::parse(&format!("{collection}/{doc_id}"))?,
                fields,
            })
        })
        .collect()
}

/// Number of documents stored under `users/<uid>/`, across all collections.
pub async fn count_user_documents(db: &Database, user_id: &str) -> Result<i64, MarginaliaError> {
    let prefix = format!("users/{user_id}/");
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM documents WHERE substr(collection, 1, length(?1)) = ?1",
                params![prefix],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}
