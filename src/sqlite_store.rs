//! SQLite-backed [`Store`] implementation.
//!
//! Every [`DocumentWrite`] runs inside one transaction, so a document row,
//! its fact rows, their property rows, and the audit row become visible
//! together. WAL mode (see [`crate::db::connect`]) gives readers a
//! consistent snapshot while a batch is in flight.
//!
//! Timestamps are stored as Unix milliseconds, records as JSON text, and
//! embeddings as little-endian `f32` blobs.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use factstore_core::embedding::{blob_to_vec, vec_to_blob};
use factstore_core::models::{
    AuditRecord, ContextItem, Document, DocumentState, FactItem, FactQuery, Record,
};
use factstore_core::store::{DocumentWrite, Store, WriteOutcome};

const DOCUMENT_COLUMNS: &str = "id, source_type, title, url, metadata_json, full_text_blob, \
     content_hash, version, first_seen_at, last_extracted_at";

const FACT_COLUMNS: &str = "item_id, doc_id, domain, item_type, content_text, embedding, \
     properties_json, location_pointer";

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| anyhow!("timestamp out of range: {}", ms))
}

fn parse_record(json: &str, column: &str) -> Result<Record> {
    serde_json::from_str(json).with_context(|| format!("corrupt JSON in column {}", column))
}

fn sql_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn document_from_row(row: &SqliteRow) -> Result<Document> {
    let metadata_json: String = row.get("metadata_json");
    Ok(Document {
        id: row.get("id"),
        source_type: row.get("source_type"),
        title: row.get("title"),
        url: row.get("url"),
        metadata: parse_record(&metadata_json, "metadata_json")?,
        content: row.get("full_text_blob"),
        content_hash: row.get("content_hash"),
        version: row.get("version"),
        first_seen_at: from_millis(row.get("first_seen_at"))?,
        last_extracted_at: from_millis(row.get("last_extracted_at"))?,
    })
}

fn fact_from_row(row: &SqliteRow) -> Result<FactItem> {
    let embedding: Vec<u8> = row.get("embedding");
    let properties_json: String = row.get("properties_json");
    Ok(FactItem {
        id: row.get("item_id"),
        doc_id: row.get("doc_id"),
        domain: row.get("domain"),
        item_type: row.get("item_type"),
        content_text: row.get("content_text"),
        embedding: blob_to_vec(&embedding),
        properties: parse_record(&properties_json, "properties_json")?,
        location_pointer: row.get("location_pointer"),
    })
}

fn audit_from_row(row: &SqliteRow) -> Result<AuditRecord> {
    let change_type: String = row.get("change_type");
    Ok(AuditRecord {
        doc_id: row.get("doc_id"),
        change_type: change_type.parse()?,
        old_content_hash: row.get("old_content_hash"),
        new_content_hash: row.get("new_content_hash"),
        details: row.get("details"),
        timestamp: from_millis(row.get("changed_at"))?,
    })
}

async fn insert_facts(conn: &mut SqliteConnection, facts: &[FactItem]) -> Result<()> {
    for fact in facts {
        sqlx::query(&format!(
            "INSERT INTO fact_items ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            FACT_COLUMNS
        ))
        .bind(&fact.id)
        .bind(&fact.doc_id)
        .bind(&fact.domain)
        .bind(&fact.item_type)
        .bind(&fact.content_text)
        .bind(vec_to_blob(&fact.embedding))
        .bind(serde_json::to_string(&fact.properties)?)
        .bind(&fact.location_pointer)
        .execute(&mut *conn)
        .await?;

        for (key, value) in &fact.properties {
            sqlx::query("INSERT INTO fact_properties (item_id, key, value_json) VALUES (?, ?, ?)")
                .bind(&fact.id)
                .bind(key)
                .bind(serde_json::to_string(value)?)
                .execute(&mut *conn)
                .await?;
        }
    }
    Ok(())
}

async fn delete_facts(conn: &mut SqliteConnection, doc_id: &str) -> Result<u64> {
    sqlx::query(
        "DELETE FROM fact_properties WHERE item_id IN (SELECT item_id FROM fact_items WHERE doc_id = ?)",
    )
    .bind(doc_id)
    .execute(&mut *conn)
    .await?;

    let removed = sqlx::query("DELETE FROM fact_items WHERE doc_id = ?")
        .bind(doc_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    Ok(removed)
}

async fn insert_audit(conn: &mut SqliteConnection, record: &AuditRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_document_changes
            (doc_id, change_type, old_content_hash, new_content_hash, details, changed_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.doc_id)
    .bind(record.change_type.as_str())
    .bind(&record.old_content_hash)
    .bind(&record.new_content_hash)
    .bind(&record.details)
    .bind(record.timestamp.timestamp_millis())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[async_trait]
impl Store for SqliteStore {
    async fn document_state(&self, doc_id: &str) -> Result<Option<DocumentState>> {
        let row = sqlx::query(
            "SELECT content_hash, source_type, version FROM dim_documents WHERE id = ?",
        )
        .bind(doc_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| DocumentState {
            content_hash: row.get("content_hash"),
            source_type: row.get("source_type"),
            version: row.get("version"),
        }))
    }

    async fn apply(&self, write: &DocumentWrite) -> Result<WriteOutcome> {
        let mut tx = self.pool.begin().await?;

        match write {
            DocumentWrite::Create {
                document,
                facts,
                audit,
            } => {
                let inserted = sqlx::query(&format!(
                    "INSERT INTO dim_documents ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
                     ON CONFLICT(id) DO NOTHING",
                    DOCUMENT_COLUMNS
                ))
                .bind(&document.id)
                .bind(&document.source_type)
                .bind(&document.title)
                .bind(&document.url)
                .bind(serde_json::to_string(&document.metadata)?)
                .bind(&document.content)
                .bind(&document.content_hash)
                .bind(document.version)
                .bind(document.first_seen_at.timestamp_millis())
                .bind(document.last_extracted_at.timestamp_millis())
                .execute(&mut *tx)
                .await?
                .rows_affected();

                if inserted == 0 {
                    tx.rollback().await?;
                    return Ok(WriteOutcome::Conflict);
                }

                insert_facts(&mut tx, facts).await?;
                insert_audit(&mut tx, audit).await?;
                debug!(doc_id = %document.id, facts = facts.len(), "create batch written");
            }
            DocumentWrite::Update {
                revision,
                facts,
                audit,
            } => {
                let updated = sqlx::query(
                    r#"
                    UPDATE dim_documents SET
                        title = ?,
                        metadata_json = ?,
                        full_text_blob = ?,
                        content_hash = ?,
                        version = version + 1,
                        last_extracted_at = ?
                    WHERE id = ? AND version = ?
                    "#,
                )
                .bind(&revision.title)
                .bind(serde_json::to_string(&revision.metadata)?)
                .bind(&revision.content)
                .bind(&revision.content_hash)
                .bind(revision.extracted_at.timestamp_millis())
                .bind(&revision.doc_id)
                .bind(revision.expected_version)
                .execute(&mut *tx)
                .await?
                .rows_affected();

                if updated == 0 {
                    tx.rollback().await?;
                    return Ok(WriteOutcome::Conflict);
                }

                let removed = delete_facts(&mut tx, &revision.doc_id).await?;
                insert_facts(&mut tx, facts).await?;
                insert_audit(&mut tx, audit).await?;
                debug!(
                    doc_id = %revision.doc_id,
                    version = revision.new_version(),
                    removed,
                    inserted = facts.len(),
                    "update batch written"
                );
            }
            DocumentWrite::Touch { doc_id, at } => {
                let touched = sqlx::query("UPDATE dim_documents SET last_extracted_at = ? WHERE id = ?")
                    .bind(at.timestamp_millis())
                    .bind(doc_id)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();

                if touched == 0 {
                    tx.rollback().await?;
                    return Ok(WriteOutcome::Conflict);
                }
            }
        }

        tx.commit().await?;
        Ok(WriteOutcome::Applied)
    }

    async fn get_document(&self, doc_id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM dim_documents WHERE id = ?",
            DOCUMENT_COLUMNS
        ))
        .bind(doc_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(document_from_row).transpose()
    }

    async fn list_documents(
        &self,
        source_type: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Document>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM dim_documents", DOCUMENT_COLUMNS));
        if let Some(source_type) = source_type {
            qb.push(" WHERE source_type = ")
                .push_bind(source_type.to_string());
        }
        qb.push(" ORDER BY first_seen_at DESC, rowid DESC LIMIT ")
            .push_bind(sql_count(limit))
            .push(" OFFSET ")
            .push_bind(sql_count(offset));

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(document_from_row).collect()
    }

    async fn count_documents(&self, source_type: Option<&str>) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM dim_documents WHERE (? IS NULL OR source_type = ?)",
        )
        .bind(source_type)
        .bind(source_type)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn delete_document(&self, doc_id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let removed = delete_facts(&mut tx, doc_id).await?;
        let deleted = sqlx::query("DELETE FROM dim_documents WHERE id = ?")
            .bind(doc_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        debug!(doc_id, facts = removed, deleted, "delete batch written");
        Ok(deleted > 0)
    }

    async fn facts_for(&self, doc_id: &str) -> Result<Vec<FactItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM fact_items WHERE doc_id = ? ORDER BY rowid",
            FACT_COLUMNS
        ))
        .bind(doc_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(fact_from_row).collect()
    }

    async fn append_audit(&self, record: &AuditRecord) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        insert_audit(&mut conn, record).await
    }

    async fn audit_trail(&self, doc_id: &str) -> Result<Vec<AuditRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT doc_id, change_type, old_content_hash, new_content_hash, details, changed_at
            FROM audit_document_changes
            WHERE doc_id = ?
            ORDER BY changed_at ASC, id ASC
            "#,
        )
        .bind(doc_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(audit_from_row).collect()
    }

    async fn query_facts(&self, query: &FactQuery) -> Result<Vec<ContextItem>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT f.content_text, f.item_type, f.properties_json, f.location_pointer, \
             d.title, d.url \
             FROM fact_items f JOIN dim_documents d ON d.id = f.doc_id \
             WHERE 1 = 1",
        );
        if let Some(domain) = &query.domain {
            qb.push(" AND f.domain = ").push_bind(domain.clone());
        }
        for (key, value) in &query.filters {
            qb.push(
                " AND EXISTS (SELECT 1 FROM fact_properties p \
                 WHERE p.item_id = f.item_id AND p.key = ",
            )
            .push_bind(key.clone())
            .push(" AND p.value_json = ")
            .push_bind(serde_json::to_string(value)?)
            .push(")");
        }
        qb.push(" ORDER BY f.rowid LIMIT ")
            .push_bind(sql_count(query.limit));

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| -> Result<ContextItem> {
                let properties_json: String = row.get("properties_json");
                Ok(ContextItem {
                    content_text: row.get("content_text"),
                    item_type: row.get("item_type"),
                    properties: parse_record(&properties_json, "properties_json")?,
                    location_pointer: row.get("location_pointer"),
                    document_title: row.get("title"),
                    document_url: row.get("url"),
                })
            })
            .collect()
    }
}
