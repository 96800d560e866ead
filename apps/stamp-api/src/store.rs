//! SQLite queries for documents, signatures and signed documents

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;

use crate::models::{DbDocument, DbSignature, DbSignedDocument};

/// Timestamps are stored as fixed-width RFC 3339 text so they compare lexically.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// Documents

pub async fn insert_document(pool: &SqlitePool, doc: &DbDocument) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO documents (id, original_pdf, file_size, page_count, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&doc.id)
    .bind(&doc.original_pdf)
    .bind(doc.file_size)
    .bind(doc.page_count)
    .bind(timestamp(doc.created_at))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_documents(pool: &SqlitePool) -> Result<Vec<DbDocument>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT id, original_pdf, file_size, page_count, created_at
        FROM documents
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn get_document(pool: &SqlitePool, id: &str) -> Result<Option<DbDocument>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT id, original_pdf, file_size, page_count, created_at
        FROM documents
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn delete_document(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM documents WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn expired_documents(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<DbDocument>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT id, original_pdf, file_size, page_count, created_at
        FROM documents
        WHERE created_at < ?
        "#,
    )
    .bind(timestamp(cutoff))
    .fetch_all(pool)
    .await
}

// Signatures

pub async fn insert_signature(pool: &SqlitePool, sig: &DbSignature) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO signatures (id, image_file, created_at) VALUES (?, ?, ?)")
        .bind(&sig.id)
        .bind(&sig.image_file)
        .bind(timestamp(sig.created_at))
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_signatures(pool: &SqlitePool) -> Result<Vec<DbSignature>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, image_file, created_at FROM signatures ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
}

pub async fn get_signature(pool: &SqlitePool, id: &str) -> Result<Option<DbSignature>, sqlx::Error> {
    sqlx::query_as("SELECT id, image_file, created_at FROM signatures WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn delete_signature(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM signatures WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn expired_signatures(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<DbSignature>, sqlx::Error> {
    sqlx::query_as("SELECT id, image_file, created_at FROM signatures WHERE created_at < ?")
        .bind(timestamp(cutoff))
        .fetch_all(pool)
        .await
}

// Signed documents

const SIGNED_COLUMNS: &str = "id, original_document, signature, signed_pdf, signed_at";

pub async fn insert_signed_document(
    pool: &SqlitePool,
    signed: &DbSignedDocument,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO signed_documents (id, original_document, signature, signed_pdf, signed_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&signed.id)
    .bind(&signed.original_document)
    .bind(&signed.signature)
    .bind(&signed.signed_pdf)
    .bind(timestamp(signed.signed_at))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_signed_documents(pool: &SqlitePool) -> Result<Vec<DbSignedDocument>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {} FROM signed_documents ORDER BY signed_at DESC",
        SIGNED_COLUMNS
    ))
    .fetch_all(pool)
    .await
}

pub async fn get_signed_document(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<DbSignedDocument>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {} FROM signed_documents WHERE id = ?",
        SIGNED_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn delete_signed_document(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM signed_documents WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Signed documents that reference a document or signature.
///
/// The foreign keys cascade on delete, so these rows disappear with their
/// parent. Callers fetch them first to remove the files they point at.
pub async fn signed_documents_referencing(
    pool: &SqlitePool,
    document: Option<&str>,
    signature: Option<&str>,
) -> Result<Vec<DbSignedDocument>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {} FROM signed_documents WHERE original_document = ? OR signature = ?",
        SIGNED_COLUMNS
    ))
    .bind(document)
    .bind(signature)
    .fetch_all(pool)
    .await
}

pub async fn expired_signed_documents(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<DbSignedDocument>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {} FROM signed_documents WHERE signed_at < ?",
        SIGNED_COLUMNS
    ))
    .bind(timestamp(cutoff))
    .fetch_all(pool)
    .await
}
