//! Data models for the stamp API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Uploaded source PDF
#[derive(Debug, Clone, FromRow)]
pub struct DbDocument {
    pub id: String,
    /// Path relative to the storage root
    pub original_pdf: String,
    pub file_size: i64,
    pub page_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Uploaded signature image
#[derive(Debug, Clone, FromRow)]
pub struct DbSignature {
    pub id: String,
    pub image_file: String,
    pub created_at: DateTime<Utc>,
}

/// Result of stamping a signature onto a document
#[derive(Debug, Clone, FromRow)]
pub struct DbSignedDocument {
    pub id: String,
    pub original_document: String,
    pub signature: String,
    pub signed_pdf: String,
    pub signed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub id: String,
    pub original_pdf: String,
    pub file_size: i64,
    pub page_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<DbDocument> for DocumentResponse {
    fn from(doc: DbDocument) -> Self {
        Self {
            id: doc.id,
            original_pdf: doc.original_pdf,
            file_size: doc.file_size,
            page_count: doc.page_count,
            created_at: doc.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureResponse {
    pub id: String,
    pub image_file: String,
    pub created_at: DateTime<Utc>,
}

impl From<DbSignature> for SignatureResponse {
    fn from(sig: DbSignature) -> Self {
        Self {
            id: sig.id,
            image_file: sig.image_file,
            created_at: sig.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedDocumentResponse {
    pub id: String,
    pub original_document: String,
    pub signature: String,
    pub signed_pdf: String,
    pub download_url: String,
    pub signed_at: DateTime<Utc>,
}

impl From<DbSignedDocument> for SignedDocumentResponse {
    fn from(signed: DbSignedDocument) -> Self {
        Self {
            download_url: format!("/api/signed-documents/{}/download", signed.id),
            id: signed.id,
            original_document: signed.original_document,
            signature: signed.signature,
            signed_pdf: signed.signed_pdf,
            signed_at: signed.signed_at,
        }
    }
}

/// Request to sign a stored document with a stored signature
///
/// `position_x`/`position_y` are relative (0..1) and may arrive as numbers
/// or strings. Anything unusable falls back to the default placement.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSignedDocumentRequest {
    pub original_document: String,
    pub signature: String,
    #[serde(default)]
    pub position_x: Option<serde_json::Value>,
    #[serde(default)]
    pub position_y: Option<serde_json::Value>,
}

impl CreateSignedDocumentRequest {
    pub fn position(&self) -> Option<stamp_core::RelativePosition> {
        let x = self.position_x.as_ref().and_then(loose_number);
        let y = self.position_y.as_ref().and_then(loose_number);
        stamp_core::RelativePosition::from_form(x.as_deref(), y.as_deref())
    }
}

fn loose_number(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Outcome of one retention sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub signed_documents: usize,
    pub documents: usize,
    pub signatures: usize,
    pub files_removed: usize,
    pub cleanup_warnings: usize,
}
