//! HTTP handlers for the stamp API

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use stamp_core::{SigningRequest, Source};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::*;
use crate::state::AppState;
use crate::storage::{DOCUMENTS_DIR, SIGNATURES_DIR, SIGNED_DIR};
use crate::store;
use crate::validation::{validate_image_name, validate_pdf_name, validate_size};

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

/// Pull the named file field out of a multipart body. Other fields are skipped.
async fn read_upload(mut multipart: Multipart, field_name: &str) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(field_name) {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::InvalidRequest(format!("{} must be a file", field_name)))?;
        let bytes = field.bytes().await?.to_vec();
        return Ok(Upload { file_name, bytes });
    }
    Err(ApiError::InvalidRequest(format!(
        "Missing file field: {}",
        field_name
    )))
}

// Documents

/// Upload a source PDF
pub async fn create_document(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentResponse>), ApiError> {
    let upload = read_upload(multipart, "original_pdf").await?;
    validate_pdf_name(&upload.file_name)?;
    validate_size(upload.bytes.len(), state.max_upload_bytes)?;

    let file_size = upload.bytes.len() as i64;
    let (bytes, page_count) = tokio::task::spawn_blocking(move || {
        let pages = match stamp_core::page_count(&upload.bytes) {
            Ok(n) => n as i64,
            Err(e) => {
                tracing::warn!(error = %e, "Could not count pages of uploaded PDF");
                0
            }
        };
        (upload.bytes, pages)
    })
    .await?;

    let original_pdf = state
        .files
        .save(DOCUMENTS_DIR, &upload.file_name, &bytes)?;

    let doc = DbDocument {
        id: Uuid::new_v4().to_string(),
        original_pdf,
        file_size,
        page_count,
        created_at: Utc::now(),
    };
    store::insert_document(&state.db, &doc).await?;

    tracing::info!(id = %doc.id, pages = doc.page_count, "Stored document");
    Ok((StatusCode::CREATED, Json(doc.into())))
}

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    let docs = store::list_documents(&state.db).await?;
    Ok(Json(docs.into_iter().map(Into::into).collect()))
}

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let doc = store::get_document(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Document {}", id)))?;
    Ok(Json(doc.into()))
}

/// Delete a document, its file, and any signed documents made from it
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let doc = store::get_document(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Document {}", id)))?;

    for signed in store::signed_documents_referencing(&state.db, Some(id.as_str()), None).await? {
        remove_quietly(&state, &signed.signed_pdf);
    }
    remove_quietly(&state, &doc.original_pdf);
    store::delete_document(&state.db, &id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// Signatures

/// Upload a signature image
pub async fn create_signature(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SignatureResponse>), ApiError> {
    let upload = read_upload(multipart, "image_file").await?;
    validate_image_name(&upload.file_name)?;
    validate_size(upload.bytes.len(), state.max_upload_bytes)?;

    let image_file = state
        .files
        .save(SIGNATURES_DIR, &upload.file_name, &upload.bytes)?;

    let sig = DbSignature {
        id: Uuid::new_v4().to_string(),
        image_file,
        created_at: Utc::now(),
    };
    store::insert_signature(&state.db, &sig).await?;

    tracing::info!(id = %sig.id, "Stored signature");
    Ok((StatusCode::CREATED, Json(sig.into())))
}

pub async fn list_signatures(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SignatureResponse>>, ApiError> {
    let sigs = store::list_signatures(&state.db).await?;
    Ok(Json(sigs.into_iter().map(Into::into).collect()))
}

pub async fn get_signature(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SignatureResponse>, ApiError> {
    let sig = store::get_signature(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Signature {}", id)))?;
    Ok(Json(sig.into()))
}

pub async fn delete_signature(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let sig = store::get_signature(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Signature {}", id)))?;

    for signed in store::signed_documents_referencing(&state.db, None, Some(id.as_str())).await? {
        remove_quietly(&state, &signed.signed_pdf);
    }
    remove_quietly(&state, &sig.image_file);
    store::delete_signature(&state.db, &id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// Signed documents

/// Stamp a stored signature onto every page of a stored document
pub async fn create_signed_document(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSignedDocumentRequest>,
) -> Result<(StatusCode, Json<SignedDocumentResponse>), ApiError> {
    let doc = store::get_document(&state.db, &req.original_document)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Document {}", req.original_document)))?;
    let sig = store::get_signature(&state.db, &req.signature)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Signature {}", req.signature)))?;

    tracing::info!(
        document = %doc.id,
        signature = %sig.id,
        "Starting PDF signing"
    );

    let request = SigningRequest::new(
        Source::path(state.files.path(&doc.original_pdf)?),
        Source::path(state.files.path(&sig.image_file)?),
    )
    .with_position(req.position());

    let engine = Arc::clone(&state.engine);
    let signed = tokio::task::spawn_blocking(move || engine.sign(&request)).await??;

    let signed_pdf = state.files.save(
        SIGNED_DIR,
        &format!("signed_{}.pdf", doc.id),
        &signed.bytes,
    )?;

    let record = DbSignedDocument {
        id: Uuid::new_v4().to_string(),
        original_document: doc.id,
        signature: sig.id,
        signed_pdf,
        signed_at: Utc::now(),
    };
    if let Err(e) = store::insert_signed_document(&state.db, &record).await {
        remove_quietly(&state, &record.signed_pdf);
        return Err(e.into());
    }

    tracing::info!(id = %record.id, pages = signed.page_count, "Signed document created");
    Ok((StatusCode::CREATED, Json(record.into())))
}

pub async fn list_signed_documents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SignedDocumentResponse>>, ApiError> {
    let signed = store::list_signed_documents(&state.db).await?;
    Ok(Json(signed.into_iter().map(Into::into).collect()))
}

pub async fn get_signed_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SignedDocumentResponse>, ApiError> {
    let signed = store::get_signed_document(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Signed document {}", id)))?;
    Ok(Json(signed.into()))
}

pub async fn delete_signed_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let signed = store::get_signed_document(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Signed document {}", id)))?;
    remove_quietly(&state, &signed.signed_pdf);
    store::delete_signed_document(&state.db, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Download the stamped PDF as an attachment
pub async fn download_signed_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let signed = store::get_signed_document(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Signed document {}", id)))?;

    let bytes = match state.files.read(&signed.signed_pdf) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound("File".to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"signed_{}.pdf\"", signed.id),
            ),
        ],
        bytes,
    ))
}

fn remove_quietly(state: &AppState, relative: &str) {
    if let Err(e) = state.files.remove(relative) {
        tracing::warn!(path = relative, error = %e, "Failed to remove stored file");
    }
}
