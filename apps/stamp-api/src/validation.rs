//! Upload validation

use crate::error::ApiError;

pub const PDF_EXTENSIONS: &[&str] = &["pdf"];
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp"];

fn extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

fn check_extension(file_name: &str, allowed: &[&str], kind: &str) -> Result<(), ApiError> {
    match extension(file_name) {
        Some(ext) if allowed.contains(&ext.as_str()) => Ok(()),
        _ => Err(ApiError::InvalidRequest(format!(
            "{} must have one of the extensions: {}",
            kind,
            allowed.join(", ")
        ))),
    }
}

pub fn validate_pdf_name(file_name: &str) -> Result<(), ApiError> {
    check_extension(file_name, PDF_EXTENSIONS, "Document")
}

pub fn validate_image_name(file_name: &str) -> Result<(), ApiError> {
    check_extension(file_name, IMAGE_EXTENSIONS, "Signature image")
}

pub fn validate_size(len: usize, max: usize) -> Result<(), ApiError> {
    if len == 0 {
        return Err(ApiError::InvalidRequest("Uploaded file is empty".into()));
    }
    if len > max {
        return Err(ApiError::InvalidRequest(format!(
            "File size cannot exceed {} MB",
            max / (1024 * 1024)
        )));
    }
    Ok(())
}
