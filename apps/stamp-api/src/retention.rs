//! Retention sweep: deletes records older than the configured age with their files

use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::SweepReport;
use crate::state::AppState;
use crate::store;

/// Remove a stored file, counting failures instead of aborting the sweep.
fn remove_file(state: &AppState, relative: &str, report: &mut SweepReport) {
    match state.files.remove(relative) {
        Ok(true) => report.files_removed += 1,
        Ok(false) => {}
        Err(e) => {
            tracing::warn!(path = relative, error = %e, "Failed to remove expired file");
            report.cleanup_warnings += 1;
        }
    }
}

/// Delete everything older than `max_age`.
///
/// Signed documents go first so their files are removed before the cascade
/// from an expired document or signature would drop the rows.
pub async fn sweep(state: &AppState, max_age: Duration) -> Result<SweepReport, ApiError> {
    let cutoff = Utc::now() - max_age;
    let mut report = SweepReport::default();

    for signed in store::expired_signed_documents(&state.db, cutoff).await? {
        remove_file(state, &signed.signed_pdf, &mut report);
        if store::delete_signed_document(&state.db, &signed.id).await? {
            report.signed_documents += 1;
        }
    }

    for doc in store::expired_documents(&state.db, cutoff).await? {
        for signed in store::signed_documents_referencing(&state.db, Some(doc.id.as_str()), None).await? {
            remove_file(state, &signed.signed_pdf, &mut report);
            report.signed_documents += 1;
        }
        remove_file(state, &doc.original_pdf, &mut report);
        if store::delete_document(&state.db, &doc.id).await? {
            report.documents += 1;
        }
    }

    for sig in store::expired_signatures(&state.db, cutoff).await? {
        for signed in store::signed_documents_referencing(&state.db, None, Some(sig.id.as_str())).await? {
            remove_file(state, &signed.signed_pdf, &mut report);
            report.signed_documents += 1;
        }
        remove_file(state, &sig.image_file, &mut report);
        if store::delete_signature(&state.db, &sig.id).await? {
            report.signatures += 1;
        }
    }

    tracing::info!(
        signed_documents = report.signed_documents,
        documents = report.documents,
        signatures = report.signatures,
        files_removed = report.files_removed,
        cleanup_warnings = report.cleanup_warnings,
        "Retention sweep complete"
    );

    Ok(report)
}

/// Run [`sweep`] on a fixed interval until the runtime shuts down.
pub fn spawn_sweeper(
    state: Arc<AppState>,
    max_age: Duration,
    every: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = sweep(&state, max_age).await {
                tracing::error!(error = %e, "Retention sweep failed");
            }
        }
    })
}
