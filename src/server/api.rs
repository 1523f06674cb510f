//! HTTP handlers.

use super::error::ApiError;
use super::AppState;
use crate::extract;
use crate::record::LoanRecord;
use axum::extract::{Multipart, State};
use axum::Json;
use tracing::info;

/// The multipart form field carrying the uploaded document.
pub const UPLOAD_FIELD: &str = "image_file";

const ACCEPTED_TYPES: &str = "application/pdf, image/*";

/// Liveness probe.
pub async fn handle_health() -> &'static str {
    "OK"
}

/// `POST /api/extract-loan-details/` — extract loan terms from an uploaded
/// contract document.
///
/// Expects a multipart form with an `image_file` part whose content type is
/// `application/pdf` or `image/*`. Returns the normalized record as JSON.
pub async fn handle_extract_loan_details(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<LoanRecord>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let declared = field.content_type().map(str::to_owned).ok_or_else(|| {
            ApiError::BadRequest(format!(
                "Field '{UPLOAD_FIELD}' is missing a content type. Accepted types: {ACCEPTED_TYPES}."
            ))
        })?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {e}")))?;
        upload = Some((declared, bytes.to_vec()));
        break;
    }

    let (declared, bytes) = upload.ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Missing multipart field '{UPLOAD_FIELD}'. Accepted types: {ACCEPTED_TYPES}."
        ))
    })?;

    info!("received upload: {} bytes, declared type {declared}", bytes.len());

    let record = extract::extract(bytes, &declared, state.client.as_ref(), &state.config).await?;
    Ok(Json(record))
}
