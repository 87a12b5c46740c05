use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::workflow::EvidenceKind;
use crate::{ApiResponse, AppState};

use super::orders::resolve_order_id;

#[derive(Debug, Deserialize)]
pub struct EvidenceListQuery {
    pub kind: Option<EvidenceKind>,
}

/// Multipart upload with an `image` file part and an optional `image_type`
/// text part (`weighing`, `invoice` or `other`; defaults to `other`).
pub async fn upload_evidence(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ServiceError> {
    let order_id = resolve_order_id(&state, &id).await?;

    let mut kind = EvidenceKind::Other;
    let mut filename = String::new();
    let mut bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::ValidationError(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image_type") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
                kind = value.parse().map_err(|_| {
                    ServiceError::ValidationError(format!("Unknown image type '{}'", value))
                })?;
            }
            Some("image") => {
                filename = field.file_name().unwrap_or("upload.jpg").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
                bytes = Some(data.to_vec());
            }
            _ => {}
        }
    }

    let bytes = bytes.ok_or_else(|| {
        ServiceError::ValidationError("Missing 'image' field in upload".to_string())
    })?;

    let evidence = state
        .services
        .evidence
        .upload_evidence(order_id, kind, &filename, bytes, &user)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(evidence))))
}

pub async fn list_evidence(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<EvidenceListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let order_id = resolve_order_id(&state, &id).await?;
    let evidence = state
        .services
        .evidence
        .list_evidence(order_id, query.kind)
        .await?;
    Ok(Json(ApiResponse::success(evidence)))
}

pub async fn delete_evidence(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, evidence_id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, ServiceError> {
    let order_id = resolve_order_id(&state, &id).await?;
    state
        .services
        .evidence
        .delete_evidence(order_id, evidence_id, &user)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
