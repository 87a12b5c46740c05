use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::{ApiResponse, AppState};

use super::orders::resolve_order_id;

pub async fn list_activities(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let order_id = resolve_order_id(&state, &id).await?;
    // 404 for unknown orders rather than an empty log.
    state.services.order.get_order(order_id).await?;
    let activities = state.services.activity.list_activities(order_id).await?;
    Ok(Json(ApiResponse::success(activities)))
}

pub async fn list_status_history(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let order_id = resolve_order_id(&state, &id).await?;
    state.services.order.get_order(order_id).await?;
    let history = state.services.activity.list_status_history(order_id).await?;
    Ok(Json(ApiResponse::success(history)))
}
