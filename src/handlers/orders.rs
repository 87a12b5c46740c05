use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::services::orders::{
    CreateOrderRequest, OrderFilter, UpdateAssigneesRequest, UpdateOrderStatusRequest,
};
use crate::{ApiResponse, AppState};

/// Resolves an order identifier that may be a UUID or an order_number
/// string like `DH202608070042`.
pub(crate) async fn resolve_order_id(state: &AppState, id: &str) -> Result<Uuid, ServiceError> {
    if let Ok(uuid) = Uuid::parse_str(id) {
        return Ok(uuid);
    }
    if let Some(uuid) = state.services.order.find_order_id_by_order_number(id).await? {
        return Ok(uuid);
    }
    Err(ServiceError::NotFound(format!(
        "Order with ID {} not found",
        id
    )))
}

pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.order.create_order(request, &user).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<OrderFilter>,
) -> Result<impl IntoResponse, ServiceError> {
    let orders = state.services.order.list_orders(filter, &user).await?;
    Ok(Json(ApiResponse::success(orders)))
}

pub async fn get_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let order_id = resolve_order_id(&state, &id).await?;
    let order = state.services.order.get_order(order_id).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order_id = resolve_order_id(&state, &id).await?;
    let order = state
        .services
        .order
        .update_order_status(order_id, request, &user)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn update_assignees(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateAssigneesRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order_id = resolve_order_id(&state, &id).await?;
    let order = state
        .services
        .order
        .update_assignment(order_id, request, &user)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn delete_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let order_id = resolve_order_id(&state, &id).await?;
    state.services.order.delete_order(order_id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn order_statistics(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let stats = state.services.order.statistics().await?;
    Ok(Json(ApiResponse::success(stats)))
}

pub async fn user_permissions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let permissions = state.services.order.permissions(&user);
    Ok(Json(ApiResponse::success(permissions)))
}
