//! Seafresh API Library
//!
//! Backend for tracking seafood orders through a fixed multi-step
//! fulfillment workflow: role-gated status transitions, per-transition
//! evidence preconditions, an append-only audit trail, and realtime fan-out
//! to connected dashboards.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;
pub mod workflow;

use std::sync::Arc;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use serde::Serialize;

use crate::db::DbPool;
use crate::events::{EventSender, ObserverRegistry};
use crate::handlers::AppServices;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub event_sender: EventSender,
    pub observers: Arc<ObserverRegistry>,
    pub services: AppServices,
}

/// Common success envelope for API responses.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
        }
    }
}

/// All `/api/v1` routes.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new().nest("/orders", order_routes())
}

fn order_routes() -> Router<AppState> {
    use handlers::{activities, evidence, orders, ws};

    Router::new()
        .route("/", post(orders::create_order).get(orders::list_orders))
        .route("/permissions", get(orders::user_permissions))
        .route("/statistics", get(orders::order_statistics))
        .route("/ws", get(ws::order_updates_ws))
        .route("/:id", get(orders::get_order).delete(orders::delete_order))
        .route("/:id/status", patch(orders::update_order_status))
        .route("/:id/assignees", put(orders::update_assignees))
        .route(
            "/:id/evidence",
            post(evidence::upload_evidence).get(evidence::list_evidence),
        )
        .route("/:id/evidence/:evidence_id", axum::routing::delete(evidence::delete_evidence))
        .route("/:id/activities", get(activities::list_activities))
        .route("/:id/history", get(activities::list_status_history))
}
