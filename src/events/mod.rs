use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::{order, order_evidence};
use crate::workflow::OrderStatus;

pub mod broadcaster;

pub use broadcaster::ObserverRegistry;

/// Full order snapshot carried by order-level events so observers can render
/// the latest state without a re-fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub id: Uuid,
    pub order_number: String,
    pub order_name: Option<String>,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub status: OrderStatus,
    pub status_changed_at: DateTime<Utc>,
    pub deadline: Option<DateTime<Utc>>,
    pub delivery_time: DateTime<Utc>,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub chip_fee: Decimal,
    pub total: Decimal,
    pub notes: String,
    pub failure_reason: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl OrderSnapshot {
    pub fn from_model(model: &order::Model) -> Result<Self, sea_orm::DbErr> {
        Ok(Self {
            id: model.id,
            order_number: model.order_number.clone(),
            order_name: model.order_name.clone(),
            customer_name: model.customer_name.clone(),
            customer_phone: model.customer_phone.clone(),
            customer_address: model.customer_address.clone(),
            status: model.workflow_status()?,
            status_changed_at: model.status_changed_at,
            deadline: model.deadline,
            delivery_time: model.delivery_time,
            subtotal: model.subtotal,
            shipping_fee: model.shipping_fee,
            chip_fee: model.chip_fee,
            total: model.total,
            notes: model.notes.clone(),
            failure_reason: model.failure_reason.clone(),
            created_by: model.created_by,
            created_at: model.created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceSnapshot {
    pub id: Uuid,
    pub kind: String,
    pub storage_key: String,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<&order_evidence::Model> for EvidenceSnapshot {
    fn from(model: &order_evidence::Model) -> Self {
        Self {
            id: model.id,
            kind: model.kind.clone(),
            storage_key: model.storage_key.clone(),
            uploaded_by: model.uploaded_by,
            created_at: model.created_at,
        }
    }
}

/// Domain events published after each committed mutation. One message per
/// mutation, fanned out to every live observer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    #[serde(rename = "created")]
    OrderCreated { order: OrderSnapshot },
    #[serde(rename = "updated")]
    OrderUpdated { order: OrderSnapshot },
    #[serde(rename = "deleted")]
    OrderDeleted { order_id: Uuid },
    #[serde(rename = "status_changed")]
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
        order: OrderSnapshot,
    },
    #[serde(rename = "evidence_uploaded")]
    EvidenceUploaded {
        order_id: Uuid,
        evidence: EvidenceSnapshot,
    },
    #[serde(rename = "evidence_deleted")]
    EvidenceDeleted { order_id: Uuid, evidence_id: Uuid },
    #[serde(rename = "assignment_changed")]
    AssignmentChanged {
        order_id: Uuid,
        assigned_staff: Vec<Uuid>,
    },
}

impl Event {
    pub fn order_id(&self) -> Uuid {
        match self {
            Event::OrderCreated { order } | Event::OrderUpdated { order } => order.id,
            Event::OrderDeleted { order_id }
            | Event::OrderStatusChanged { order_id, .. }
            | Event::EvidenceUploaded { order_id, .. }
            | Event::EvidenceDeleted { order_id, .. }
            | Event::AssignmentChanged { order_id, .. } => *order_id,
        }
    }
}

/// Handle mutation paths use to hand a committed event to the fan-out
/// pipeline. Sending is best-effort; a full or closed channel must never
/// fail the mutation that produced the event.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel and forwards each event to the live observers.
/// Runs for the lifetime of the process; ends only when every sender is
/// dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, registry: Arc<ObserverRegistry>) {
    info!("Starting event fan-out loop");

    while let Some(event) = rx.recv().await {
        let delivered = registry.broadcast(&event);
        info!(
            order_id = %event.order_id(),
            observers = delivered,
            "Broadcast domain event"
        );
    }

    warn!("Event fan-out loop has ended");
}
