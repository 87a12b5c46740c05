use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::entities::order::{self, Entity as OrderEntity, Model as OrderModel};
use crate::entities::order_activity::ActivityType;
use crate::entities::order_assignee::{self, Entity as AssigneeEntity};
use crate::entities::order_evidence::{self, Entity as EvidenceEntity};
use crate::entities::order_item::{self, Entity as OrderItemEntity, Model as OrderItemModel};
use crate::entities::order_status_history::{self, Entity as HistoryEntity};
use crate::entities::order_activity::Entity as ActivityEntity;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender, OrderSnapshot};
use crate::services::activity::log_activity;
use crate::services::catalog::ProductCatalogService;
use crate::services::evidence::existing_kinds;
use crate::services::order_number::generate_order_number;
use crate::services::staff::{StaffBrief, StaffDirectory};
use crate::services::storage::EvidenceStorage;
use crate::workflow::{validate_transition, OrderStatus, StaffRole};

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(0|\+84)[1-9][0-9]{8,9}$").expect("valid phone regex"));

fn validate_phone(phone: &str) -> Result<(), validator::ValidationError> {
    if PHONE_PATTERN.is_match(phone) {
        Ok(())
    } else {
        let mut err = validator::ValidationError::new("phone");
        err.message = Some("Số điện thoại không hợp lệ".into());
        Err(err)
    }
}

/// One line of a new order. Quantity and price bounds are checked in
/// [`OrderService::create_order`] because `validator` cannot range-check
/// decimals.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderItemInput {
    pub product_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub product_name: String,
    pub quantity: Decimal,
    #[validate(length(min = 1, max = 50))]
    pub unit: String,
    pub price: Decimal,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 255))]
    pub order_name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub customer_name: String,
    #[validate(custom = "validate_phone")]
    pub customer_phone: String,
    #[validate(length(min = 1))]
    pub customer_address: String,
    #[validate(length(min = 1, message = "Đơn hàng phải có ít nhất 1 sản phẩm"))]
    pub items: Vec<OrderItemInput>,
    #[serde(default)]
    pub shipping_fee: Decimal,
    #[serde(default)]
    pub chip_fee: Decimal,
    pub delivery_time: DateTime<Utc>,
    #[serde(default)]
    pub assigned_to_ids: Vec<Uuid>,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub new_status: OrderStatus,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAssigneesRequest {
    pub assigned_to_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub assigned_to_me: bool,
    pub search: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl OrderFilter {
    fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    fn page_size(&self) -> u64 {
        self.page_size.unwrap_or(20).clamp(1, 100)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub price: Decimal,
    pub total: Decimal,
    pub note: String,
}

impl From<&OrderItemModel> for OrderItemResponse {
    fn from(model: &OrderItemModel) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            product_name: model.product_name.clone(),
            quantity: model.quantity,
            unit: model.unit.clone(),
            price: model.price,
            total: model.total,
            note: model.note.clone(),
        }
    }
}

/// Compact row for the list view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
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
    pub total: Decimal,
    pub assigned_to: Vec<StaffBrief>,
    pub items_count: u64,
    pub evidence_count: u64,
    pub is_overdue: bool,
    pub remaining_minutes: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceBrief {
    pub id: Uuid,
    pub kind: String,
    pub url: String,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryResponse {
    pub id: Uuid,
    pub from_status: String,
    pub to_status: String,
    pub changed_by: Uuid,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetailResponse {
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
    pub items: Vec<OrderItemResponse>,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub chip_fee: Decimal,
    pub total: Decimal,
    pub assigned_to: Vec<StaffBrief>,
    pub created_by: Uuid,
    pub evidence: Vec<EvidenceBrief>,
    pub status_history: Vec<StatusHistoryResponse>,
    pub notes: String,
    pub failure_reason: Option<String>,
    pub is_overdue: bool,
    pub remaining_minutes: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderSummary>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderStatistics {
    pub total: u64,
    pub by_status: HashMap<String, u64>,
    pub completed: u64,
    pub failed: u64,
    pub in_progress: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PermissionsResponse {
    pub role: StaffRole,
    pub role_label: String,
    pub allowed_statuses: Vec<OrderStatus>,
    pub can_create_order: bool,
}

/// Derived money fields for a set of line inputs.
pub fn compute_totals(
    items: &[OrderItemInput],
    shipping_fee: Decimal,
    chip_fee: Decimal,
) -> (Decimal, Decimal) {
    let subtotal: Decimal = items.iter().map(|item| item.quantity * item.price).sum();
    (subtotal, subtotal + shipping_fee + chip_fee)
}

/// The order aggregate: creation, the atomic status transition, assignment
/// replacement, destructive deletion, and the read surface.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    staff: StaffDirectory,
    catalog: ProductCatalogService,
    storage: Arc<dyn EvidenceStorage>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(
        db: Arc<DbPool>,
        staff: StaffDirectory,
        catalog: ProductCatalogService,
        storage: Arc<dyn EvidenceStorage>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db,
            staff,
            catalog,
            storage,
            event_sender,
        }
    }

    /// Creates a new order with its line items, computed totals, initial
    /// deadline, and optional assignees, in one transaction.
    #[instrument(skip(self, request), fields(actor = %actor.staff_id, customer = %request.customer_name))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
        actor: &AuthUser,
    ) -> Result<OrderDetailResponse, ServiceError> {
        request.validate().map_err(ServiceError::from)?;
        for item in &request.items {
            item.validate().map_err(ServiceError::from)?;
        }
        validate_item_amounts(&request.items)?;
        validate_fee(request.shipping_fee, "Phí ship")?;
        validate_fee(request.chip_fee, "Phí chip")?;

        if !actor.role.can_create_order() {
            return Err(ServiceError::AuthorizationError(format!(
                "Vai trò '{}' không được phép tạo đơn hàng",
                actor.role.label()
            )));
        }

        // Catalog references must resolve before anything is written.
        for item in &request.items {
            if let Some(product_id) = item.product_id {
                if self.catalog.find(product_id).await?.is_none() {
                    return Err(ServiceError::ValidationError(format!(
                        "Product with ID {} not found",
                        product_id
                    )));
                }
            }
        }

        let assignees = self.staff.require_all(&request.assigned_to_ids).await?;

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let (subtotal, total) = compute_totals(&request.items, request.shipping_fee, request.chip_fee);

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::from(e)
        })?;

        let order_number = generate_order_number(&txn, now).await?;

        let order_model = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number.clone()),
            order_name: Set(request.order_name.clone()),
            customer_name: Set(request.customer_name.clone()),
            customer_phone: Set(request.customer_phone.clone()),
            customer_address: Set(request.customer_address.clone()),
            status: Set(OrderStatus::Created.to_string()),
            status_changed_at: Set(now),
            deadline: Set(OrderStatus::Created.deadline_from(now)),
            delivery_time: Set(request.delivery_time),
            subtotal: Set(subtotal),
            shipping_fee: Set(request.shipping_fee),
            chip_fee: Set(request.chip_fee),
            total: Set(total),
            created_by: Set(actor.staff_id),
            notes: Set(request.notes.clone()),
            failure_reason: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            version: Set(1),
        }
        .insert(&txn)
        .await?;

        for item in &request.items {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                product_name: Set(item.product_name.clone()),
                quantity: Set(item.quantity),
                unit: Set(item.unit.clone()),
                price: Set(item.price),
                total: Set(item.quantity * item.price),
                note: Set(item.note.clone()),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        for staff in &assignees {
            order_assignee::ActiveModel {
                order_id: Set(order_id),
                staff_id: Set(staff.id),
            }
            .insert(&txn)
            .await?;
        }

        log_activity(
            &txn,
            order_id,
            Some(actor.staff_id),
            ActivityType::Created,
            format!(
                "Tạo đơn hàng #{} cho khách hàng {}",
                order_number, request.customer_name
            ),
            None,
            None,
            Some(json!({
                "customer_name": request.customer_name,
                "customer_phone": request.customer_phone,
                "total": total,
            })),
        )
        .await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit order creation");
            ServiceError::from(e)
        })?;

        info!(order_id = %order_id, order_number = %order_number, "Order created");

        if let Some(event_sender) = &self.event_sender {
            match OrderSnapshot::from_model(&order_model) {
                Ok(snapshot) => {
                    if let Err(e) = event_sender.send(Event::OrderCreated { order: snapshot }).await
                    {
                        warn!(error = %e, order_id = %order_id, "Failed to send order created event");
                    }
                }
                Err(e) => warn!(error = %e, "Failed to snapshot order for event"),
            }
        }

        self.get_order(order_id).await
    }

    /// Applies a validated status transition atomically: role policy, then
    /// transition validation against the freshly-read row, then the status
    /// mutation plus exactly one history entry and one activity entry, all
    /// in one transaction guarded by the order's version counter.
    #[instrument(skip(self, request), fields(order_id = %order_id, new_status = %request.new_status, actor = %actor.staff_id))]
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        request: UpdateOrderStatusRequest,
        actor: &AuthUser,
    ) -> Result<OrderDetailResponse, ServiceError> {
        let new_status = request.new_status;

        let reason = match request.failure_reason.as_deref().map(str::trim) {
            Some("") | None if new_status == OrderStatus::Failed => {
                return Err(ServiceError::ValidationError(
                    "Phải nhập lý do khi đánh dấu thất bại".to_string(),
                ));
            }
            reason => reason.map(str::to_string),
        };

        // Version-guarded write: a concurrent winner bumps the version, our
        // update hits zero rows, and the whole check runs again against the
        // committed state.
        const MAX_CONFLICT_RETRIES: usize = 3;
        for attempt in 0..MAX_CONFLICT_RETRIES {
            match self
                .try_apply_transition(order_id, new_status, reason.clone(), actor)
                .await?
            {
                Some(updated) => {
                    if let Some(event_sender) = &self.event_sender {
                        match OrderSnapshot::from_model(&updated.model) {
                            Ok(snapshot) => {
                                let event = Event::OrderStatusChanged {
                                    order_id,
                                    old_status: updated.old_status,
                                    new_status,
                                    order: snapshot,
                                };
                                if let Err(e) = event_sender.send(event).await {
                                    warn!(error = %e, order_id = %order_id, "Failed to send status changed event");
                                }
                            }
                            Err(e) => warn!(error = %e, "Failed to snapshot order for event"),
                        }
                    }
                    return self.get_order(order_id).await;
                }
                None => {
                    warn!(
                        order_id = %order_id,
                        attempt = attempt + 1,
                        "Concurrent status change detected, re-validating"
                    );
                }
            }
        }

        Err(ServiceError::InternalError(format!(
            "Order {} kept changing concurrently, giving up",
            order_id
        )))
    }

    /// One transition attempt. Returns `Ok(None)` when a concurrent writer
    /// invalidated the read, `Ok(Some(..))` once the transition committed.
    async fn try_apply_transition(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        reason: Option<String>,
        actor: &AuthUser,
    ) -> Result<Option<AppliedTransition>, ServiceError> {
        let txn = self.db.begin().await?;

        let current = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order with ID {} not found", order_id))
            })?;

        let old_status = current.workflow_status()?;

        if !actor.role.can_transition(old_status, new_status) {
            let allowed: Vec<String> = actor
                .role
                .allowed_statuses()
                .iter()
                .map(|s| s.to_string())
                .collect();
            return Err(ServiceError::AuthorizationError(format!(
                "Bạn không có quyền chuyển đơn từ '{}' sang '{}'. \
                 Vai trò của bạn chỉ được phép làm các giai đoạn: {}",
                old_status,
                new_status,
                allowed.join(", ")
            )));
        }

        let evidence = existing_kinds(&txn, order_id).await?;
        validate_transition(old_status, new_status, &evidence)?;

        let now = Utc::now();
        let failure_reason = if new_status == OrderStatus::Failed {
            reason.clone()
        } else {
            None
        };

        let patch = order::ActiveModel {
            status: Set(new_status.to_string()),
            status_changed_at: Set(now),
            deadline: Set(new_status.deadline_from(now)),
            failure_reason: Set(failure_reason),
            updated_at: Set(Some(now)),
            version: Set(current.version + 1),
            ..Default::default()
        };

        let update = OrderEntity::update_many()
            .set(patch)
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Version.eq(current.version))
            .exec(&txn)
            .await?;

        if update.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        order_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            from_status: Set(old_status.to_string()),
            to_status: Set(new_status.to_string()),
            changed_by: Set(actor.staff_id),
            notes: Set(reason.clone()),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        log_activity(
            &txn,
            order_id,
            Some(actor.staff_id),
            ActivityType::StatusChange,
            format!(
                "Chuyển trạng thái từ '{}' sang '{}'",
                old_status.label(),
                new_status.label()
            ),
            Some(old_status.to_string()),
            Some(new_status.to_string()),
            Some(json!({ "reason": reason })),
        )
        .await?;

        txn.commit().await?;

        info!(
            order_id = %order_id,
            old_status = %old_status,
            new_status = %new_status,
            "Order status updated"
        );

        let model = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!("Order {} vanished after update", order_id))
            })?;

        Ok(Some(AppliedTransition { old_status, model }))
    }

    /// Replaces the assigned-staff set wholesale. Every id must exist; no
    /// partial assignment is ever applied.
    #[instrument(skip(self, request), fields(order_id = %order_id, actor = %actor.staff_id))]
    pub async fn update_assignment(
        &self,
        order_id: Uuid,
        request: UpdateAssigneesRequest,
        actor: &AuthUser,
    ) -> Result<OrderDetailResponse, ServiceError> {
        if request.assigned_to_ids.is_empty() {
            return Err(ServiceError::ValidationError(
                "Phải chọn ít nhất 1 nhân viên phụ trách".to_string(),
            ));
        }

        let mut new_ids = request.assigned_to_ids.clone();
        new_ids.sort();
        new_ids.dedup();
        self.staff.require_all(&new_ids).await?;

        OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order with ID {} not found", order_id))
            })?;

        let txn = self.db.begin().await?;

        let old_ids: Vec<Uuid> = AssigneeEntity::find()
            .filter(order_assignee::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|a| a.staff_id)
            .collect();

        AssigneeEntity::delete_many()
            .filter(order_assignee::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;

        for staff_id in &new_ids {
            order_assignee::ActiveModel {
                order_id: Set(order_id),
                staff_id: Set(*staff_id),
            }
            .insert(&txn)
            .await?;
        }

        log_activity(
            &txn,
            order_id,
            Some(actor.staff_id),
            ActivityType::AssignmentChanged,
            "Cập nhật phân công nhân viên".to_string(),
            Some(join_ids(&old_ids)),
            Some(join_ids(&new_ids)),
            Some(json!({ "assigned_to": new_ids })),
        )
        .await?;

        txn.commit().await?;

        if let Some(event_sender) = &self.event_sender {
            let event = Event::AssignmentChanged {
                order_id,
                assigned_staff: new_ids.clone(),
            };
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, order_id = %order_id, "Failed to send assignment changed event");
            }
        }

        self.get_order(order_id).await
    }

    /// Destructive, irreversible delete of the aggregate and everything
    /// hanging off it.
    #[instrument(skip(self), fields(order_id = %order_id, actor = %actor.staff_id))]
    pub async fn delete_order(&self, order_id: Uuid, actor: &AuthUser) -> Result<(), ServiceError> {
        OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order with ID {} not found", order_id))
            })?;

        let txn = self.db.begin().await?;

        OrderItemEntity::delete_many()
            .filter(order_item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        EvidenceEntity::delete_many()
            .filter(order_evidence::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        HistoryEntity::delete_many()
            .filter(order_status_history::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        ActivityEntity::delete_many()
            .filter(crate::entities::order_activity::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        AssigneeEntity::delete_many()
            .filter(order_assignee::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        OrderEntity::delete_by_id(order_id).exec(&txn).await?;

        txn.commit().await?;

        info!(order_id = %order_id, "Order deleted");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::OrderDeleted { order_id }).await {
                warn!(error = %e, order_id = %order_id, "Failed to send order deleted event");
            }
        }

        Ok(())
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderDetailResponse, ServiceError> {
        let model = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order with ID {} not found", order_id))
            })?;

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let evidence = EvidenceEntity::find()
            .filter(order_evidence::Column::OrderId.eq(order_id))
            .order_by_desc(order_evidence::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let history = HistoryEntity::find()
            .filter(order_status_history::Column::OrderId.eq(order_id))
            .order_by_desc(order_status_history::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let assignee_ids: Vec<Uuid> = AssigneeEntity::find()
            .filter(order_assignee::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|a| a.staff_id)
            .collect();
        let assigned_to = self.staff.briefs(&assignee_ids).await?;

        self.to_detail(model, items, evidence, history, assigned_to)
    }

    #[instrument(skip(self), fields(order_number = %order_number))]
    pub async fn find_order_id_by_order_number(
        &self,
        order_number: &str,
    ) -> Result<Option<Uuid>, ServiceError> {
        let order = OrderEntity::find()
            .filter(order::Column::OrderNumber.eq(order_number))
            .one(&*self.db)
            .await?;
        Ok(order.map(|o| o.id))
    }

    #[instrument(skip(self, filter), fields(actor = %actor.staff_id))]
    pub async fn list_orders(
        &self,
        filter: OrderFilter,
        actor: &AuthUser,
    ) -> Result<OrderListResponse, ServiceError> {
        let mut query = OrderEntity::find().order_by_desc(order::Column::CreatedAt);

        if let Some(status) = filter.status {
            query = query.filter(order::Column::Status.eq(status.to_string()));
        }

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(order::Column::OrderNumber.contains(search))
                    .add(order::Column::OrderName.contains(search))
                    .add(order::Column::CustomerName.contains(search))
                    .add(order::Column::CustomerPhone.contains(search)),
            );
        }

        if let Some(from) = filter.date_from {
            query = query.filter(order::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.date_to {
            query = query.filter(order::Column::CreatedAt.lte(to));
        }

        if filter.assigned_to_me {
            let my_orders: Vec<Uuid> = AssigneeEntity::find()
                .filter(order_assignee::Column::StaffId.eq(actor.staff_id))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|a| a.order_id)
                .collect();
            query = query.filter(order::Column::Id.is_in(my_orders));
        }

        let page = filter.page();
        let page_size = filter.page_size();
        let paginator = query.paginate(&*self.db, page_size);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await?;

        let now = Utc::now();
        let mut summaries = Vec::with_capacity(orders.len());
        for model in &orders {
            let items_count = OrderItemEntity::find()
                .filter(order_item::Column::OrderId.eq(model.id))
                .count(&*self.db)
                .await?;
            let evidence_count = EvidenceEntity::find()
                .filter(order_evidence::Column::OrderId.eq(model.id))
                .count(&*self.db)
                .await?;
            let assignee_ids: Vec<Uuid> = AssigneeEntity::find()
                .filter(order_assignee::Column::OrderId.eq(model.id))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|a| a.staff_id)
                .collect();
            let assigned_to = self.staff.briefs(&assignee_ids).await?;

            summaries.push(OrderSummary {
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
                total: model.total,
                assigned_to,
                items_count,
                evidence_count,
                is_overdue: model.is_overdue(now),
                remaining_minutes: model.remaining_minutes(now),
                created_at: model.created_at,
            });
        }

        Ok(OrderListResponse {
            orders: summaries,
            total,
            page,
            page_size,
        })
    }

    #[instrument(skip(self))]
    pub async fn statistics(&self) -> Result<OrderStatistics, ServiceError> {
        use sea_orm::QuerySelect;

        let rows: Vec<(String, i64)> = OrderEntity::find()
            .select_only()
            .column(order::Column::Status)
            .column_as(order::Column::Id.count(), "count")
            .group_by(order::Column::Status)
            .into_tuple()
            .all(&*self.db)
            .await?;

        let by_status: HashMap<String, u64> = rows
            .into_iter()
            .map(|(status, count)| (status, count as u64))
            .collect();

        let total: u64 = by_status.values().sum();
        let completed = *by_status
            .get(&OrderStatus::Completed.to_string())
            .unwrap_or(&0);
        let failed = *by_status
            .get(&OrderStatus::Failed.to_string())
            .unwrap_or(&0);

        Ok(OrderStatistics {
            total,
            in_progress: total - completed - failed,
            by_status,
            completed,
            failed,
        })
    }

    pub fn permissions(&self, actor: &AuthUser) -> PermissionsResponse {
        PermissionsResponse {
            role: actor.role,
            role_label: actor.role.label().to_string(),
            allowed_statuses: actor.role.allowed_statuses(),
            can_create_order: actor.role.can_create_order(),
        }
    }

    fn to_detail(
        &self,
        model: OrderModel,
        items: Vec<OrderItemModel>,
        evidence: Vec<order_evidence::Model>,
        history: Vec<order_status_history::Model>,
        assigned_to: Vec<StaffBrief>,
    ) -> Result<OrderDetailResponse, ServiceError> {
        let now = Utc::now();
        Ok(OrderDetailResponse {
            status: model.workflow_status()?,
            is_overdue: model.is_overdue(now),
            remaining_minutes: model.remaining_minutes(now),
            id: model.id,
            order_number: model.order_number,
            order_name: model.order_name,
            customer_name: model.customer_name,
            customer_phone: model.customer_phone,
            customer_address: model.customer_address,
            status_changed_at: model.status_changed_at,
            deadline: model.deadline,
            delivery_time: model.delivery_time,
            items: items.iter().map(OrderItemResponse::from).collect(),
            subtotal: model.subtotal,
            shipping_fee: model.shipping_fee,
            chip_fee: model.chip_fee,
            total: model.total,
            assigned_to,
            created_by: model.created_by,
            evidence: evidence
                .iter()
                .map(|e| EvidenceBrief {
                    id: e.id,
                    kind: e.kind.clone(),
                    url: self.storage.public_url(&e.storage_key),
                    uploaded_by: e.uploaded_by,
                    created_at: e.created_at,
                })
                .collect(),
            status_history: history
                .iter()
                .map(|h| StatusHistoryResponse {
                    id: h.id,
                    from_status: h.from_status.clone(),
                    to_status: h.to_status.clone(),
                    changed_by: h.changed_by,
                    notes: h.notes.clone(),
                    created_at: h.created_at,
                })
                .collect(),
            notes: model.notes,
            failure_reason: model.failure_reason,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

struct AppliedTransition {
    old_status: OrderStatus,
    model: OrderModel,
}

fn validate_item_amounts(items: &[OrderItemInput]) -> Result<(), ServiceError> {
    for item in items {
        if item.quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Số lượng của '{}' phải lớn hơn 0",
                item.product_name
            )));
        }
        if item.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Giá của '{}' không được âm",
                item.product_name
            )));
        }
    }
    Ok(())
}

fn validate_fee(fee: Decimal, name: &str) -> Result<(), ServiceError> {
    if fee < Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "{} không được âm",
            name
        )));
    }
    Ok(())
}

fn join_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(quantity: Decimal, price: Decimal) -> OrderItemInput {
        OrderItemInput {
            product_id: None,
            product_name: "Tôm hùm".to_string(),
            quantity,
            unit: "kg".to_string(),
            price,
            note: String::new(),
        }
    }

    #[test]
    fn totals_follow_the_invariant() {
        let items = vec![item(dec!(2), dec!(100000)), item(dec!(1), dec!(50000))];
        let (subtotal, total) = compute_totals(&items, dec!(20000), dec!(10000));
        assert_eq!(subtotal, dec!(250000));
        assert_eq!(total, dec!(280000));
    }

    #[test]
    fn totals_with_fractional_quantities() {
        let items = vec![item(dec!(1.5), dec!(200000))];
        let (subtotal, total) = compute_totals(&items, dec!(0), dec!(0));
        assert_eq!(subtotal, dec!(300000));
        assert_eq!(total, subtotal);
    }

    #[test]
    fn quantity_and_price_bounds_are_enforced() {
        assert!(validate_item_amounts(&[item(dec!(0), dec!(1000))]).is_err());
        assert!(validate_item_amounts(&[item(dec!(-1), dec!(1000))]).is_err());
        assert!(validate_item_amounts(&[item(dec!(1), dec!(-1))]).is_err());
        assert!(validate_item_amounts(&[item(dec!(1), dec!(0))]).is_ok());
        assert!(validate_fee(dec!(-1), "Phí ship").is_err());
        assert!(validate_fee(dec!(0), "Phí ship").is_ok());
    }

    #[test]
    fn phone_numbers_follow_the_vietnamese_format() {
        assert!(validate_phone("0912345678").is_ok());
        assert!(validate_phone("+84912345678").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("0012345678").is_err());
    }

    #[test]
    fn create_request_rejects_empty_items() {
        let request = CreateOrderRequest {
            order_name: None,
            customer_name: "Chị Hoa".to_string(),
            customer_phone: "0912345678".to_string(),
            customer_address: "12 Trần Phú".to_string(),
            items: vec![],
            shipping_fee: Decimal::ZERO,
            chip_fee: Decimal::ZERO,
            delivery_time: Utc::now(),
            assigned_to_ids: vec![],
            notes: String::new(),
        };
        assert!(request.validate().is_err());
    }
}
