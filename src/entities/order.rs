use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflow::OrderStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub order_number: String,
    pub order_name: Option<String>,

    // Customer snapshot captured at creation time, not a live reference.
    pub customer_name: String,
    pub customer_phone: String,
    #[sea_orm(column_type = "Text")]
    pub customer_address: String,

    pub status: String,
    pub status_changed_at: DateTime<Utc>,
    pub deadline: Option<DateTime<Utc>>,
    pub delivery_time: DateTime<Utc>,

    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub chip_fee: Decimal,
    pub total: Decimal,

    pub created_by: Uuid,
    #[sea_orm(column_type = "Text")]
    pub notes: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub failure_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
    #[sea_orm(has_many = "super::order_evidence::Entity")]
    OrderEvidence,
    #[sea_orm(has_many = "super::order_status_history::Entity")]
    OrderStatusHistory,
    #[sea_orm(has_many = "super::order_activity::Entity")]
    OrderActivity,
    #[sea_orm(has_many = "super::order_assignee::Entity")]
    OrderAssignee,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl Related<super::order_evidence::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderEvidence.def()
    }
}

impl Related<super::order_status_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderStatusHistory.def()
    }
}

impl Related<super::order_activity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderActivity.def()
    }
}

impl Related<super::order_assignee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderAssignee.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parsed workflow status. The column is constrained to the enum's wire
    /// values by every write path.
    pub fn workflow_status(&self) -> Result<OrderStatus, DbErr> {
        self.status
            .parse()
            .map_err(|_| DbErr::Custom(format!("orders.status holds unknown value '{}'", self.status)))
    }

    /// Whether the current step has blown past its deadline. Terminal orders
    /// are never overdue.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match (self.deadline, self.workflow_status()) {
            (Some(deadline), Ok(status)) if !status.is_terminal() => now > deadline,
            _ => false,
        }
    }

    /// Minutes until the current step's deadline; negative when overdue,
    /// `None` for terminal orders or orders without a deadline.
    pub fn remaining_minutes(&self, now: DateTime<Utc>) -> Option<i64> {
        match (self.deadline, self.workflow_status()) {
            (Some(deadline), Ok(status)) if !status.is_terminal() => {
                Some((deadline - now).num_minutes())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn sample_order(status: OrderStatus, deadline: Option<DateTime<Utc>>) -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            order_number: "DH202608070001".to_string(),
            order_name: None,
            customer_name: "Chị Hoa".to_string(),
            customer_phone: "0912345678".to_string(),
            customer_address: "12 Trần Phú, Nha Trang".to_string(),
            status: status.to_string(),
            status_changed_at: now,
            deadline,
            delivery_time: now + Duration::hours(4),
            subtotal: dec!(250000),
            shipping_fee: dec!(20000),
            chip_fee: dec!(10000),
            total: dec!(280000),
            created_by: Uuid::new_v4(),
            notes: String::new(),
            failure_reason: None,
            created_at: now,
            updated_at: Some(now),
            version: 1,
        }
    }

    #[test]
    fn overdue_only_before_terminal() {
        let now = Utc::now();
        let past = Some(now - Duration::minutes(5));

        assert!(sample_order(OrderStatus::Weighing, past).is_overdue(now));
        assert!(!sample_order(OrderStatus::Completed, past).is_overdue(now));
        assert!(!sample_order(OrderStatus::Weighing, None).is_overdue(now));
    }

    #[test]
    fn remaining_minutes_goes_negative_when_late() {
        let now = Utc::now();
        let order = sample_order(OrderStatus::Payment, Some(now - Duration::minutes(10)));
        assert!(order.remaining_minutes(now).unwrap() <= -9);

        let order = sample_order(OrderStatus::Payment, Some(now + Duration::minutes(30)));
        let remaining = order.remaining_minutes(now).unwrap();
        assert!((29..=30).contains(&remaining));
    }
}
