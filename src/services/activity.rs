use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::instrument;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::order_activity::{
    self, ActivityType, Entity as ActivityEntity, Model as ActivityModel,
};
use crate::entities::order_status_history::{self, Entity as HistoryEntity};
use crate::errors::ServiceError;

/// Appends one audit entry inside the caller's transaction. Every mutating
/// operation writes exactly one entry before reporting success.
pub async fn log_activity<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    staff_id: Option<Uuid>,
    activity_type: ActivityType,
    description: String,
    old_value: Option<String>,
    new_value: Option<String>,
    metadata: Option<serde_json::Value>,
) -> Result<ActivityModel, sea_orm::DbErr> {
    order_activity::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        staff_id: Set(staff_id),
        activity_type: Set(activity_type.to_string()),
        description: Set(description),
        old_value: Set(old_value),
        new_value: Set(new_value),
        metadata: Set(metadata),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await
}

/// Read side of the audit trail.
#[derive(Clone)]
pub struct ActivityLogService {
    db: Arc<DbPool>,
}

impl ActivityLogService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Activity entries for one order, newest first.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn list_activities(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<ActivityModel>, ServiceError> {
        let entries = ActivityEntity::find()
            .filter(order_activity::Column::OrderId.eq(order_id))
            .order_by_desc(order_activity::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(entries)
    }

    /// Status transition records for one order, newest first.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn list_status_history(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<order_status_history::Model>, ServiceError> {
        let entries = HistoryEntity::find()
            .filter(order_status_history::Column::OrderId.eq(order_id))
            .order_by_desc(order_status_history::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(entries)
    }
}
