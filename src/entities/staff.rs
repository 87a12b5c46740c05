use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflow::StaffRole;

/// Staff reference data. Authentication happens upstream; this table backs
/// assignment validation and display names only.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "staff")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub username: String,
    pub full_name: String,
    pub role: String,
    pub phone: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_assignee::Entity")]
    OrderAssignee,
}

impl Related<super::order_assignee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderAssignee.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn staff_role(&self) -> Result<StaffRole, DbErr> {
        self.role
            .parse()
            .map_err(|_| DbErr::Custom(format!("staff.role holds unknown value '{}'", self.role)))
    }
}
