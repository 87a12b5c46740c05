use std::sync::Arc;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::staff::{self, Entity as StaffEntity, Model as StaffModel};
use crate::errors::ServiceError;

/// Compact staff reference embedded in order responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffBrief {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
}

impl From<&StaffModel> for StaffBrief {
    fn from(model: &StaffModel) -> Self {
        Self {
            id: model.id,
            username: model.username.clone(),
            full_name: model.full_name.clone(),
        }
    }
}

/// Staff directory collaborator: existence checks for assignment updates
/// and display-name lookups for responses.
#[derive(Clone)]
pub struct StaffDirectory {
    db: Arc<DbPool>,
}

impl StaffDirectory {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(staff_id = %staff_id))]
    pub async fn find(&self, staff_id: Uuid) -> Result<Option<StaffModel>, ServiceError> {
        let staff = StaffEntity::find_by_id(staff_id).one(&*self.db).await?;
        Ok(staff)
    }

    /// Loads the given staff records, erroring on any id that does not
    /// exist so callers never apply a partial assignment.
    pub async fn require_all(&self, staff_ids: &[Uuid]) -> Result<Vec<StaffModel>, ServiceError> {
        if staff_ids.is_empty() {
            return Ok(Vec::new());
        }

        let found = StaffEntity::find()
            .filter(staff::Column::Id.is_in(staff_ids.to_vec()))
            .all(&*self.db)
            .await?;

        if found.len() != staff_ids.len() {
            let missing: Vec<String> = staff_ids
                .iter()
                .filter(|id| !found.iter().any(|s| s.id == **id))
                .map(|id| id.to_string())
                .collect();
            return Err(ServiceError::ValidationError(format!(
                "Unknown staff id(s): {}",
                missing.join(", ")
            )));
        }

        Ok(found)
    }

    pub async fn briefs(&self, staff_ids: &[Uuid]) -> Result<Vec<StaffBrief>, ServiceError> {
        if staff_ids.is_empty() {
            return Ok(Vec::new());
        }
        let found = StaffEntity::find()
            .filter(staff::Column::Id.is_in(staff_ids.to_vec()))
            .all(&*self.db)
            .await?;
        Ok(found.iter().map(StaffBrief::from).collect())
    }
}
