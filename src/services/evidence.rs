use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, instrument, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::entities::order::Entity as OrderEntity;
use crate::entities::order_activity::ActivityType;
use crate::entities::order_evidence::{self, Entity as EvidenceEntity, Model as EvidenceModel};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender, EvidenceSnapshot};
use crate::services::activity::log_activity;
use crate::services::storage::EvidenceStorage;
use crate::workflow::EvidenceKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceResponse {
    pub id: Uuid,
    pub kind: EvidenceKind,
    pub url: String,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Evidence kinds already present for an order, deduplicated. Runs on the
/// caller's connection so transition checks can read inside their own
/// transaction.
pub async fn existing_kinds<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Vec<EvidenceKind>, sea_orm::DbErr> {
    let records = EvidenceEntity::find()
        .filter(order_evidence::Column::OrderId.eq(order_id))
        .all(conn)
        .await?;

    let mut kinds = Vec::new();
    for record in &records {
        let kind = record.evidence_kind()?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

/// Manages uploaded proof photos: stores the asset, records the reference,
/// audits the mutation, and notifies observers.
#[derive(Clone)]
pub struct EvidenceService {
    db: Arc<DbPool>,
    storage: Arc<dyn EvidenceStorage>,
    event_sender: Option<Arc<EventSender>>,
}

impl EvidenceService {
    pub fn new(
        db: Arc<DbPool>,
        storage: Arc<dyn EvidenceStorage>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db,
            storage,
            event_sender,
        }
    }

    fn storage_key(now: DateTime<Utc>, id: Uuid, original_filename: &str) -> String {
        let ext = std::path::Path::new(original_filename)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("jpg");
        format!("orders/{}/{}.{}", now.format("%Y/%m/%d"), id, ext)
    }

    #[instrument(skip(self, bytes), fields(order_id = %order_id, kind = %kind, bytes = bytes.len()))]
    pub async fn upload_evidence(
        &self,
        order_id: Uuid,
        kind: EvidenceKind,
        original_filename: &str,
        bytes: Vec<u8>,
        actor: &AuthUser,
    ) -> Result<EvidenceResponse, ServiceError> {
        if bytes.is_empty() {
            return Err(ServiceError::ValidationError(
                "Uploaded file is empty".to_string(),
            ));
        }

        OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order with ID {} not found", order_id))
            })?;

        let now = Utc::now();
        let evidence_id = Uuid::new_v4();
        let storage_key = Self::storage_key(now, evidence_id, original_filename);

        // Asset first: a dangling file is recoverable, a dangling DB
        // reference is not.
        self.storage.store(&storage_key, &bytes).await?;

        let txn = self.db.begin().await?;

        let model = order_evidence::ActiveModel {
            id: Set(evidence_id),
            order_id: Set(order_id),
            kind: Set(kind.to_string()),
            storage_key: Set(storage_key.clone()),
            uploaded_by: Set(actor.staff_id),
            created_at: Set(now),
        };

        let inserted = match model.insert(&txn).await {
            Ok(inserted) => inserted,
            Err(e) => {
                error!(error = %e, order_id = %order_id, "Failed to record evidence upload");
                if let Err(cleanup) = self.storage.delete(&storage_key).await {
                    warn!(error = %cleanup, key = %storage_key, "Failed to clean up orphaned asset");
                }
                return Err(e.into());
            }
        };

        log_activity(
            &txn,
            order_id,
            Some(actor.staff_id),
            ActivityType::EvidenceUploaded,
            format!("Upload {}", kind.label()),
            None,
            None,
            Some(json!({ "kind": kind, "evidence_id": evidence_id })),
        )
        .await?;

        txn.commit().await?;

        if let Some(event_sender) = &self.event_sender {
            let event = Event::EvidenceUploaded {
                order_id,
                evidence: EvidenceSnapshot::from(&inserted),
            };
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, order_id = %order_id, "Failed to send evidence uploaded event");
            }
        }

        Ok(self.to_response(&inserted, kind))
    }

    #[instrument(skip(self), fields(order_id = %order_id, evidence_id = %evidence_id))]
    pub async fn delete_evidence(
        &self,
        order_id: Uuid,
        evidence_id: Uuid,
        actor: &AuthUser,
    ) -> Result<(), ServiceError> {
        let record = EvidenceEntity::find_by_id(evidence_id)
            .filter(order_evidence::Column::OrderId.eq(order_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Evidence with ID {} not found in order {}",
                    evidence_id, order_id
                ))
            })?;
        let kind = record.evidence_kind()?;

        let txn = self.db.begin().await?;

        EvidenceEntity::delete_by_id(evidence_id).exec(&txn).await?;

        log_activity(
            &txn,
            order_id,
            Some(actor.staff_id),
            ActivityType::EvidenceDeleted,
            format!("Xóa {}", kind.label()),
            None,
            None,
            Some(json!({ "kind": kind, "evidence_id": evidence_id })),
        )
        .await?;

        txn.commit().await?;

        // The record is gone either way; a leftover file is only noise.
        if let Err(e) = self.storage.delete(&record.storage_key).await {
            warn!(error = %e, key = %record.storage_key, "Failed to delete evidence asset");
        }

        if let Some(event_sender) = &self.event_sender {
            let event = Event::EvidenceDeleted {
                order_id,
                evidence_id,
            };
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, order_id = %order_id, "Failed to send evidence deleted event");
            }
        }

        Ok(())
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn list_evidence(
        &self,
        order_id: Uuid,
        kind: Option<EvidenceKind>,
    ) -> Result<Vec<EvidenceResponse>, ServiceError> {
        let mut query = EvidenceEntity::find()
            .filter(order_evidence::Column::OrderId.eq(order_id))
            .order_by_desc(order_evidence::Column::CreatedAt);
        if let Some(kind) = kind {
            query = query.filter(order_evidence::Column::Kind.eq(kind.to_string()));
        }

        let records = query.all(&*self.db).await?;
        records
            .iter()
            .map(|record| Ok(self.to_response(record, record.evidence_kind()?)))
            .collect()
    }

    fn to_response(&self, model: &EvidenceModel, kind: EvidenceKind) -> EvidenceResponse {
        EvidenceResponse {
            id: model.id,
            kind,
            url: self.storage.public_url(&model.storage_key),
            uploaded_by: model.uploaded_by,
            created_at: model.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn storage_keys_are_date_partitioned_and_keep_safe_extensions() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 9, 0, 0).unwrap();
        let id = Uuid::nil();
        assert_eq!(
            EvidenceService::storage_key(now, id, "scale-photo.png"),
            format!("orders/2026/08/07/{}.png", id)
        );
        // Suspicious extensions fall back to jpg.
        assert_eq!(
            EvidenceService::storage_key(now, id, "weird.p/ng"),
            format!("orders/2026/08/07/{}.jpg", id)
        );
        assert_eq!(
            EvidenceService::storage_key(now, id, "no-extension"),
            format!("orders/2026/08/07/{}.jpg", id)
        );
    }
}
