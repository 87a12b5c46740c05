pub mod activities;
pub mod evidence;
pub mod orders;
pub mod ws;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::activity::ActivityLogService;
use crate::services::catalog::ProductCatalogService;
use crate::services::evidence::EvidenceService;
use crate::services::orders::OrderService;
use crate::services::staff::StaffDirectory;
use crate::services::storage::EvidenceStorage;

/// Services layer that encapsulates the business logic used by HTTP
/// handlers.
#[derive(Clone)]
pub struct AppServices {
    pub order: Arc<OrderService>,
    pub evidence: Arc<EvidenceService>,
    pub activity: Arc<ActivityLogService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        storage: Arc<dyn EvidenceStorage>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        let staff = StaffDirectory::new(db.clone());
        let catalog = ProductCatalogService::new(db.clone());

        let order = Arc::new(OrderService::new(
            db.clone(),
            staff,
            catalog,
            storage.clone(),
            Some(event_sender.clone()),
        ));
        let evidence = Arc::new(EvidenceService::new(
            db.clone(),
            storage,
            Some(event_sender),
        ));
        let activity = Arc::new(ActivityLogService::new(db));

        Self {
            order,
            evidence,
            activity,
        }
    }
}
