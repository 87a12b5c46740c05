//! Shared helpers for integration tests: an in-memory SQLite database with
//! the full schema, wired services, and staff fixtures for every role.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};
use tokio::sync::mpsc;
use uuid::Uuid;

use seafresh_api::auth::AuthUser;
use seafresh_api::db::DbPool;
use seafresh_api::entities::{product, staff};
use seafresh_api::events::{Event, EventSender, ObserverRegistry};
use seafresh_api::handlers::AppServices;
use seafresh_api::migrator::Migrator;
use seafresh_api::services::storage::FsEvidenceStorage;
use seafresh_api::workflow::StaffRole;

use sea_orm_migration::MigratorTrait;

pub struct TestApp {
    pub db: Arc<DbPool>,
    pub services: AppServices,
    pub events: mpsc::Receiver<Event>,
    pub observers: Arc<ObserverRegistry>,
    _media_dir: tempfile::TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        // Single connection: a pooled in-memory SQLite would give every
        // connection its own empty database.
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).min_connections(1);
        let db = Database::connect(options)
            .await
            .expect("sqlite in-memory connection");
        Migrator::up(&db, None).await.expect("migrations");
        let db = Arc::new(db);

        let media_dir = tempfile::tempdir().expect("tempdir");
        let storage = Arc::new(FsEvidenceStorage::new(media_dir.path()));

        // Small buffer so tests notice every emitted event.
        let (tx, rx) = mpsc::channel(64);
        let event_sender = Arc::new(EventSender::new(tx));
        let observers = Arc::new(ObserverRegistry::new());

        let services = AppServices::new(db.clone(), storage, event_sender);

        Self {
            db,
            services,
            events: rx,
            observers,
            _media_dir: media_dir,
        }
    }

    /// Inserts a staff row and returns the matching acting principal.
    pub async fn seed_staff(&self, username: &str, role: StaffRole) -> AuthUser {
        let id = Uuid::new_v4();
        staff::ActiveModel {
            id: Set(id),
            username: Set(username.to_string()),
            full_name: Set(format!("Test {}", username)),
            role: Set(role.to_string()),
            phone: Set("0912345678".to_string()),
            active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .expect("insert staff");

        AuthUser {
            staff_id: id,
            role,
            name: format!("Test {}", username),
        }
    }

    pub async fn seed_product(&self, name: &str, price: rust_decimal::Decimal) -> product::Model {
        let now = Utc::now();
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            unit: Set("kg".to_string()),
            price: Set(price),
            description: Set(String::new()),
            in_stock: Set(true),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(&*self.db)
        .await
        .expect("insert product")
    }

    /// Next pending domain event, if any was emitted.
    pub fn try_next_event(&mut self) -> Option<Event> {
        self.events.try_recv().ok()
    }
}
