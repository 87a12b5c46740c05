//! End-to-end tests for the order workflow engine against an in-memory
//! database:
//! - creation with derived money fields and the initial deadline
//! - role-gated transitions and evidence preconditions
//! - the atomic transition (history + activity + event, all or nothing)
//! - assignment replacement, deletion, statistics

mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use common::TestApp;
use rust_decimal_macros::dec;
use uuid::Uuid;

use seafresh_api::errors::ServiceError;
use seafresh_api::events::Event;
use seafresh_api::services::orders::{
    CreateOrderRequest, OrderFilter, OrderItemInput, UpdateAssigneesRequest,
    UpdateOrderStatusRequest,
};
use seafresh_api::workflow::{EvidenceKind, OrderStatus, StaffRole};

fn order_request(items: Vec<OrderItemInput>) -> CreateOrderRequest {
    CreateOrderRequest {
        order_name: None,
        customer_name: "Chị Hoa".to_string(),
        customer_phone: "0912345678".to_string(),
        customer_address: "12 Trần Phú, Nha Trang".to_string(),
        items,
        shipping_fee: dec!(20000),
        chip_fee: dec!(10000),
        delivery_time: Utc::now() + Duration::hours(4),
        assigned_to_ids: vec![],
        notes: String::new(),
    }
}

fn item(name: &str, quantity: rust_decimal::Decimal, price: rust_decimal::Decimal) -> OrderItemInput {
    OrderItemInput {
        product_id: None,
        product_name: name.to_string(),
        quantity,
        unit: "kg".to_string(),
        price,
        note: String::new(),
    }
}

async fn transition(
    app: &TestApp,
    order_id: Uuid,
    actor: &seafresh_api::auth::AuthUser,
    new_status: OrderStatus,
) -> Result<seafresh_api::services::orders::OrderDetailResponse, ServiceError> {
    app.services
        .order
        .update_order_status(
            order_id,
            UpdateOrderStatusRequest {
                new_status,
                failure_reason: None,
            },
            actor,
        )
        .await
}

#[tokio::test]
#[ignore = "requires the SQLite integration environment"]
async fn creating_an_order_derives_money_fields_and_deadline() {
    let mut app = TestApp::new().await;
    let sale = app.seed_staff("sale", StaffRole::Sale).await;

    let before = Utc::now();
    let order = app
        .services
        .order
        .create_order(
            order_request(vec![
                item("Tôm hùm", dec!(2), dec!(100000)),
                item("Mực ống", dec!(1), dec!(50000)),
            ]),
            &sale,
        )
        .await
        .expect("create order");

    assert_eq!(order.status, OrderStatus::Created);
    assert_eq!(order.subtotal, dec!(250000));
    assert_eq!(order.total, dec!(280000));
    assert!(order.order_number.starts_with("DH"));
    assert_eq!(order.order_number.len(), 14);

    // Deadline is creation time + the created-state duration (15 minutes).
    let deadline = order.deadline.expect("created orders carry a deadline");
    let expected = order.status_changed_at + Duration::minutes(15);
    assert_eq!(deadline, expected);
    assert!(order.status_changed_at >= before);

    assert_matches!(app.try_next_event(), Some(Event::OrderCreated { order: snapshot }) => {
        assert_eq!(snapshot.id, order.id);
        assert_eq!(snapshot.total, dec!(280000));
    });

    // Exactly one creation activity.
    let activities = app
        .services
        .activity
        .list_activities(order.id)
        .await
        .unwrap();
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0].activity_type, "created");
}

#[tokio::test]
#[ignore = "requires the SQLite integration environment"]
async fn unknown_product_reference_fails_creation() {
    let app = TestApp::new().await;
    let sale = app.seed_staff("sale", StaffRole::Sale).await;

    let mut request = order_request(vec![item("Tôm hùm", dec!(1), dec!(100000))]);
    request.items[0].product_id = Some(Uuid::new_v4());

    let err = app
        .services
        .order
        .create_order(request, &sale)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(msg) => {
        assert!(msg.contains("not found"));
    });
}

#[tokio::test]
#[ignore = "requires the SQLite integration environment"]
async fn catalog_backed_items_resolve() {
    let app = TestApp::new().await;
    let sale = app.seed_staff("sale", StaffRole::Sale).await;
    let product = app.seed_product("Cá mú đỏ", dec!(450000)).await;

    let mut request = order_request(vec![item("Cá mú đỏ", dec!(1), dec!(450000))]);
    request.items[0].product_id = Some(product.id);

    let order = app
        .services
        .order
        .create_order(request, &sale)
        .await
        .expect("create order with catalog item");
    assert_eq!(order.items[0].product_id, Some(product.id));
}

#[tokio::test]
#[ignore = "requires the SQLite integration environment"]
async fn role_policy_is_checked_before_the_graph() {
    let mut app = TestApp::new().await;
    let sale = app.seed_staff("sale", StaffRole::Sale).await;
    let weigher = app.seed_staff("weigher", StaffRole::WeighingStaff).await;

    let order = app
        .services
        .order
        .create_order(order_request(vec![item("Tôm", dec!(1), dec!(100000))]), &sale)
        .await
        .unwrap();
    let _ = app.try_next_event();

    // Weighing staff's window starts at weighing; the created → weighing
    // handoff is out of their reach.
    let err = transition(&app, order.id, &weigher, OrderStatus::Weighing)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::AuthorizationError(msg) => {
        assert!(msg.contains("weighing"), "message should enumerate allowed states: {msg}");
    });

    // The order is untouched and no event leaked out.
    let unchanged = app.services.order.get_order(order.id).await.unwrap();
    assert_eq!(unchanged.status, OrderStatus::Created);
    assert!(app.try_next_event().is_none());

    // Sale may make the same move.
    let moved = transition(&app, order.id, &sale, OrderStatus::Weighing)
        .await
        .unwrap();
    assert_eq!(moved.status, OrderStatus::Weighing);
}

#[tokio::test]
#[ignore = "requires the SQLite integration environment"]
async fn adjacency_rules_follow_the_status_graph() {
    let app = TestApp::new().await;
    let admin = app.seed_staff("admin", StaffRole::Admin).await;

    let order = app
        .services
        .order
        .create_order(order_request(vec![item("Tôm", dec!(1), dec!(100000))]), &admin)
        .await
        .unwrap();

    // More than one step forward is rejected.
    let err = transition(&app, order.id, &admin, OrderStatus::Processing)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::TransitionRejected(_));

    // One step backward is legal.
    transition(&app, order.id, &admin, OrderStatus::Weighing)
        .await
        .unwrap();
    let back = transition(&app, order.id, &admin, OrderStatus::Created)
        .await
        .unwrap();
    assert_eq!(back.status, OrderStatus::Created);
}

#[tokio::test]
#[ignore = "requires the SQLite integration environment"]
async fn payment_to_delivery_skip_is_allowed() {
    let app = TestApp::new().await;
    let admin = app.seed_staff("admin", StaffRole::Admin).await;
    let order = app
        .services
        .order
        .create_order(order_request(vec![item("Cua", dec!(1), dec!(500000))]), &admin)
        .await
        .unwrap();

    let weigher = app.seed_staff("weigher2", StaffRole::WeighingStaff).await;
    transition(&app, order.id, &admin, OrderStatus::Weighing)
        .await
        .unwrap();
    app.services
        .evidence
        .upload_evidence(order.id, EvidenceKind::Weighing, "scale.jpg", b"img".to_vec(), &weigher)
        .await
        .unwrap();
    transition(&app, order.id, &admin, OrderStatus::CreateInvoice)
        .await
        .unwrap();
    app.services
        .evidence
        .upload_evidence(order.id, EvidenceKind::Invoice, "invoice.jpg", b"img".to_vec(), &admin)
        .await
        .unwrap();
    transition(&app, order.id, &admin, OrderStatus::SendPhoto)
        .await
        .unwrap();
    transition(&app, order.id, &admin, OrderStatus::Payment)
        .await
        .unwrap();

    // The explicit skip straight to delivery.
    let skipped = transition(&app, order.id, &admin, OrderStatus::Delivery)
        .await
        .unwrap();
    assert_eq!(skipped.status, OrderStatus::Delivery);

    let done = transition(&app, order.id, &admin, OrderStatus::Completed)
        .await
        .unwrap();
    assert_eq!(done.status, OrderStatus::Completed);
    assert!(done.deadline.is_none(), "terminal states carry no deadline");
}

#[tokio::test]
#[ignore = "requires the SQLite integration environment"]
async fn evidence_gates_the_invoice_step() {
    let app = TestApp::new().await;
    let admin = app.seed_staff("admin", StaffRole::Admin).await;
    let order = app
        .services
        .order
        .create_order(order_request(vec![item("Ốc hương", dec!(2), dec!(380000))]), &admin)
        .await
        .unwrap();

    transition(&app, order.id, &admin, OrderStatus::Weighing)
        .await
        .unwrap();

    // No weighing photo yet: rejected, naming the missing evidence.
    let err = transition(&app, order.id, &admin, OrderStatus::CreateInvoice)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::TransitionRejected(rejection) => {
        assert!(rejection.to_string().contains("ảnh cân hàng"));
    });

    // An unrelated photo does not unlock the step.
    app.services
        .evidence
        .upload_evidence(order.id, EvidenceKind::Other, "misc.jpg", b"img".to_vec(), &admin)
        .await
        .unwrap();
    assert!(transition(&app, order.id, &admin, OrderStatus::CreateInvoice)
        .await
        .is_err());

    // The weighing photo does.
    app.services
        .evidence
        .upload_evidence(order.id, EvidenceKind::Weighing, "scale.jpg", b"img".to_vec(), &admin)
        .await
        .unwrap();
    let moved = transition(&app, order.id, &admin, OrderStatus::CreateInvoice)
        .await
        .unwrap();
    assert_eq!(moved.status, OrderStatus::CreateInvoice);
}

#[tokio::test]
#[ignore = "requires the SQLite integration environment"]
async fn terminal_states_absorb_regardless_of_role() {
    let app = TestApp::new().await;
    let admin = app.seed_staff("admin", StaffRole::Admin).await;
    let order = app
        .services
        .order
        .create_order(order_request(vec![item("Hàu", dec!(3), dec!(120000))]), &admin)
        .await
        .unwrap();

    let failed = app
        .services
        .order
        .update_order_status(
            order.id,
            UpdateOrderStatusRequest {
                new_status: OrderStatus::Failed,
                failure_reason: Some("Khách hủy đơn".to_string()),
            },
            &admin,
        )
        .await
        .unwrap();
    assert_eq!(failed.status, OrderStatus::Failed);
    assert_eq!(failed.failure_reason.as_deref(), Some("Khách hủy đơn"));
    assert!(failed.deadline.is_none());

    // Not even an admin can leave a terminal state.
    let err = transition(&app, order.id, &admin, OrderStatus::Created)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::TransitionRejected(_));
}

#[tokio::test]
#[ignore = "requires the SQLite integration environment"]
async fn failing_without_a_reason_is_rejected() {
    let app = TestApp::new().await;
    let admin = app.seed_staff("admin", StaffRole::Admin).await;
    let order = app
        .services
        .order
        .create_order(order_request(vec![item("Tôm", dec!(1), dec!(100000))]), &admin)
        .await
        .unwrap();

    for reason in [None, Some("".to_string()), Some("   ".to_string())] {
        let err = app
            .services
            .order
            .update_order_status(
                order.id,
                UpdateOrderStatusRequest {
                    new_status: OrderStatus::Failed,
                    failure_reason: reason,
                },
                &admin,
            )
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(_));
    }
}

#[tokio::test]
#[ignore = "requires the SQLite integration environment"]
async fn each_transition_writes_one_history_and_one_activity_and_one_event() {
    let mut app = TestApp::new().await;
    let admin = app.seed_staff("admin", StaffRole::Admin).await;
    let order = app
        .services
        .order
        .create_order(order_request(vec![item("Mực", dec!(1), dec!(250000))]), &admin)
        .await
        .unwrap();
    let _ = app.try_next_event();

    transition(&app, order.id, &admin, OrderStatus::Weighing)
        .await
        .unwrap();

    let history = app
        .services
        .activity
        .list_status_history(order.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].from_status, "created");
    assert_eq!(history[0].to_status, "weighing");
    assert_eq!(history[0].changed_by, admin.staff_id);

    let activities = app
        .services
        .activity
        .list_activities(order.id)
        .await
        .unwrap();
    let status_changes: Vec<_> = activities
        .iter()
        .filter(|a| a.activity_type == "status_change")
        .collect();
    assert_eq!(status_changes.len(), 1);
    assert_eq!(status_changes[0].old_value.as_deref(), Some("created"));
    assert_eq!(status_changes[0].new_value.as_deref(), Some("weighing"));

    assert_matches!(
        app.try_next_event(),
        Some(Event::OrderStatusChanged { old_status, new_status, order: snapshot, .. }) => {
            assert_eq!(old_status, OrderStatus::Created);
            assert_eq!(new_status, OrderStatus::Weighing);
            assert_eq!(snapshot.status, OrderStatus::Weighing);
        }
    );
    assert!(app.try_next_event().is_none(), "exactly one event per transition");
}

#[tokio::test]
#[ignore = "requires the SQLite integration environment"]
async fn assignment_is_replaced_wholesale_and_validated() {
    let mut app = TestApp::new().await;
    let admin = app.seed_staff("admin", StaffRole::Admin).await;
    let staff_a = app.seed_staff("a", StaffRole::Sale).await;
    let staff_b = app.seed_staff("b", StaffRole::KitchenStaff).await;

    let order = app
        .services
        .order
        .create_order(order_request(vec![item("Tôm", dec!(1), dec!(100000))]), &admin)
        .await
        .unwrap();
    let _ = app.try_next_event();

    let assigned = app
        .services
        .order
        .update_assignment(
            order.id,
            UpdateAssigneesRequest {
                assigned_to_ids: vec![staff_a.staff_id],
            },
            &admin,
        )
        .await
        .unwrap();
    assert_eq!(assigned.assigned_to.len(), 1);
    assert_matches!(app.try_next_event(), Some(Event::AssignmentChanged { assigned_staff, .. }) => {
        assert_eq!(assigned_staff, vec![staff_a.staff_id]);
    });

    // Unknown id anywhere in the set: nothing is applied.
    let err = app
        .services
        .order
        .update_assignment(
            order.id,
            UpdateAssigneesRequest {
                assigned_to_ids: vec![staff_b.staff_id, Uuid::new_v4()],
            },
            &admin,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
    let detail = app.services.order.get_order(order.id).await.unwrap();
    assert_eq!(detail.assigned_to.len(), 1);
    assert_eq!(detail.assigned_to[0].id, staff_a.staff_id);

    // Replacement is wholesale, not additive.
    let replaced = app
        .services
        .order
        .update_assignment(
            order.id,
            UpdateAssigneesRequest {
                assigned_to_ids: vec![staff_b.staff_id],
            },
            &admin,
        )
        .await
        .unwrap();
    assert_eq!(replaced.assigned_to.len(), 1);
    assert_eq!(replaced.assigned_to[0].id, staff_b.staff_id);
}

#[tokio::test]
#[ignore = "requires the SQLite integration environment"]
async fn same_day_order_numbers_never_collide() {
    let app = TestApp::new().await;
    let admin = app.seed_staff("admin", StaffRole::Admin).await;

    let mut numbers = std::collections::HashSet::new();
    for _ in 0..25 {
        let order = app
            .services
            .order
            .create_order(order_request(vec![item("Tôm", dec!(1), dec!(100000))]), &admin)
            .await
            .unwrap();
        assert!(
            numbers.insert(order.order_number.clone()),
            "duplicate order number {}",
            order.order_number
        );
    }
}

#[tokio::test]
#[ignore = "requires the SQLite integration environment"]
async fn deleting_an_order_cascades_and_notifies() {
    let mut app = TestApp::new().await;
    let admin = app.seed_staff("admin", StaffRole::Admin).await;
    let order = app
        .services
        .order
        .create_order(order_request(vec![item("Tôm", dec!(1), dec!(100000))]), &admin)
        .await
        .unwrap();
    let _ = app.try_next_event();

    app.services.order.delete_order(order.id, &admin).await.unwrap();

    assert_matches!(
        app.services.order.get_order(order.id).await.unwrap_err(),
        ServiceError::NotFound(_)
    );
    assert_matches!(app.try_next_event(), Some(Event::OrderDeleted { order_id }) => {
        assert_eq!(order_id, order.id);
    });
}

#[tokio::test]
#[ignore = "requires the SQLite integration environment"]
async fn statistics_and_listing_reflect_the_workflow() {
    let app = TestApp::new().await;
    let admin = app.seed_staff("admin", StaffRole::Admin).await;

    for _ in 0..3 {
        app.services
            .order
            .create_order(order_request(vec![item("Tôm", dec!(1), dec!(100000))]), &admin)
            .await
            .unwrap();
    }
    let order = app
        .services
        .order
        .create_order(order_request(vec![item("Cua", dec!(1), dec!(500000))]), &admin)
        .await
        .unwrap();
    app.services
        .order
        .update_order_status(
            order.id,
            UpdateOrderStatusRequest {
                new_status: OrderStatus::Failed,
                failure_reason: Some("Hết hàng".to_string()),
            },
            &admin,
        )
        .await
        .unwrap();

    let stats = app.services.order.statistics().await.unwrap();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.in_progress, 3);

    let listed = app
        .services
        .order
        .list_orders(
            OrderFilter {
                status: Some(OrderStatus::Created),
                ..Default::default()
            },
            &admin,
        )
        .await
        .unwrap();
    assert_eq!(listed.total, 3);

    let searched = app
        .services
        .order
        .list_orders(
            OrderFilter {
                search: Some(order.order_number.clone()),
                ..Default::default()
            },
            &admin,
        )
        .await
        .unwrap();
    assert_eq!(searched.total, 1);
    assert_eq!(searched.orders[0].id, order.id);
}
