use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::status::OrderStatus;

/// Permission class of a staff member, determining which workflow states
/// they may act on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum StaffRole {
    Admin,
    Manager,
    Sale,
    WeighingStaff,
    KitchenStaff,
}

lazy_static! {
    /// Which workflow states each restricted role may operate within.
    /// Admin and manager are unrestricted and deliberately absent here.
    static ref ROLE_STATUS_ACCESS: HashMap<StaffRole, Vec<OrderStatus>> = {
        let mut access = HashMap::new();

        // Sale staff handle the commercial front half, creation through payment.
        access.insert(
            StaffRole::Sale,
            vec![
                OrderStatus::Created,
                OrderStatus::Weighing,
                OrderStatus::CreateInvoice,
                OrderStatus::SendPhoto,
                OrderStatus::Payment,
            ],
        );

        // Weighing staff cover the scale and paperwork steps.
        access.insert(
            StaffRole::WeighingStaff,
            vec![
                OrderStatus::Weighing,
                OrderStatus::CreateInvoice,
                OrderStatus::SendPhoto,
            ],
        );

        // Kitchen staff take over from the kitchen handoff to completion.
        access.insert(
            StaffRole::KitchenStaff,
            vec![
                OrderStatus::InKitchen,
                OrderStatus::Processing,
                OrderStatus::Delivery,
                OrderStatus::Completed,
            ],
        );

        access
    };
}

impl StaffRole {
    pub fn label(self) -> &'static str {
        match self {
            StaffRole::Admin => "Quản trị viên",
            StaffRole::Manager => "Quản lý",
            StaffRole::Sale => "Nhân viên bán hàng",
            StaffRole::WeighingStaff => "Bộ phận cân hàng",
            StaffRole::KitchenStaff => "Bộ phận bếp",
        }
    }

    pub fn is_supervisor(self) -> bool {
        matches!(self, StaffRole::Admin | StaffRole::Manager)
    }

    /// The workflow states this role may operate in.
    pub fn allowed_statuses(self) -> Vec<OrderStatus> {
        if self.is_supervisor() {
            return super::status::WORKFLOW_ORDER
                .iter()
                .copied()
                .chain(std::iter::once(OrderStatus::Failed))
                .collect();
        }
        ROLE_STATUS_ACCESS.get(&self).cloned().unwrap_or_default()
    }

    /// Role-policy check: may this role execute `from → to` at all?
    ///
    /// Admin and manager may always; every other role needs both endpoints
    /// inside its allowed set. This is purely an authorization question and
    /// does not consult the status graph.
    pub fn can_transition(self, from: OrderStatus, to: OrderStatus) -> bool {
        if self.is_supervisor() {
            return true;
        }
        let allowed = self.allowed_statuses();
        allowed.contains(&from) && allowed.contains(&to)
    }

    /// Only the commercial roles may open new orders.
    pub fn can_create_order(self) -> bool {
        matches!(self, StaffRole::Admin | StaffRole::Manager | StaffRole::Sale)
    }
}
