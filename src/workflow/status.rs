use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Workflow states for a seafood order, in fulfillment order.
///
/// `Failed` sits outside the linear flow and is reachable from any
/// non-terminal state; `Completed` is reachable only from `Delivery`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    Weighing,
    CreateInvoice,
    SendPhoto,
    Payment,
    InKitchen,
    Processing,
    Delivery,
    Completed,
    Failed,
}

/// The linear workflow, first step to completion. `Failed` is intentionally
/// absent: it has no position in the sequence.
pub const WORKFLOW_ORDER: [OrderStatus; 9] = [
    OrderStatus::Created,
    OrderStatus::Weighing,
    OrderStatus::CreateInvoice,
    OrderStatus::SendPhoto,
    OrderStatus::Payment,
    OrderStatus::InKitchen,
    OrderStatus::Processing,
    OrderStatus::Delivery,
    OrderStatus::Completed,
];

impl OrderStatus {
    /// Position in the linear workflow; `None` for `Failed`.
    pub fn position(self) -> Option<usize> {
        WORKFLOW_ORDER.iter().position(|s| *s == self)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Failed)
    }

    /// Standard duration allotted to a state, in minutes. Used to derive the
    /// deadline when a transition lands on this state; terminal states carry
    /// no deadline.
    pub fn duration_minutes(self) -> i64 {
        match self {
            OrderStatus::Created => 15,
            OrderStatus::Weighing => 20,
            OrderStatus::CreateInvoice => 10,
            OrderStatus::SendPhoto => 10,
            OrderStatus::Payment => 30,
            OrderStatus::InKitchen => 60,
            OrderStatus::Processing => 45,
            OrderStatus::Delivery => 30,
            OrderStatus::Completed | OrderStatus::Failed => 0,
        }
    }

    /// Deadline for an order that entered this state at `since`.
    pub fn deadline_from(self, since: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let minutes = self.duration_minutes();
        if minutes > 0 {
            Some(since + Duration::minutes(minutes))
        } else {
            None
        }
    }

    /// Display label shown to staff. The service was built for a Vietnamese
    /// seafood kitchen; these labels appear verbatim in user-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::Created => "Tạo đơn",
            OrderStatus::Weighing => "Cân hàng",
            OrderStatus::CreateInvoice => "Tạo phiếu ĐH",
            OrderStatus::SendPhoto => "Gửi ảnh cân",
            OrderStatus::Payment => "Thanh toán",
            OrderStatus::InKitchen => "Vào bếp",
            OrderStatus::Processing => "Chế biến",
            OrderStatus::Delivery => "Giao hàng",
            OrderStatus::Completed => "Hoàn thành",
            OrderStatus::Failed => "Thất bại",
        }
    }

    /// Structural adjacency check: is `next` reachable from `self` at all,
    /// regardless of who asks and of any evidence preconditions?
    ///
    /// Legal moves are one step forward or backward in [`WORKFLOW_ORDER`],
    /// plus the explicit `payment → delivery` skip. `Completed` is reachable
    /// only from `Delivery`, `Failed` from any non-terminal state, and
    /// nothing leaves a terminal state.
    pub fn can_move_to(self, next: OrderStatus) -> bool {
        if self.is_terminal() || next == self {
            return false;
        }
        if next == OrderStatus::Failed {
            return true;
        }
        if next == OrderStatus::Completed {
            return self == OrderStatus::Delivery;
        }
        if self == OrderStatus::Payment && next == OrderStatus::Delivery {
            return true;
        }
        match (self.position(), next.position()) {
            (Some(from), Some(to)) => from.abs_diff(to) == 1,
            _ => false,
        }
    }
}
