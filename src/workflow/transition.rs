use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::status::OrderStatus;

/// Purpose tag of an uploaded evidence photo.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Weighing,
    Invoice,
    Other,
}

impl EvidenceKind {
    pub fn label(self) -> &'static str {
        match self {
            EvidenceKind::Weighing => "ảnh cân hàng",
            EvidenceKind::Invoice => "ảnh phiếu đặt hàng",
            EvidenceKind::Other => "ảnh khác",
        }
    }
}

lazy_static! {
    /// Evidence a transition's target state demands. Kept declarative so new
    /// preconditions are table rows, not new branches.
    static ref REQUIRED_EVIDENCE: HashMap<OrderStatus, EvidenceKind> = {
        let mut required = HashMap::new();
        required.insert(OrderStatus::CreateInvoice, EvidenceKind::Weighing);
        required.insert(OrderStatus::SendPhoto, EvidenceKind::Invoice);
        required
    };
}

/// Evidence kind that must already exist before an order may enter `target`.
pub fn required_evidence(target: OrderStatus) -> Option<EvidenceKind> {
    REQUIRED_EVIDENCE.get(&target).copied()
}

/// Why a requested transition is not currently executable. The rendered
/// message is surfaced verbatim to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionRejection {
    #[error("Đơn hàng đã kết thúc ở trạng thái '{}', không thể chuyển tiếp", .current.label())]
    TerminalState { current: OrderStatus },

    #[error("Không thể chuyển từ '{}' sang '{}'", .from.label(), .to.label())]
    NotAdjacent { from: OrderStatus, to: OrderStatus },

    #[error("Phải upload {} trước khi chuyển sang bước '{}'", .required.label(), .target.label())]
    MissingEvidence {
        target: OrderStatus,
        required: EvidenceKind,
    },
}

/// Decides whether `current → requested` is executable right now,
/// independent of who requests it.
///
/// Checks run in a fixed order and stop at the first failure: terminal-state
/// guard, then structural adjacency, then the evidence precondition of the
/// target state. `available_evidence` is the set of evidence kinds already
/// uploaded for the order.
pub fn validate_transition(
    current: OrderStatus,
    requested: OrderStatus,
    available_evidence: &[EvidenceKind],
) -> Result<(), TransitionRejection> {
    if current.is_terminal() {
        return Err(TransitionRejection::TerminalState { current });
    }

    if !current.can_move_to(requested) {
        return Err(TransitionRejection::NotAdjacent {
            from: current,
            to: requested,
        });
    }

    if let Some(required) = required_evidence(requested) {
        if !available_evidence.contains(&required) {
            return Err(TransitionRejection::MissingEvidence {
                target: requested,
                required,
            });
        }
    }

    Ok(())
}
