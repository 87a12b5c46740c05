//! The order workflow engine: the fixed status graph, the role policy that
//! gates who may move an order between states, and the transition validator
//! that decides whether a move is currently executable.

pub mod roles;
pub mod status;
pub mod transition;

pub use roles::StaffRole;
pub use status::{OrderStatus, WORKFLOW_ORDER};
pub use transition::{
    required_evidence, validate_transition, EvidenceKind, TransitionRejection,
};
