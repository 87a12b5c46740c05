//! Property-based tests for the workflow core: status graph, role policy,
//! and transition validation invariants across all input combinations.

use proptest::prelude::*;
use strum::IntoEnumIterator;

use seafresh_api::workflow::{
    required_evidence, validate_transition, EvidenceKind, OrderStatus, StaffRole,
    TransitionRejection, WORKFLOW_ORDER,
};

fn any_status() -> impl Strategy<Value = OrderStatus> {
    proptest::sample::select(OrderStatus::iter().collect::<Vec<_>>())
}

fn any_role() -> impl Strategy<Value = StaffRole> {
    proptest::sample::select(StaffRole::iter().collect::<Vec<_>>())
}

fn any_evidence_set() -> impl Strategy<Value = Vec<EvidenceKind>> {
    proptest::sample::subsequence(EvidenceKind::iter().collect::<Vec<_>>(), 0..=3)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// A transition that validates must be structurally legal and have its
    /// evidence requirement satisfied.
    #[test]
    fn validated_transitions_are_structurally_legal(
        from in any_status(),
        to in any_status(),
        evidence in any_evidence_set(),
    ) {
        if validate_transition(from, to, &evidence).is_ok() {
            prop_assert!(from.can_move_to(to));
            if let Some(required) = required_evidence(to) {
                prop_assert!(evidence.contains(&required));
            }
        }
    }

    /// Terminal states reject every transition, for every evidence set.
    #[test]
    fn terminal_states_reject_everything(
        to in any_status(),
        evidence in any_evidence_set(),
    ) {
        for terminal in [OrderStatus::Completed, OrderStatus::Failed] {
            let result = validate_transition(terminal, to, &evidence);
            let is_terminal_rejection =
                matches!(result, Err(TransitionRejection::TerminalState { .. }));
            prop_assert!(is_terminal_rejection);
        }
    }

    /// Structural legality: other than the payment → delivery skip, the
    /// failed branch, and completed-from-delivery, every legal move is one
    /// step in the linear workflow.
    #[test]
    fn legal_moves_are_single_steps_or_named_exceptions(
        from in any_status(),
        to in any_status(),
    ) {
        if from.can_move_to(to) {
            let special = to == OrderStatus::Failed
                || (from == OrderStatus::Payment && to == OrderStatus::Delivery);
            if !special {
                let from_pos = from.position().unwrap();
                let to_pos = to.position().unwrap();
                prop_assert_eq!(from_pos.abs_diff(to_pos), 1);
            }
            if to == OrderStatus::Completed {
                prop_assert_eq!(from, OrderStatus::Delivery);
            }
        }
    }

    /// Restricted roles may only transition when both endpoints sit inside
    /// their allowed window; supervisors are unrestricted.
    #[test]
    fn role_policy_matches_allowed_windows(
        role in any_role(),
        from in any_status(),
        to in any_status(),
    ) {
        let allowed = role.allowed_statuses();
        let decision = role.can_transition(from, to);
        if role.is_supervisor() {
            prop_assert!(decision);
        } else {
            prop_assert_eq!(decision, allowed.contains(&from) && allowed.contains(&to));
        }
    }

    /// Role policy and graph adjacency are independent checks: the policy
    /// may approve structurally impossible moves (the graph rejects them
    /// later), but never approves endpoints outside the role's window.
    #[test]
    fn role_policy_ignores_adjacency(
        role in any_role(),
        from in any_status(),
        to in any_status(),
    ) {
        if !role.is_supervisor() && role.can_transition(from, to) {
            let allowed = role.allowed_statuses();
            prop_assert!(allowed.contains(&from));
            prop_assert!(allowed.contains(&to));
        }
    }
}

#[test]
fn every_workflow_state_has_a_duration_and_terminal_states_zero() {
    for status in WORKFLOW_ORDER {
        if status.is_terminal() {
            assert_eq!(status.duration_minutes(), 0);
        } else {
            assert!(status.duration_minutes() > 0, "{status} needs a duration");
        }
    }
    assert_eq!(OrderStatus::Failed.duration_minutes(), 0);
}

#[test]
fn evidence_requirements_cover_exactly_the_paperwork_steps() {
    for status in OrderStatus::iter() {
        match status {
            OrderStatus::CreateInvoice => {
                assert_eq!(required_evidence(status), Some(EvidenceKind::Weighing));
            }
            OrderStatus::SendPhoto => {
                assert_eq!(required_evidence(status), Some(EvidenceKind::Invoice));
            }
            _ => assert_eq!(required_evidence(status), None),
        }
    }
}
