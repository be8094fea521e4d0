//! Property-based tests for the transaction state machine.

use proptest::prelude::*;

use crate::transaction::error::TransactionError;
use crate::transaction::types::TransactionStatus;
use crate::transaction::validator::TransactionValidator;

fn arb_status() -> impl Strategy<Value = TransactionStatus> {
    prop::sample::select(TransactionStatus::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Terminal statuses accept no transition.
    #[test]
    fn prop_terminal_statuses_are_final(from in arb_status(), to in arb_status()) {
        if from.is_terminal() {
            prop_assert!(!from.can_transition_to(to));
        }
    }

    /// No status transitions to itself.
    #[test]
    fn prop_no_self_transition(status in arb_status()) {
        prop_assert!(!status.can_transition_to(status));
    }

    /// The validator agrees with the table and reports both ends on refusal.
    #[test]
    fn prop_validator_matches_table(from in arb_status(), to in arb_status()) {
        match TransactionValidator::validate_transition(from, to) {
            Ok(()) => prop_assert!(from.can_transition_to(to)),
            Err(TransactionError::InvalidStatusTransition { from: f, to: t }) => {
                prop_assert!(!from.can_transition_to(to));
                prop_assert_eq!(f, from);
                prop_assert_eq!(t, to);
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    /// Only in-flight purchases can be cancelled.
    #[test]
    fn prop_cancel_only_in_flight(from in arb_status()) {
        prop_assert_eq!(
            from.can_transition_to(TransactionStatus::Cancelled),
            from.is_in_flight()
        );
    }

    /// Every status is reachable from PENDING by following the table.
    #[test]
    fn prop_reachable_from_pending(target in arb_status()) {
        let mut seen = vec![TransactionStatus::Pending];
        let mut frontier = vec![TransactionStatus::Pending];
        while let Some(current) = frontier.pop() {
            for next in TransactionStatus::ALL {
                if current.can_transition_to(next) && !seen.contains(&next) {
                    seen.push(next);
                    frontier.push(next);
                }
            }
        }
        prop_assert!(seen.contains(&target));
    }
}
