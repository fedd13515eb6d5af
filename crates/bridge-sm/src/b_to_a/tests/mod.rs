//! Tests for the B→A state machine.

use std::collections::BTreeMap;

use bridge_relayer_primitives::batch::DepositStatus::{self, Executed, Rejected, Unresolved};

use crate::{
    b_to_a::{create_state_machine, state::BToAStep::*, steps},
    testing::{
        executor::{batch_with_nonces, MockExecutor, SET_STATUS_ACTION_ID},
        transition::{test_transition, StepSequence, Transition},
    },
};

/// Chain-B serves batch 5 with two deposits. One other relayer already signed it for Chain-A
/// and two already signed the status update on Chain-B.
fn executor_with_batch_five() -> MockExecutor {
    MockExecutor {
        pending_on_b: Some(batch_with_nonces(5, &[1, 2], 10)),
        signatures_on_a: 1,
        signatures_on_b: BTreeMap::from([(SET_STATUS_ACTION_ID, 2)]),
        ..MockExecutor::new()
    }
}

fn stored_statuses(executor: &MockExecutor) -> Vec<DepositStatus> {
    executor
        .batch
        .as_ref()
        .map(|b| b.statuses.clone())
        .unwrap_or_default()
}

#[tokio::test]
async fn leader_relays_batch_and_sets_statuses() {
    let executor = MockExecutor {
        signatures_on_a: 2,
        ..executor_with_batch_five()
    };
    let mut seq = StepSequence::new(create_state_machine("b-to-a", executor).unwrap());

    seq.tick(12).await;
    assert_eq!(
        seq.visited(),
        &[
            GetPendingFromB,
            SignProposedTransferOnA,
            WaitForQuorumOnTransfer,
            PerformTransfer,
            WaitTransferConfirmation,
            PerformTransfer,
            ResolveSetStatus,
            ProposeSetStatusOnB,
            SignProposedSetStatusOnB,
            WaitForQuorumOnSetStatus,
            PerformSetStatusOnB,
            PerformSetStatusOnB,
            GetPendingFromB,
        ]
    );

    let executor = seq.executor();
    assert_eq!(executor.count("sign_transfer_on_a"), 1);
    assert_eq!(executor.count("perform_transfer_on_a"), 1);
    assert_eq!(executor.count("propose_set_status_on_b"), 1);
    assert_eq!(executor.count("perform_action_on_b"), 1);
    assert_eq!(stored_statuses(executor), vec![Executed, Executed]);
    assert!(executor.errors.lock().is_empty());
}

#[tokio::test]
async fn restarted_relayer_resumes_at_status_resolution() {
    let executor = MockExecutor {
        performed_on_a: true,
        statuses_on_a: vec![Executed, Rejected],
        ..executor_with_batch_five()
    };
    let mut seq = StepSequence::new(create_state_machine("b-to-a", executor).unwrap());

    seq.tick(2).await;
    assert_eq!(
        seq.visited(),
        &[GetPendingFromB, ResolveSetStatus, ProposeSetStatusOnB]
    );
    assert_eq!(stored_statuses(seq.executor()), vec![Executed, Rejected]);

    seq.tick(5).await;
    seq.assert_current(GetPendingFromB);

    let executor = seq.executor();
    assert_eq!(executor.count("sign_transfer_on_a"), 0);
    assert_eq!(executor.count("perform_transfer_on_a"), 0);
    assert_eq!(executor.count("propose_set_status_on_b"), 1);
    assert_eq!(executor.count("perform_action_on_b"), 1);
}

#[tokio::test]
async fn quorum_on_transfer_not_reached() {
    let executor = MockExecutor {
        max_retries_on_a: 2,
        ..executor_with_batch_five()
    };
    let mut seq = StepSequence::new(create_state_machine("b-to-a", executor).unwrap());

    seq.tick(5).await;
    assert_eq!(
        &seq.visited()[2..],
        &[
            WaitForQuorumOnTransfer,
            WaitForQuorumOnTransfer,
            WaitForQuorumOnTransfer,
            GetPendingFromB,
        ]
    );
    assert_eq!(seq.executor().count("perform_transfer_on_a"), 0);

    // the retry budget is granted again with the next batch
    seq.tick(1).await;
    assert_eq!(seq.executor().retries_on_a, 0);
}

#[tokio::test]
async fn non_leader_waits_for_confirmation() {
    let executor = MockExecutor {
        leader: false,
        batch: Some(batch_with_nonces(5, &[1, 2], 10)),
        ..MockExecutor::new()
    };

    let executor = test_transition(
        executor,
        steps(),
        Transition {
            from_state: PerformTransfer,
            expected_state: WaitTransferConfirmation,
        },
    )
    .await;

    assert_eq!(executor.count("perform_transfer_on_a"), 0);
}

#[tokio::test]
async fn confirmation_always_returns_to_perform() {
    test_transition(
        MockExecutor::new(),
        steps(),
        Transition {
            from_state: WaitTransferConfirmation,
            expected_state: PerformTransfer,
        },
    )
    .await;
}

#[tokio::test]
async fn deposits_added_on_b_are_rejected() {
    let executor = MockExecutor {
        batch: Some(batch_with_nonces(5, &[1, 2], 10)),
        pending_on_b: Some(batch_with_nonces(5, &[1, 2, 3], 10)),
        statuses_on_a: vec![Executed, Executed],
        ..MockExecutor::new()
    };

    let executor = test_transition(
        executor,
        steps(),
        Transition {
            from_state: ResolveSetStatus,
            expected_state: ProposeSetStatusOnB,
        },
    )
    .await;

    assert_eq!(stored_statuses(&executor), vec![Executed, Executed, Rejected]);
}

#[tokio::test]
async fn resolution_without_statuses_restarts() {
    let executor = MockExecutor {
        batch: Some(batch_with_nonces(5, &[1, 2], 10)),
        pending_on_b: Some(batch_with_nonces(5, &[1, 2], 10)),
        ..MockExecutor::new()
    };

    let executor = test_transition(
        executor,
        steps(),
        Transition {
            from_state: ResolveSetStatus,
            expected_state: GetPendingFromB,
        },
    )
    .await;

    assert_eq!(stored_statuses(&executor), vec![Unresolved, Unresolved]);
}

#[tokio::test]
async fn resolution_without_batch_on_b_restarts() {
    let executor = MockExecutor {
        batch: Some(batch_with_nonces(5, &[1], 10)),
        statuses_on_a: vec![Executed],
        ..MockExecutor::new()
    };

    let executor = test_transition(
        executor,
        steps(),
        Transition {
            from_state: ResolveSetStatus,
            expected_state: GetPendingFromB,
        },
    )
    .await;

    assert!(executor.logged("nil batch fetched"));
}

#[tokio::test]
async fn set_status_proposal_is_bounded_for_non_leaders() {
    let executor = MockExecutor {
        leader: false,
        batch: Some(batch_with_nonces(5, &[1], 10)),
        max_retries_on_was_proposed: 1,
        ..MockExecutor::new()
    };
    let sm = crate::state_machine::StateMachine::new("b-to-a", executor, steps(), ProposeSetStatusOnB)
        .unwrap();
    let mut seq = StepSequence::new(sm);

    seq.tick(2).await;
    assert_eq!(
        seq.visited(),
        &[ProposeSetStatusOnB, ProposeSetStatusOnB, GetPendingFromB]
    );
    assert_eq!(seq.executor().count("propose_set_status_on_b"), 0);
}

#[tokio::test]
async fn failures_while_fetching_keep_polling() {
    for operation in [
        "get_batch_from_b",
        "validate_batch",
        "was_transfer_performed_on_a",
        "check_available_tokens",
    ] {
        let mut executor = executor_with_batch_five();
        executor.fail(operation);

        let executor = test_transition(
            executor,
            steps(),
            Transition {
                from_state: GetPendingFromB,
                expected_state: GetPendingFromB,
            },
        )
        .await;

        assert_eq!(executor.count("sign_transfer_on_a"), 0, "failing {operation}");
    }
}

#[tokio::test]
async fn steps_without_batch_restart() {
    for from_state in [
        SignProposedTransferOnA,
        ResolveSetStatus,
        ProposeSetStatusOnB,
        SignProposedSetStatusOnB,
    ] {
        let executor = test_transition(
            MockExecutor::new(),
            steps(),
            Transition {
                from_state,
                expected_state: GetPendingFromB,
            },
        )
        .await;

        assert!(executor.logged("nil batch"), "from {from_state}");
    }
}

#[tokio::test]
async fn invalid_batch_from_b_is_never_signed() {
    let executor = MockExecutor {
        batch_valid: false,
        ..executor_with_batch_five()
    };
    let mut seq = StepSequence::new(create_state_machine("b-to-a", executor).unwrap());

    seq.tick(3).await;
    assert_eq!(
        seq.visited(),
        &[GetPendingFromB, GetPendingFromB, GetPendingFromB, GetPendingFromB]
    );

    let executor = seq.executor();
    assert_eq!(executor.count("sign_transfer_on_a"), 0);
    assert!(executor.logged("batch 5 not valid"));
}
