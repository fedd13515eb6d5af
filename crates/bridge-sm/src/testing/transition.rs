//! Value-based transition testing helpers.
//!
//! These helpers build a state machine positioned on a given step, run it and compare the step it
//! lands on with the expected one.

use std::fmt::Debug;

use tokio_util::sync::CancellationToken;

use crate::{
    state_machine::{BoxedStep, StateMachine},
    step::StepIdentifier,
};

/// Describes one expected move of a state machine.
#[derive(Debug, Clone, Copy)]
pub struct Transition<I> {
    /// The step the machine is on before the tick.
    pub from_state: I,

    /// The step the machine should be on after the tick.
    pub expected_state: I,
}

/// Runs a single tick from `transition.from_state` and checks where the machine ends up.
///
/// Returns the executor so the caller can verify which operations ran.
pub async fn test_transition<I, E>(
    executor: E,
    steps: Vec<BoxedStep<I, E>>,
    transition: Transition<I>,
) -> E
where
    I: StepIdentifier,
    E: Send,
{
    let mut sm = StateMachine::new("test", executor, steps, transition.from_state)
        .expect("state machine must be valid");

    sm.tick(&CancellationToken::new())
        .await
        .expect("step must lead to a registered step");

    assert_eq!(
        sm.current_step(),
        transition.expected_state,
        "State mismatch after transition from {:?}",
        transition.from_state
    );

    sm.into_executor()
}

/// Ticks a state machine repeatedly and records the steps it visited.
pub struct StepSequence<I, E> {
    sm: StateMachine<I, E>,
    visited: Vec<I>,
}

impl<I, E> Debug for StepSequence<I, E>
where
    I: StepIdentifier,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepSequence")
            .field("sm", &self.sm)
            .field("visited", &self.visited)
            .finish()
    }
}

impl<I, E> StepSequence<I, E>
where
    I: StepIdentifier,
    E: Send,
{
    /// Wraps a state machine. Its current step counts as visited.
    pub fn new(sm: StateMachine<I, E>) -> Self {
        let visited = vec![sm.current_step()];
        Self { sm, visited }
    }

    /// Runs `n` ticks.
    pub async fn tick(&mut self, n: usize) -> &mut Self {
        let cancel = CancellationToken::new();
        for _ in 0..n {
            self.sm
                .tick(&cancel)
                .await
                .expect("step must lead to a registered step");
            self.visited.push(self.sm.current_step());
        }
        self
    }

    /// Every step the machine was on, starting with the initial one.
    pub fn visited(&self) -> &[I] {
        &self.visited
    }

    /// The executor shared by the steps.
    pub fn executor(&self) -> &E {
        self.sm.executor()
    }

    /// The executor shared by the steps, mutably.
    pub fn executor_mut(&mut self) -> &mut E {
        self.sm.executor_mut()
    }

    /// Asserts the machine is on `expected`.
    pub fn assert_current(&self, expected: I) -> &Self {
        assert_eq!(
            self.sm.current_step(),
            expected,
            "Current step mismatch, visited: {:?}",
            self.visited
        );
        self
    }
}
