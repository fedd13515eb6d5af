//! Generic state machine runner.
//!
//! A [`StateMachine`] owns a set of [`Step`]s keyed by identifier and the executor they share. Each
//! call to [`StateMachine::tick`] runs exactly one step; [`StateMachine::run`] keeps ticking on a
//! fixed interval until cancelled.

use std::{collections::BTreeMap, sync::Arc, time::Instant};

use bridge_relayer_common::status::{StatusHandler, METRIC_CURRENT_STATE_MACHINE_STEP};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{config::RunnerConfig, errors::StateMachineError, step::Step};

/// A boxed step of a state machine identified by `I` and driving executor `E`.
pub type BoxedStep<I, E> = Box<dyn Step<E, Id = I>>;

/// Drives the steps of one bridge direction.
pub struct StateMachine<I, E> {
    name: String,
    steps: BTreeMap<I, BoxedStep<I, E>>,
    current: I,
    executor: E,
    status_handler: Option<Arc<dyn StatusHandler>>,
}

impl<I, E> std::fmt::Debug for StateMachine<I, E>
where
    I: crate::step::StepIdentifier,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("name", &self.name)
            .field("steps", &self.steps.keys().collect::<Vec<_>>())
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl<I, E> StateMachine<I, E>
where
    I: crate::step::StepIdentifier,
    E: Send,
{
    /// Creates a state machine starting at `initial`.
    ///
    /// Fails if `steps` is empty, if two steps share an identifier or if `initial` has no step.
    pub fn new(
        name: impl Into<String>,
        executor: E,
        steps: Vec<BoxedStep<I, E>>,
        initial: I,
    ) -> Result<Self, StateMachineError> {
        if steps.is_empty() {
            return Err(StateMachineError::NoSteps);
        }

        let mut map = BTreeMap::new();
        for step in steps {
            let id = step.identifier();
            if map.insert(id, step).is_some() {
                return Err(StateMachineError::DuplicatedStepIdentifier(id.to_string()));
            }
        }

        if !map.contains_key(&initial) {
            return Err(StateMachineError::StepNotFound(initial.to_string()));
        }

        Ok(Self {
            name: name.into(),
            steps: map,
            current: initial,
            executor,
            status_handler: None,
        })
    }

    /// Publishes the current step on `handler` on every tick.
    pub fn with_status_handler(mut self, handler: Arc<dyn StatusHandler>) -> Self {
        self.status_handler = Some(handler);
        self
    }

    /// The step the next tick will run.
    pub const fn current_step(&self) -> I {
        self.current
    }

    /// The shared executor.
    pub const fn executor(&self) -> &E {
        &self.executor
    }

    /// The shared executor, mutably.
    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    /// Consumes the state machine and returns its executor.
    pub fn into_executor(self) -> E {
        self.executor
    }

    /// Runs the current step and moves to the one it returned.
    ///
    /// An unknown next step leaves the current step untouched and is reported as an error.
    pub async fn tick(&mut self, cancel: &CancellationToken) -> Result<(), StateMachineError> {
        let step = self
            .steps
            .get(&self.current)
            .ok_or_else(|| StateMachineError::StepNotFound(self.current.to_string()))?;

        if let Some(handler) = &self.status_handler {
            handler.set_string_metric(METRIC_CURRENT_STATE_MACHINE_STEP, &self.current.to_string());
        }

        let next = step.execute(&mut self.executor, cancel).await;
        if !self.steps.contains_key(&next) {
            return Err(StateMachineError::StepNotFound(next.to_string()));
        }

        if next != self.current {
            debug!(name = %self.name, from = %self.current, to = %next, "state machine transition");
        }
        self.current = next;

        Ok(())
    }

    /// Ticks every `config.step_interval` until `cancel` fires.
    ///
    /// Returns early, with the error, if a step leads nowhere.
    pub async fn run(
        mut self,
        config: RunnerConfig,
        cancel: CancellationToken,
    ) -> Result<(), StateMachineError> {
        config.validate()?;

        let mut interval = tokio::time::interval(config.step_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(name = %self.name, initial = %self.current, interval = ?config.step_interval, "state machine started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(name = %self.name, "state machine stopped");
                    return Ok(());
                }
                _ = interval.tick() => {
                    let step = self.current;
                    let start = Instant::now();

                    let res = tokio::select! {
                        _ = cancel.cancelled() => None,
                        res = self.tick(&cancel) => Some(res),
                    };
                    match res {
                        None => {
                            info!(name = %self.name, %step, "state machine stopped during step");
                            return Ok(());
                        }
                        Some(Err(e)) => {
                            error!(name = %self.name, %step, %e, "state machine halted");
                            return Err(e);
                        }
                        Some(Ok(())) => {}
                    }

                    if config.profile_mode {
                        info!(name = %self.name, %step, elapsed = ?start.elapsed(), "step executed");
                    }
                }
            }
        }
    }
}
