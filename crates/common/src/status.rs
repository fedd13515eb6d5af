//! Status handlers publish counters and short strings describing what a component is doing.
//!
//! They are a telemetry sink only: nothing in the relayer reads them back to make decisions.

use std::{
    collections::{btree_map::Entry, BTreeMap},
    fmt::Debug,
    sync::Arc,
};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Counts the transactions that were executed with success.
pub const METRIC_NUM_TRANSACTIONS_SUCCEEDED: &str = "num transactions succeeded";

/// Counts the transactions that ended up rejected.
pub const METRIC_NUM_TRANSACTIONS_REJECTED: &str = "num transactions rejected";

/// Counts the batches that were fully processed.
pub const METRIC_NUM_BATCHES: &str = "num batches";

/// Stores the last warning or error printed by a component.
pub const METRIC_LAST_ERROR: &str = "last encountered error";

/// Stores the step the state machine is currently executing.
pub const METRIC_CURRENT_STATE_MACHINE_STEP: &str = "current state machine step";

/// Counts the transactions sent through a transaction executor.
pub const METRIC_NUM_SENT_TRANSACTIONS: &str = "num sent transactions";

/// Status handler name of the A to B direction.
pub const A_TO_B_STATUS_HANDLER_NAME: &str = "a-to-b";

/// Status handler name of the B to A direction.
pub const B_TO_A_STATUS_HANDLER_NAME: &str = "b-to-a";

/// A single metric value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// An integer counter or gauge.
    Int(i64),

    /// A free-form string.
    Str(String),
}

/// All the metrics of one status handler, keyed by metric name.
pub type GeneralMetrics = BTreeMap<String, MetricValue>;

/// A named sink for metrics.
pub trait StatusHandler: Debug + Send + Sync {
    /// The unique name of this handler.
    fn name(&self) -> &str;

    /// Overwrites an integer metric.
    fn set_int_metric(&self, metric: &str, value: i64);

    /// Adds `delta` to an integer metric, starting from zero.
    fn add_int_metric(&self, metric: &str, delta: i64);

    /// Overwrites a string metric.
    fn set_string_metric(&self, metric: &str, value: &str);

    /// Snapshot of every metric.
    fn all_metrics(&self) -> GeneralMetrics;
}

/// An in-memory [`StatusHandler`].
#[derive(Debug)]
pub struct InMemoryStatusHandler {
    name: String,
    metrics: RwLock<GeneralMetrics>,
}

impl InMemoryStatusHandler {
    /// Creates an empty handler with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metrics: RwLock::new(BTreeMap::new()),
        }
    }

    /// Reads a single integer metric, if present.
    pub fn int_metric(&self, metric: &str) -> Option<i64> {
        match self.metrics.read().get(metric) {
            Some(MetricValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Reads a single string metric, if present.
    pub fn string_metric(&self, metric: &str) -> Option<String> {
        match self.metrics.read().get(metric) {
            Some(MetricValue::Str(v)) => Some(v.clone()),
            _ => None,
        }
    }
}

impl StatusHandler for InMemoryStatusHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_int_metric(&self, metric: &str, value: i64) {
        self.metrics
            .write()
            .insert(metric.to_string(), MetricValue::Int(value));
    }

    fn add_int_metric(&self, metric: &str, delta: i64) {
        let mut metrics = self.metrics.write();
        let entry = metrics
            .entry(metric.to_string())
            .or_insert(MetricValue::Int(0));

        // a string stored under the same name is replaced
        match *entry {
            MetricValue::Int(ref mut v) => *v = v.saturating_add(delta),
            MetricValue::Str(_) => *entry = MetricValue::Int(delta),
        }
    }

    fn set_string_metric(&self, metric: &str, value: &str) {
        self.metrics
            .write()
            .insert(metric.to_string(), MetricValue::Str(value.to_string()));
    }

    fn all_metrics(&self) -> GeneralMetrics {
        self.metrics.read().clone()
    }
}

/// Errors returned by the [`MetricsHolder`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    /// A status handler with the same name was already added.
    #[error("status handler already exists: {0}")]
    StatusHandlerExists(String),

    /// No status handler is registered under the requested name.
    #[error("missing status handler: {0}")]
    MissingStatusHandler(String),
}

/// Registry of all the status handlers of the process.
#[derive(Debug, Default)]
pub struct MetricsHolder {
    handlers: RwLock<BTreeMap<String, Arc<dyn StatusHandler>>>,
}

impl MetricsHolder {
    /// Creates an empty holder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new status handler, failing if its name is already taken.
    pub fn add_status_handler(&self, handler: Arc<dyn StatusHandler>) -> Result<(), StatusError> {
        let mut handlers = self.handlers.write();
        match handlers.entry(handler.name().to_string()) {
            Entry::Occupied(e) => Err(StatusError::StatusHandlerExists(e.key().clone())),
            Entry::Vacant(e) => {
                e.insert(handler);
                Ok(())
            }
        }
    }

    /// Names of all the registered handlers, sorted.
    pub fn available_status_handlers(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }

    /// All metrics of the handler called `name`.
    pub fn all_metrics(&self, name: &str) -> Result<GeneralMetrics, StatusError> {
        self.handlers
            .read()
            .get(name)
            .map(|h| h.all_metrics())
            .ok_or_else(|| StatusError::MissingStatusHandler(name.to_string()))
    }
}
