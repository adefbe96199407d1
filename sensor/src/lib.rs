//! Sensor evaluation core
//!
//! A sensor is a polled definition: on every tick a daemon builds a
//! [`SensorExecutionContext`], calls [`SensorDefinition::evaluate`], persists
//! the returned cursor and launches the returned run requests.
//!
//! This crate owns the contract in between:
//! - the execution context and its lazily acquired instance handle
//! - normalization of whatever the evaluation callable returned
//! - assembly of the canonical [`ExecutionData`]
//!
//! It does not decide when to poll, launch runs, or persist cursors.
//! The tick runners allow one in-flight tick per definition. Callers that use
//! [`SensorDefinition::evaluate`] directly must not evaluate the same sensor
//! concurrently with itself.

pub mod config;
pub mod context;
pub mod definition;
pub mod error;
pub mod evaluation;
pub mod execution;
pub mod instance;
pub mod naming;
pub mod scope;
pub mod telemetry;
pub mod tick;

pub use config::{LogFormat, SensorConfig};
pub use context::SensorExecutionContext;
pub use definition::{EvaluationFn, SensorDefinition, SensorDefinitionBuilder};
pub use error::{DefinitionError, SensorError};
pub use evaluation::{normalize_evaluation, SensorEvaluation};
pub use execution::build_execution_data;
pub use instance::{InstanceError, InstanceLoader, OrchestrationInstance};
pub use naming::check_valid_name;
pub use scope::ExitStack;
pub use tick::{run_tick, run_tick_blocking, PendingTick};

pub use sensor_types::{
    ExecutionData, ExecutionDataError, InstanceRef, JobType, RunRequest, SensorOutcome,
    SensorTick, SkipReason, DEFAULT_MODE_NAME, DEFAULT_SENSOR_DAEMON_INTERVAL,
};
