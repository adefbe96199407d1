use std::time::Duration;

use sensor_types::ExecutionDataError;

use crate::instance::InstanceError;
use crate::tick::PendingTick;

/// Definition-time validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    #[error("\"{name}\" is not a valid name. Names must be non-empty and contain only letters, digits and underscores")]
    InvalidName { name: String },
    #[error("\"{name}\" is a reserved name and cannot be used for a definition")]
    ReservedName { name: String },
    #[error("Sensor \"{sensor_name}\" must target a non-empty job name")]
    EmptyTargetJob { sensor_name: String },
    #[error("Sensor \"{sensor_name}\": minimum_interval_seconds must be a positive integer")]
    InvalidMinimumInterval { sensor_name: String },
    #[error("Sensor \"{sensor_name}\": selection entries must be non-empty strings")]
    InvalidSelection { sensor_name: String },
    #[error("Sensor \"{sensor_name}\": selection contains \"{item}\" more than once")]
    DuplicateSelection { sensor_name: String, item: String },
    #[error("Sensor \"{sensor_name}\" has no evaluation function")]
    MissingEvaluationFn { sensor_name: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("Error in sensor {sensor_name}: Sensor unexpectedly returned output {value} of type {type_name}. Should only return SkipReason or RunRequest objects.")]
    InvariantViolation {
        sensor_name: String,
        value: String,
        type_name: String,
    },

    #[error("Error in sensor {sensor_name}: item {index} of a multi-item result is a {found}; every item must be a RunRequest when more than one is returned")]
    TypeMismatch {
        sensor_name: String,
        index: usize,
        found: String,
    },

    #[error(transparent)]
    ExecutionData(#[from] ExecutionDataError),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("Failed to acquire orchestration instance: {0}")]
    ResourceAcquisition(#[from] InstanceError),

    #[error("Error in sensor {sensor_name}: evaluation function failed: {source}")]
    Evaluation {
        sensor_name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Error in sensor {sensor_name}: evaluation panicked: {message}")]
    TickPanicked { sensor_name: String, message: String },

    /// The evaluation is still running; `pending` yields its result once it
    /// finishes and keeps the sensor's tick slot until then.
    #[error("Error in sensor {sensor_name}: evaluation did not finish within {timeout:?}")]
    TickTimedOut {
        sensor_name: String,
        timeout: Duration,
        pending: PendingTick,
    },

    #[error("Error in sensor {sensor_name}: previous tick is still in flight")]
    TickInFlight { sensor_name: String },
}

impl SensorError {
    pub(crate) fn invariant_violation(
        sensor_name: &str,
        value: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self::InvariantViolation {
            sensor_name: sensor_name.to_string(),
            value: value.into(),
            type_name: type_name.into(),
        }
    }

    /// True for failures raised while constructing a definition or a result.
    pub fn is_construction_error(&self) -> bool {
        matches!(self, Self::ExecutionData(_) | Self::Definition(_))
    }
}
