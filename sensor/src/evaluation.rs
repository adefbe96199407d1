//! Normalization of evaluation function results.
//!
//! An evaluation function may return nothing, one decision, a batch of
//! decisions, a lazily produced stream, or a JSON value from a sensor hosted
//! behind a serialized boundary. [`normalize_evaluation`] collapses all of
//! these into an ordered list of [`SensorOutcome`]s.

use std::fmt;

use sensor_types::{RunRequest, SensorOutcome, SkipReason};

use crate::error::SensorError;

type OutcomeStream = Box<dyn Iterator<Item = Option<SensorOutcome>> + Send>;

/// Raw return value of a sensor evaluation function.
pub enum SensorEvaluation {
    Empty,
    Skip(SkipReason),
    Run(RunRequest),
    Outcomes(Vec<SensorOutcome>),
    /// Drained eagerly during normalization. A `None` item is rejected.
    Stream(OutcomeStream),
    /// Untyped result, decoded during normalization.
    Json(serde_json::Value),
}

impl SensorEvaluation {
    pub fn lazy<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
        T: Into<SensorOutcome>,
    {
        Self::Stream(Box::new(items.into_iter().map(|item| Some(item.into()))))
    }

    pub fn lazy_optional<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Option<SensorOutcome>>,
        I::IntoIter: Send + 'static,
    {
        Self::Stream(Box::new(items.into_iter()))
    }
}

impl fmt::Debug for SensorEvaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Skip(skip) => f.debug_tuple("Skip").field(skip).finish(),
            Self::Run(run) => f.debug_tuple("Run").field(run).finish(),
            Self::Outcomes(items) => f.debug_tuple("Outcomes").field(items).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
        }
    }
}

impl From<()> for SensorEvaluation {
    fn from(_: ()) -> Self {
        Self::Empty
    }
}

impl From<SkipReason> for SensorEvaluation {
    fn from(value: SkipReason) -> Self {
        Self::Skip(value)
    }
}

impl From<RunRequest> for SensorEvaluation {
    fn from(value: RunRequest) -> Self {
        Self::Run(value)
    }
}

impl From<SensorOutcome> for SensorEvaluation {
    fn from(value: SensorOutcome) -> Self {
        match value {
            SensorOutcome::Skip(skip) => Self::Skip(skip),
            SensorOutcome::Run(run) => Self::Run(run),
        }
    }
}

impl From<Vec<SensorOutcome>> for SensorEvaluation {
    fn from(value: Vec<SensorOutcome>) -> Self {
        Self::Outcomes(value)
    }
}

impl From<Vec<RunRequest>> for SensorEvaluation {
    fn from(value: Vec<RunRequest>) -> Self {
        Self::Outcomes(value.into_iter().map(SensorOutcome::Run).collect())
    }
}

impl From<serde_json::Value> for SensorEvaluation {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl<T: Into<SensorEvaluation>> From<Option<T>> for SensorEvaluation {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

/// Collect an evaluation result into its ordered decision items.
///
/// Order and duplicates are preserved. Unrecognized shapes and null items fail
/// with [`SensorError::InvariantViolation`].
pub fn normalize_evaluation(
    sensor_name: &str,
    evaluation: SensorEvaluation,
) -> Result<Vec<SensorOutcome>, SensorError> {
    let items = match evaluation {
        SensorEvaluation::Empty => Vec::new(),
        SensorEvaluation::Skip(skip) => vec![SensorOutcome::Skip(skip)],
        SensorEvaluation::Run(run) => vec![SensorOutcome::Run(run)],
        SensorEvaluation::Outcomes(items) => items,
        SensorEvaluation::Stream(stream) => {
            let mut items = Vec::new();
            for item in stream {
                match item {
                    Some(outcome) => items.push(outcome),
                    None => return Err(SensorError::invariant_violation(sensor_name, "null", "null")),
                }
            }
            items
        }
        SensorEvaluation::Json(value) => normalize_json(sensor_name, value)?,
    };

    tracing::debug!(sensor = sensor_name, items = items.len(), "Normalized sensor evaluation");
    Ok(items)
}

fn normalize_json(
    sensor_name: &str,
    value: serde_json::Value,
) -> Result<Vec<SensorOutcome>, SensorError> {
    match value {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Array(elements) => elements
            .into_iter()
            .map(|element| decode_json_item(sensor_name, element))
            .collect(),
        other @ serde_json::Value::Object(_) => Ok(vec![decode_json_item(sensor_name, other)?]),
        other => Err(unrecognized(sensor_name, &other)),
    }
}

fn decode_json_item(
    sensor_name: &str,
    value: serde_json::Value,
) -> Result<SensorOutcome, SensorError> {
    if !value.is_object() {
        return Err(unrecognized(sensor_name, &value));
    }
    serde_json::from_value::<SensorOutcome>(value.clone())
        .map_err(|_| unrecognized(sensor_name, &value))
}

fn unrecognized(sensor_name: &str, value: &serde_json::Value) -> SensorError {
    SensorError::invariant_violation(sensor_name, value.to_string(), json_type_name(value))
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
