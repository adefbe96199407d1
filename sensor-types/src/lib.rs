//! Shared sensor types
//!
//! These types are used by:
//! - the sensor evaluation core (native Rust)
//! - tick daemons persisting cursors and launching runs
//! - UI consumers reading sensor results (TypeScript bindings via ts-rs)
//!
//! Serializable with serde; field presence, not type tags, distinguishes a
//! skipped tick from one that requested runs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Constants
// ============================================================================

/// Mode applied to runs launched by a sensor that does not name one.
pub const DEFAULT_MODE_NAME: &str = "default";

/// Minimum number of seconds between two evaluations of the same sensor.
pub const DEFAULT_SENSOR_DAEMON_INTERVAL: u32 = 30;

// ============================================================================
// Run decisions
// ============================================================================

/// Which kind of definition originated a job launch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "../../bindings/sensor.ts")]
pub enum JobType {
    Schedule,
    Sensor,
}

/// Request to launch one run of the sensor's target job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../bindings/sensor.ts")]
pub struct RunRequest {
    /// Idempotency key; the instance refuses to launch two runs with the same key.
    #[serde(default)]
    pub run_key: Option<String>,

    /// Run configuration handed to the job.
    #[serde(default = "empty_run_config")]
    #[ts(type = "unknown")]
    pub run_config: serde_json::Value,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

fn empty_run_config() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl RunRequest {
    pub fn new() -> Self {
        Self {
            run_key: None,
            run_config: empty_run_config(),
            tags: BTreeMap::new(),
        }
    }

    pub fn with_run_key(mut self, run_key: impl Into<String>) -> Self {
        self.run_key = Some(run_key.into());
        self
    }

    pub fn with_run_config(mut self, run_config: serde_json::Value) -> Self {
        self.run_config = run_config;
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

impl Default for RunRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Explanation for why a tick launched nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "../../bindings/sensor.ts")]
pub struct SkipReason {
    #[serde(default)]
    pub skip_message: Option<String>,
}

impl SkipReason {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            skip_message: Some(message.into()),
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.skip_message.as_deref()
    }
}

/// One decision produced by a sensor evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(tag = "type")]
#[ts(export, export_to = "../../bindings/sensor.ts")]
pub enum SensorOutcome {
    #[serde(rename = "SkipReason")]
    Skip(SkipReason),
    #[serde(rename = "RunRequest")]
    Run(RunRequest),
}

impl SensorOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            SensorOutcome::Skip(_) => "SkipReason",
            SensorOutcome::Run(_) => "RunRequest",
        }
    }
}

impl From<SkipReason> for SensorOutcome {
    fn from(value: SkipReason) -> Self {
        SensorOutcome::Skip(value)
    }
}

impl From<RunRequest> for SensorOutcome {
    fn from(value: RunRequest) -> Self {
        SensorOutcome::Run(value)
    }
}

// ============================================================================
// Execution Data
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionDataError {
    #[error("Found both skip data and run request data (skip message: {skip_message:?}, {run_request_count} run requests)")]
    ConflictingOutcome {
        skip_message: String,
        run_request_count: usize,
    },
}

/// Canonical result of one sensor evaluation.
///
/// A non-empty `run_requests` and a `skip_message` never coexist; construction
/// (and deserialization) rejects the combination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "ExecutionDataRecord")]
pub struct ExecutionData {
    run_requests: Vec<RunRequest>,
    skip_message: Option<String>,
    cursor: Option<String>,
}

impl ExecutionData {
    pub fn new(
        run_requests: Vec<RunRequest>,
        skip_message: Option<String>,
        cursor: Option<String>,
    ) -> Result<Self, ExecutionDataError> {
        if let Some(message) = &skip_message {
            if !run_requests.is_empty() {
                return Err(ExecutionDataError::ConflictingOutcome {
                    skip_message: message.clone(),
                    run_request_count: run_requests.len(),
                });
            }
        }

        Ok(Self {
            run_requests,
            skip_message,
            cursor,
        })
    }

    pub fn run_requests(&self) -> &[RunRequest] {
        &self.run_requests
    }

    pub fn skip_message(&self) -> Option<&str> {
        self.skip_message.as_deref()
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// False both for an explicit skip and for an empty result.
    pub fn has_run_requests(&self) -> bool {
        !self.run_requests.is_empty()
    }

    pub fn into_parts(self) -> (Vec<RunRequest>, Option<String>, Option<String>) {
        (self.run_requests, self.skip_message, self.cursor)
    }
}

/// Wire shape of [`ExecutionData`], as written by external encoders.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../bindings/sensor.ts")]
pub struct ExecutionDataRecord {
    #[serde(default)]
    pub run_requests: Vec<RunRequest>,
    pub skip_message: Option<String>,
    pub cursor: Option<String>,
}

impl TryFrom<ExecutionDataRecord> for ExecutionData {
    type Error = ExecutionDataError;

    fn try_from(record: ExecutionDataRecord) -> Result<Self, Self::Error> {
        ExecutionData::new(record.run_requests, record.skip_message, record.cursor)
    }
}

impl From<ExecutionData> for ExecutionDataRecord {
    fn from(data: ExecutionData) -> Self {
        Self {
            run_requests: data.run_requests,
            skip_message: data.skip_message,
            cursor: data.cursor,
        }
    }
}

// ============================================================================
// Tick inputs
// ============================================================================

/// Serialized handle to the orchestration instance. Opaque to the sensor core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(transparent)]
#[ts(export, export_to = "../../bindings/sensor.ts")]
pub struct InstanceRef(#[ts(type = "unknown")] pub serde_json::Value);

impl InstanceRef {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Everything a daemon supplies to evaluate a sensor once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../bindings/sensor.ts")]
pub struct SensorTick {
    pub instance_ref: InstanceRef,
    /// Deprecated: seconds since the epoch of the previous evaluation.
    #[serde(default)]
    pub last_completion_time: Option<f64>,
    /// Deprecated: run key of the most recent run requested by this sensor.
    #[serde(default)]
    pub last_run_key: Option<String>,
    /// Cursor persisted from the previous tick.
    #[serde(default)]
    pub cursor: Option<String>,
}

impl SensorTick {
    pub fn new(instance_ref: InstanceRef) -> Self {
        Self {
            instance_ref,
            last_completion_time: None,
            last_run_key: None,
            cursor: None,
        }
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    pub fn with_last_completion_time(mut self, epoch_seconds: f64) -> Self {
        self.last_completion_time = Some(epoch_seconds);
        self
    }

    pub fn with_last_run_key(mut self, run_key: impl Into<String>) -> Self {
        self.last_run_key = Some(run_key.into());
        self
    }
}

/// Convert a floating epoch timestamp into a UTC datetime.
///
/// Returns `None` for non-finite or out-of-range values.
pub fn epoch_seconds_to_datetime(epoch_seconds: f64) -> Option<DateTime<Utc>> {
    if !epoch_seconds.is_finite() {
        return None;
    }
    let secs = epoch_seconds.floor();
    let nanos = ((epoch_seconds - secs) * 1_000_000_000.0).round() as u32;
    if secs < i64::MIN as f64 || secs > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp(secs as i64, nanos.min(999_999_999))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ts_rs::Config;

    #[test]
    fn test_execution_data_rejects_skip_with_runs() {
        let err = ExecutionData::new(
            vec![RunRequest::new().with_run_key("a")],
            Some("nothing to do".to_string()),
            None,
        )
        .unwrap_err();

        assert_eq!(
            err,
            ExecutionDataError::ConflictingOutcome {
                skip_message: "nothing to do".to_string(),
                run_request_count: 1,
            }
        );
    }

    #[test]
    fn test_execution_data_allows_skip_without_runs() {
        let data = ExecutionData::new(vec![], Some("no new files".to_string()), None).unwrap();
        assert!(!data.has_run_requests());
        assert_eq!(data.skip_message(), Some("no new files"));
    }

    #[test]
    fn test_empty_execution_data_has_no_runs_and_no_skip_message() {
        let data = ExecutionData::new(vec![], None, Some("c1".to_string())).unwrap();
        assert!(!data.has_run_requests());
        assert_eq!(data.skip_message(), None);
    }

    #[test]
    fn test_execution_data_serialized_shape() {
        let data = ExecutionData::new(
            vec![RunRequest::new().with_run_key("a")],
            None,
            Some("42".to_string()),
        )
        .unwrap();

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["skip_message"], serde_json::Value::Null);
        assert_eq!(json["cursor"], "42");
        assert_eq!(json["run_requests"][0]["run_key"], "a");
        assert_eq!(json["run_requests"][0]["run_config"], serde_json::json!({}));
    }

    #[test]
    fn test_execution_data_deserialize_enforces_invariant() {
        let raw = serde_json::json!({
            "run_requests": [{"run_key": "a"}],
            "skip_message": "skip",
            "cursor": null,
        });
        let result: Result<ExecutionData, _> = serde_json::from_value(raw);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Found both skip data and run request data"));
    }

    #[test]
    fn test_sensor_outcome_is_tagged() {
        let outcome = SensorOutcome::from(SkipReason::new("quiet"));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["type"], "SkipReason");
        assert_eq!(json["skip_message"], "quiet");

        let parsed: SensorOutcome =
            serde_json::from_value(serde_json::json!({"type": "RunRequest", "run_key": "k"}))
                .unwrap();
        assert_eq!(parsed, SensorOutcome::Run(RunRequest::new().with_run_key("k")));
    }

    #[test]
    fn test_job_type_serialization() {
        let json = serde_json::to_string(&JobType::Sensor).unwrap();
        assert_eq!(json, "\"SENSOR\"");
    }

    #[test]
    fn test_sensor_tick_defaults_optional_fields() {
        let tick: SensorTick =
            serde_json::from_value(serde_json::json!({"instance_ref": {"path": "/tmp/x"}}))
                .unwrap();
        assert_eq!(tick.cursor, None);
        assert_eq!(tick.last_run_key, None);
        assert_eq!(tick.instance_ref.as_value()["path"], "/tmp/x");
    }

    #[test]
    fn test_epoch_seconds_to_datetime() {
        let dt = epoch_seconds_to_datetime(1_600_000_000.5).unwrap();
        assert_eq!(dt.timestamp(), 1_600_000_000);
        assert_eq!(dt.timestamp_subsec_millis(), 500);
        assert!(epoch_seconds_to_datetime(f64::NAN).is_none());
    }

    #[test]
    fn export_types() {
        // The export_to attribute in each type's #[ts] macro specifies the output file
        let config = Config::default();
        JobType::export(&config).unwrap();
        RunRequest::export(&config).unwrap();
        SkipReason::export(&config).unwrap();
        SensorOutcome::export(&config).unwrap();
        ExecutionDataRecord::export(&config).unwrap();
        InstanceRef::export(&config).unwrap();
        SensorTick::export(&config).unwrap();
    }
}
