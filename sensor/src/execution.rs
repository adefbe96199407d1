//! Assembly of [`ExecutionData`] from normalized decision items.

use sensor_types::{ExecutionData, SensorOutcome};

use crate::error::SensorError;

/// Build the canonical result for one evaluation.
///
/// - no items: nothing requested, no skip message
/// - one item: either a single run request or a skip
/// - several items: every item must be a run request
///
/// `cursor` must be read from the context after the evaluation function ran.
pub fn build_execution_data(
    sensor_name: &str,
    items: Vec<SensorOutcome>,
    cursor: Option<String>,
) -> Result<ExecutionData, SensorError> {
    let (run_requests, skip_message) = match items.len() {
        0 => (Vec::new(), None),
        1 => match items.into_iter().next() {
            Some(SensorOutcome::Run(run)) => (vec![run], None),
            Some(SensorOutcome::Skip(skip)) => (Vec::new(), skip.skip_message),
            None => (Vec::new(), None),
        },
        _ => {
            let mut run_requests = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                match item {
                    SensorOutcome::Run(run) => run_requests.push(run),
                    other => {
                        return Err(SensorError::TypeMismatch {
                            sensor_name: sensor_name.to_string(),
                            index,
                            found: other.kind().to_string(),
                        })
                    }
                }
            }
            (run_requests, None)
        }
    };

    Ok(ExecutionData::new(run_requests, skip_message, cursor)?)
}
