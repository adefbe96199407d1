//! One-shot tick runners for daemons.
//!
//! A daemon hands over the persisted inputs for a tick as a [`SensorTick`] and
//! gets back the [`ExecutionData`] to act on. The context built for the tick
//! is dropped before the evaluation result is handed back, so its instance
//! handle never outlives the tick. Neither runner retries or persists the
//! cursor.
//!
//! A definition and its clones run at most one tick at a time. Starting a
//! tick while another is still evaluating fails with
//! [`SensorError::TickInFlight`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use sensor_types::{ExecutionData, SensorTick};
use tokio::task::{JoinError, JoinHandle};

use crate::context::SensorExecutionContext;
use crate::definition::SensorDefinition;
use crate::error::SensorError;
use crate::instance::InstanceLoader;

/// Evaluate `definition` once on the current thread.
pub fn run_tick(
    definition: &SensorDefinition,
    loader: Arc<dyn InstanceLoader>,
    tick: SensorTick,
) -> Result<ExecutionData, SensorError> {
    let _permit = begin_tick(definition)?;
    evaluate_tick(definition, loader, tick)
}

/// Evaluate `definition` once on tokio's blocking pool.
///
/// A panicking evaluation function becomes [`SensorError::TickPanicked`].
/// When `timeout` elapses the caller gets [`SensorError::TickTimedOut`]
/// carrying a [`PendingTick`]: the evaluation keeps running on its blocking
/// thread and keeps the tick slot until it returns.
pub async fn run_tick_blocking(
    definition: SensorDefinition,
    loader: Arc<dyn InstanceLoader>,
    tick: SensorTick,
    timeout: Option<Duration>,
) -> Result<ExecutionData, SensorError> {
    let permit = begin_tick(&definition)?;
    let sensor_name = definition.name().to_string();
    let mut handle = tokio::task::spawn_blocking(move || {
        let result = evaluate_tick(&definition, loader, tick);
        drop(permit);
        result
    });

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                tracing::warn!(sensor = %sensor_name, ?limit, "Sensor tick timed out");
                return Err(SensorError::TickTimedOut {
                    sensor_name: sensor_name.clone(),
                    timeout: limit,
                    pending: PendingTick {
                        sensor_name,
                        handle,
                    },
                });
            }
        },
        None => handle.await,
    };

    joined.unwrap_or_else(|join_err| Err(join_failure(sensor_name, join_err)))
}

/// An evaluation that outlived its tick timeout.
///
/// Dropping it detaches the evaluation; the tick slot is still held until the
/// evaluation returns.
pub struct PendingTick {
    sensor_name: String,
    handle: JoinHandle<Result<ExecutionData, SensorError>>,
}

impl PendingTick {
    pub fn sensor_name(&self) -> &str {
        &self.sensor_name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the evaluation and return its result.
    pub async fn wait(self) -> Result<ExecutionData, SensorError> {
        match self.handle.await {
            Ok(result) => result,
            Err(join_err) => Err(join_failure(self.sensor_name, join_err)),
        }
    }
}

impl fmt::Debug for PendingTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTick")
            .field("sensor_name", &self.sensor_name)
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}

fn begin_tick(
    definition: &SensorDefinition,
) -> Result<tokio::sync::OwnedSemaphorePermit, SensorError> {
    definition.try_begin_tick().ok_or_else(|| {
        tracing::warn!(sensor = definition.name(), "Sensor tick already in flight");
        SensorError::TickInFlight {
            sensor_name: definition.name().to_string(),
        }
    })
}

fn evaluate_tick(
    definition: &SensorDefinition,
    loader: Arc<dyn InstanceLoader>,
    tick: SensorTick,
) -> Result<ExecutionData, SensorError> {
    let context = SensorExecutionContext::new(tick, loader);
    let result = definition.evaluate(&context);
    drop(context);

    match &result {
        Ok(data) => tracing::info!(
            sensor = definition.name(),
            run_requests = data.run_requests().len(),
            skip_message = data.skip_message().unwrap_or(""),
            "Sensor tick finished"
        ),
        Err(err) => tracing::warn!(sensor = definition.name(), error = %err, "Sensor tick failed"),
    }
    result
}

fn join_failure(sensor_name: String, join_err: JoinError) -> SensorError {
    let message = if join_err.is_panic() {
        panic_message(join_err.into_panic())
    } else {
        join_err.to_string()
    };
    tracing::error!(sensor = %sensor_name, %message, "Sensor tick aborted");
    SensorError::TickPanicked {
        sensor_name,
        message,
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
