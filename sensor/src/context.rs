//! Per-tick execution context handed to sensor evaluation functions.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::unsync::OnceCell;
use sensor_types::{epoch_seconds_to_datetime, InstanceRef, SensorTick};
use ulid::Ulid;

use crate::error::SensorError;
use crate::instance::{InstanceError, InstanceLoader, OrchestrationInstance};
use crate::scope::ExitStack;

/// Scope object for one sensor evaluation.
///
/// Everything is read-only except the cursor. The orchestration instance is
/// acquired on the first call to [`instance`](Self::instance) and released
/// when the context is dropped, whether evaluation returned, failed or
/// panicked.
pub struct SensorExecutionContext {
    tick_id: Ulid,
    instance_ref: InstanceRef,
    last_completion_time: Option<f64>,
    last_run_key: Option<String>,
    cursor: RefCell<Option<String>>,
    loader: Arc<dyn InstanceLoader>,
    instance: OnceCell<Result<Arc<dyn OrchestrationInstance>, InstanceError>>,
    exit_stack: ExitStack,
}

impl SensorExecutionContext {
    pub fn new(tick: SensorTick, loader: Arc<dyn InstanceLoader>) -> Self {
        Self {
            tick_id: Ulid::new(),
            instance_ref: tick.instance_ref,
            last_completion_time: tick.last_completion_time,
            last_run_key: tick.last_run_key,
            cursor: RefCell::new(tick.cursor),
            loader,
            instance: OnceCell::new(),
            exit_stack: ExitStack::new(),
        }
    }

    pub fn tick_id(&self) -> Ulid {
        self.tick_id
    }

    pub fn instance_ref(&self) -> &InstanceRef {
        &self.instance_ref
    }

    /// The orchestration instance for this tick.
    ///
    /// Acquired at most once per context. A failed acquisition is not retried;
    /// later calls return the same failure.
    pub fn instance(&self) -> Result<&dyn OrchestrationInstance, SensorError> {
        match self.instance.get_or_init(|| self.acquire_instance()) {
            Ok(instance) => Ok(instance.as_ref()),
            Err(err) => Err(SensorError::ResourceAcquisition(err.clone())),
        }
    }

    /// Whether [`instance`](Self::instance) has been called on this context.
    pub fn instance_requested(&self) -> bool {
        self.instance.get().is_some()
    }

    fn acquire_instance(&self) -> Result<Arc<dyn OrchestrationInstance>, InstanceError> {
        let instance = match self.loader.load(&self.instance_ref) {
            Ok(instance) => instance,
            Err(err) => {
                tracing::warn!(tick_id = %self.tick_id, error = %err, "Failed to acquire orchestration instance");
                return Err(err);
            }
        };

        let handle = Arc::clone(&instance);
        let tick_id = self.tick_id;
        self.exit_stack.push(move || {
            if let Err(err) = handle.release() {
                tracing::warn!(%tick_id, error = %err, "Failed to release orchestration instance");
            } else {
                tracing::debug!(%tick_id, "Released orchestration instance");
            }
        });

        tracing::debug!(tick_id = %self.tick_id, "Acquired orchestration instance");
        Ok(instance)
    }

    /// Deprecated: seconds since the epoch of the previous evaluation.
    pub fn last_completion_time(&self) -> Option<f64> {
        self.last_completion_time
    }

    pub fn last_completion_datetime(&self) -> Option<DateTime<Utc>> {
        self.last_completion_time.and_then(epoch_seconds_to_datetime)
    }

    /// Deprecated: prefer the cursor.
    pub fn last_run_key(&self) -> Option<&str> {
        self.last_run_key.as_deref()
    }

    /// The cursor set by an earlier evaluation, or by this one via
    /// [`update_cursor`](Self::update_cursor).
    pub fn cursor(&self) -> Option<String> {
        self.cursor.borrow().clone()
    }

    /// Replace the cursor handed to the next tick.
    pub fn update_cursor(&self, cursor: Option<String>) {
        *self.cursor.borrow_mut() = cursor;
    }

    /// Consume the context, releasing its resources, and return the cursor
    /// for the daemon to persist.
    pub fn into_cursor(self) -> Option<String> {
        self.cursor.take()
    }
}

impl Drop for SensorExecutionContext {
    fn drop(&mut self) {
        self.exit_stack.close();
    }
}

impl fmt::Debug for SensorExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorExecutionContext")
            .field("tick_id", &self.tick_id)
            .field("instance_ref", &self.instance_ref)
            .field("last_completion_time", &self.last_completion_time)
            .field("last_run_key", &self.last_run_key)
            .field("cursor", &self.cursor.borrow())
            .field("instance_requested", &self.instance_requested())
            .finish()
    }
}
