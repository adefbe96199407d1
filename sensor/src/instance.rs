//! Seam to the orchestration instance.
//!
//! The instance is a heavyweight handle (storage connections, run launcher)
//! that lives for exactly one tick. The sensor core only acquires it through an
//! [`InstanceLoader`] and releases it when the execution context goes away.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use sensor_types::InstanceRef;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct InstanceError {
    pub message: String,
}

impl InstanceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A live handle to the orchestration instance.
pub trait OrchestrationInstance: Send + Sync + fmt::Debug {
    /// Release connections held by this handle. Called exactly once, when the
    /// owning execution context is dropped.
    fn release(&self) -> Result<(), InstanceError> {
        Ok(())
    }

    /// Downcast hook for evaluation functions that know the concrete instance.
    fn as_any(&self) -> &dyn Any;
}

/// Turns a serialized [`InstanceRef`] into a live instance.
pub trait InstanceLoader: Send + Sync {
    fn load(&self, instance_ref: &InstanceRef)
        -> Result<Arc<dyn OrchestrationInstance>, InstanceError>;
}

impl<F> InstanceLoader for F
where
    F: Fn(&InstanceRef) -> Result<Arc<dyn OrchestrationInstance>, InstanceError> + Send + Sync,
{
    fn load(
        &self,
        instance_ref: &InstanceRef,
    ) -> Result<Arc<dyn OrchestrationInstance>, InstanceError> {
        self(instance_ref)
    }
}
