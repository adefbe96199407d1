#![allow(dead_code)]

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sensor::{InstanceError, InstanceLoader, InstanceRef, OrchestrationInstance, SensorTick};

/// Counts acquisitions and releases of a fake orchestration instance.
#[derive(Debug, Default)]
pub struct InstanceCounters {
    pub loads: AtomicUsize,
    pub releases: AtomicUsize,
}

impl InstanceCounters {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct TestInstance {
    pub storage_dir: String,
    counters: Arc<InstanceCounters>,
}

impl OrchestrationInstance for TestInstance {
    fn release(&self) -> Result<(), InstanceError> {
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct TestLoader {
    pub counters: Arc<InstanceCounters>,
}

impl InstanceLoader for TestLoader {
    fn load(
        &self,
        instance_ref: &InstanceRef,
    ) -> Result<Arc<dyn OrchestrationInstance>, InstanceError> {
        let storage_dir = instance_ref
            .as_value()
            .get("storage_dir")
            .and_then(|v| v.as_str())
            .ok_or_else(|| InstanceError::new("instance ref has no storage_dir"))?
            .to_string();
        self.counters.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(TestInstance {
            storage_dir,
            counters: self.counters.clone(),
        }))
    }
}

pub fn test_loader() -> (Arc<InstanceCounters>, Arc<dyn InstanceLoader>) {
    let counters = Arc::new(InstanceCounters::default());
    let loader: Arc<dyn InstanceLoader> = Arc::new(TestLoader {
        counters: counters.clone(),
    });
    (counters, loader)
}

pub fn test_tick() -> SensorTick {
    SensorTick::new(InstanceRef::new(
        serde_json::json!({"storage_dir": "/tmp/sensor-test"}),
    ))
}

pub fn broken_tick() -> SensorTick {
    SensorTick::new(InstanceRef::new(serde_json::json!({})))
}
