//! Sensor definitions.
//!
//! A [`SensorDefinition`] is built once at definition-load time and only read
//! afterwards. [`SensorDefinition::evaluate`] runs one tick's worth of work:
//! call the evaluation function, normalize its result and build the
//! [`ExecutionData`].

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use sensor_types::{ExecutionData, JobType};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::SensorConfig;
use crate::context::SensorExecutionContext;
use crate::error::{DefinitionError, SensorError};
use crate::evaluation::{normalize_evaluation, SensorEvaluation};
use crate::execution::build_execution_data;
use crate::naming::check_valid_name;

pub type EvaluationFn =
    Arc<dyn Fn(&SensorExecutionContext) -> anyhow::Result<SensorEvaluation> + Send + Sync>;

#[derive(Clone)]
pub struct SensorDefinition {
    name: String,
    target_job_name: String,
    selection: Option<Vec<String>>,
    mode: String,
    minimum_interval_seconds: u32,
    description: Option<String>,
    evaluation_fn: EvaluationFn,
    // Shared by clones; one permit per in-flight tick.
    tick_gate: Arc<Semaphore>,
}

impl SensorDefinition {
    pub fn builder(
        name: impl Into<String>,
        target_job_name: impl Into<String>,
    ) -> SensorDefinitionBuilder {
        SensorDefinitionBuilder::new(name, target_job_name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target_job_name(&self) -> &str {
        &self.target_job_name
    }

    pub fn job_type(&self) -> JobType {
        JobType::Sensor
    }

    /// Item subselection of the target job; `None` selects everything.
    pub fn selection(&self) -> Option<&[String]> {
        self.selection.as_deref()
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    pub fn minimum_interval_seconds(&self) -> u32 {
        self.minimum_interval_seconds
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Claim the single tick slot of this definition and its clones.
    ///
    /// Returns `None` while another tick still holds it.
    pub(crate) fn try_begin_tick(&self) -> Option<OwnedSemaphorePermit> {
        self.tick_gate.clone().try_acquire_owned().ok()
    }

    /// Evaluate the sensor once against `context`.
    ///
    /// The returned cursor reflects any [`SensorExecutionContext::update_cursor`]
    /// call made by the evaluation function. Errors are returned as raised;
    /// nothing is retried.
    pub fn evaluate(&self, context: &SensorExecutionContext) -> Result<ExecutionData, SensorError> {
        let span = tracing::debug_span!(
            "sensor.evaluate",
            sensor = %self.name,
            tick_id = %context.tick_id()
        );
        let _enter = span.enter();

        let evaluation = (self.evaluation_fn)(context).map_err(|err| {
            // Errors raised by the core itself (e.g. instance acquisition)
            // surface unchanged.
            match err.downcast::<SensorError>() {
                Ok(sensor_err) => sensor_err,
                Err(source) => SensorError::Evaluation {
                    sensor_name: self.name.clone(),
                    source,
                },
            }
        })?;

        let items = normalize_evaluation(&self.name, evaluation)?;
        let data = build_execution_data(&self.name, items, context.cursor())?;

        tracing::debug!(
            run_requests = data.run_requests().len(),
            skipped = data.skip_message().is_some(),
            "Sensor evaluation complete"
        );
        Ok(data)
    }
}

impl fmt::Debug for SensorDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorDefinition")
            .field("name", &self.name)
            .field("target_job_name", &self.target_job_name)
            .field("selection", &self.selection)
            .field("mode", &self.mode)
            .field("minimum_interval_seconds", &self.minimum_interval_seconds)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

pub struct SensorDefinitionBuilder {
    name: String,
    target_job_name: String,
    selection: Option<Vec<String>>,
    mode: Option<String>,
    minimum_interval_seconds: Option<u32>,
    description: Option<String>,
    evaluation_fn: Option<EvaluationFn>,
    config: SensorConfig,
}

impl SensorDefinitionBuilder {
    pub fn new(name: impl Into<String>, target_job_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_job_name: target_job_name.into(),
            selection: None,
            mode: None,
            minimum_interval_seconds: None,
            description: None,
            evaluation_fn: None,
            config: SensorConfig::default(),
        }
    }

    pub fn selection<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selection = Some(items.into_iter().map(Into::into).collect());
        self
    }

    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn minimum_interval_seconds(mut self, seconds: u32) -> Self {
        self.minimum_interval_seconds = Some(seconds);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Take the default mode and interval from `config` instead of the
    /// built-in defaults.
    pub fn with_config(mut self, config: &SensorConfig) -> Self {
        self.config = config.clone();
        self
    }

    pub fn evaluation_fn<F, R>(mut self, evaluation_fn: F) -> Self
    where
        F: Fn(&SensorExecutionContext) -> R + Send + Sync + 'static,
        R: Into<SensorEvaluation>,
    {
        self.evaluation_fn = Some(Arc::new(
            move |context: &SensorExecutionContext| -> anyhow::Result<SensorEvaluation> {
                Ok(evaluation_fn(context).into())
            },
        ));
        self
    }

    /// Like [`evaluation_fn`](Self::evaluation_fn) for functions that can fail.
    pub fn try_evaluation_fn<F, R>(mut self, evaluation_fn: F) -> Self
    where
        F: Fn(&SensorExecutionContext) -> anyhow::Result<R> + Send + Sync + 'static,
        R: Into<SensorEvaluation>,
    {
        self.evaluation_fn = Some(Arc::new(
            move |context: &SensorExecutionContext| -> anyhow::Result<SensorEvaluation> {
                evaluation_fn(context).map(Into::into)
            },
        ));
        self
    }

    pub fn build(self) -> Result<SensorDefinition, DefinitionError> {
        check_valid_name(&self.name)?;

        if self.target_job_name.trim().is_empty() {
            return Err(DefinitionError::EmptyTargetJob {
                sensor_name: self.name,
            });
        }

        let minimum_interval_seconds = self
            .minimum_interval_seconds
            .unwrap_or(self.config.minimum_interval_seconds);
        if minimum_interval_seconds == 0 {
            return Err(DefinitionError::InvalidMinimumInterval {
                sensor_name: self.name,
            });
        }

        if let Some(selection) = &self.selection {
            let mut seen = HashSet::new();
            for item in selection {
                if item.trim().is_empty() {
                    return Err(DefinitionError::InvalidSelection {
                        sensor_name: self.name,
                    });
                }
                if !seen.insert(item.as_str()) {
                    return Err(DefinitionError::DuplicateSelection {
                        sensor_name: self.name.clone(),
                        item: item.clone(),
                    });
                }
            }
        }

        let Some(evaluation_fn) = self.evaluation_fn else {
            return Err(DefinitionError::MissingEvaluationFn {
                sensor_name: self.name,
            });
        };

        Ok(SensorDefinition {
            name: self.name,
            target_job_name: self.target_job_name,
            selection: self.selection,
            mode: self.mode.unwrap_or(self.config.default_mode),
            minimum_interval_seconds,
            description: self.description,
            evaluation_fn,
            tick_gate: Arc::new(Semaphore::new(1)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensor_types::{RunRequest, SkipReason};

    fn noop() -> SensorDefinitionBuilder {
        SensorDefinition::builder("new_files", "ingest_job").evaluation_fn(|_| ())
    }

    #[test]
    fn test_defaults() {
        let sensor = noop().build().unwrap();
        assert_eq!(sensor.name(), "new_files");
        assert_eq!(sensor.target_job_name(), "ingest_job");
        assert_eq!(sensor.mode(), "default");
        assert_eq!(sensor.minimum_interval_seconds(), 30);
        assert_eq!(sensor.selection(), None);
        assert_eq!(sensor.description(), None);
        assert_eq!(sensor.job_type(), JobType::Sensor);
    }

    #[test]
    fn test_explicit_fields() {
        let sensor = noop()
            .mode("prod")
            .minimum_interval_seconds(300)
            .selection(["extract", "load"])
            .description("watches the landing bucket")
            .build()
            .unwrap();
        assert_eq!(sensor.mode(), "prod");
        assert_eq!(sensor.minimum_interval_seconds(), 300);
        assert_eq!(
            sensor.selection(),
            Some(&["extract".to_string(), "load".to_string()][..])
        );
        assert_eq!(sensor.description(), Some("watches the landing bucket"));
    }

    #[test]
    fn test_config_supplies_defaults_only() {
        let config = SensorConfig {
            default_mode: "staging".to_string(),
            minimum_interval_seconds: 90,
            ..SensorConfig::default()
        };
        let sensor = noop().with_config(&config).build().unwrap();
        assert_eq!(sensor.mode(), "staging");
        assert_eq!(sensor.minimum_interval_seconds(), 90);

        let sensor = noop()
            .mode("prod")
            .minimum_interval_seconds(10)
            .with_config(&config)
            .build()
            .unwrap();
        assert_eq!(sensor.mode(), "prod");
        assert_eq!(sensor.minimum_interval_seconds(), 10);
    }

    #[test]
    fn test_rejects_invalid_definitions() {
        assert!(matches!(
            SensorDefinition::builder("bad name", "job")
                .evaluation_fn(|_| ())
                .build(),
            Err(DefinitionError::InvalidName { .. })
        ));
        assert!(matches!(
            SensorDefinition::builder("ok", " ").evaluation_fn(|_| ()).build(),
            Err(DefinitionError::EmptyTargetJob { .. })
        ));
        assert!(matches!(
            noop().minimum_interval_seconds(0).build(),
            Err(DefinitionError::InvalidMinimumInterval { .. })
        ));
        assert!(matches!(
            noop().selection(["a", ""]).build(),
            Err(DefinitionError::InvalidSelection { .. })
        ));
        assert!(matches!(
            noop().selection(["a", "  "]).build(),
            Err(DefinitionError::InvalidSelection { .. })
        ));
        assert!(matches!(
            noop().selection(["a", "b", "a"]).build(),
            Err(DefinitionError::DuplicateSelection { ref item, .. }) if item == "a"
        ));
        assert!(matches!(
            SensorDefinition::builder("ok", "job").build(),
            Err(DefinitionError::MissingEvaluationFn { .. })
        ));
    }

    #[test]
    fn test_evaluation_fn_accepts_any_convertible_return() {
        SensorDefinition::builder("a", "job")
            .evaluation_fn(|_| SkipReason::new("x"))
            .build()
            .unwrap();
        SensorDefinition::builder("b", "job")
            .evaluation_fn(|_| vec![RunRequest::new()])
            .build()
            .unwrap();
        SensorDefinition::builder("c", "job")
            .try_evaluation_fn(|_| Ok(Some(RunRequest::new())))
            .build()
            .unwrap();
    }
}
