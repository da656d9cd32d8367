//! Workflow executor -- command in, tracked execution out.
//!
//! [`WorkflowExecutor::execute`] interprets a command, resolves the matched
//! workflow in the registry, and hands it to [`WorkflowExecutor::run`].
//! `run` opens an execution in the tracker, dispatches to the workflow body
//! for the definition's [`WorkflowKind`], and completes the execution with
//! the body's summary.  A workflow that aborts still produces a completed
//! (failed) execution; only problems found before the execution opens are
//! returned as errors.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use campusflow_adapters::{InMemoryDataStore, MockCalendar, MockLedger, MockMessenger};
use campusflow_kernel::{ExecutionOutcome, ExecutionTracker, ExecutionView, TriggerKind};

use crate::error::{IntentError, Result};
use crate::interpreter::{CommandInterpreter, Interpretation, WorkflowParams};
use crate::registry::{WorkflowKind, WorkflowRegistry};
use crate::workflows::{self, Run, Services};

/// Message returned for commands no workflow matches.
pub const UNRECOGNIZED_MESSAGE: &str = "Command not recognized";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Executor settings, usually read from the `[workflows]` config table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Phone numbers that receive critical-attendance summaries.
    pub admin_contacts: Vec<String>,
    /// Meeting time used when a command names none.
    pub default_meeting_time: String,
    /// Interpretations below this confidence are treated as unrecognized.
    pub min_confidence: f64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            admin_contacts: Vec::new(),
            default_meeting_time: crate::interpreter::DEFAULT_TARGET_DATE.to_string(),
            min_confidence: 0.5,
        }
    }
}

impl Services {
    /// In-process collaborators over the demo roster.
    pub fn demo() -> Self {
        Self {
            store: Arc::new(InMemoryDataStore::demo()),
            messenger: Arc::new(MockMessenger::new()),
            calendar: Arc::new(MockCalendar::new()),
            ledger: Arc::new(MockLedger::new()),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of [`WorkflowExecutor::execute`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Executed(Box<ExecutionView>),
    Unrecognized {
        command: String,
        message: String,
        interpretation: Interpretation,
    },
}

impl CommandOutcome {
    pub fn execution(&self) -> Option<&ExecutionView> {
        match self {
            Self::Executed(view) => Some(view),
            Self::Unrecognized { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct WorkflowExecutor {
    registry: WorkflowRegistry,
    tracker: ExecutionTracker,
    interpreter: Arc<dyn CommandInterpreter>,
    services: Services,
    config: ExecutorConfig,
}

impl WorkflowExecutor {
    pub fn new(
        registry: WorkflowRegistry,
        tracker: ExecutionTracker,
        interpreter: Arc<dyn CommandInterpreter>,
        services: Services,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            registry,
            tracker,
            interpreter,
            services,
            config,
        }
    }

    pub fn registry(&self) -> &WorkflowRegistry {
        &self.registry
    }

    pub fn tracker(&self) -> &ExecutionTracker {
        &self.tracker
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Interpret `command` and run the workflow it names.
    pub async fn execute(&self, command: &str) -> Result<CommandOutcome> {
        let interpretation = self
            .interpreter
            .interpret(command, &self.registry.list())
            .await?;

        let workflow_id = match interpretation.workflow_id.clone() {
            Some(id) if interpretation.confidence >= self.config.min_confidence => id,
            _ => {
                info!(command, confidence = interpretation.confidence, "command not recognized");
                return Ok(CommandOutcome::Unrecognized {
                    command: command.to_string(),
                    message: UNRECOGNIZED_MESSAGE.to_string(),
                    interpretation,
                });
            }
        };

        let metadata = json!({
            "command": command,
            "params": interpretation.params,
            "confidence": interpretation.confidence,
            "interpreter": interpretation.source,
            "requestedAt": Utc::now(),
        });

        let view = self
            .run(
                &workflow_id,
                &interpretation.params,
                TriggerKind::NaturalLanguage,
                metadata,
            )
            .await?;
        Ok(CommandOutcome::Executed(Box::new(view)))
    }

    /// Run a workflow by id or name with explicit parameters.
    pub async fn run(
        &self,
        workflow_id: &str,
        params: &WorkflowParams,
        trigger: TriggerKind,
        metadata: serde_json::Value,
    ) -> Result<ExecutionView> {
        let (kind, definition) =
            self.registry
                .resolve(workflow_id)
                .ok_or_else(|| IntentError::WorkflowNotFound {
                    workflow_id: workflow_id.to_string(),
                })?;

        let threshold = params.threshold.or(kind.default_threshold()).unwrap_or(0);
        if threshold > 100 {
            return Err(IntentError::InvalidParams {
                workflow_id: definition.id.clone(),
                reason: format!("threshold {threshold} is outside 0-100"),
            });
        }
        let meeting_time = params
            .target_date
            .as_deref()
            .unwrap_or(&self.config.default_meeting_time);

        let context = self.tracker.start(definition, trigger, metadata);
        let execution_id = context.execution_id;

        let run = Run {
            execution_id,
            tracker: &self.tracker,
            services: &self.services,
            threshold: f64::from(threshold),
            meeting_time,
            schedule_meeting: params.schedule_meeting,
            admin_contacts: &self.config.admin_contacts,
        };

        let body = match kind {
            WorkflowKind::LowAttendance => workflows::attendance::low_attendance(&run).await,
            WorkflowKind::CriticalAttendance => {
                workflows::attendance::critical_attendance(&run).await
            }
            WorkflowKind::AssignmentTracking => {
                workflows::assignments::assignment_tracking(&run).await
            }
            WorkflowKind::PerformanceReview => {
                workflows::performance::performance_review(&run).await
            }
        };

        let outcome = match body {
            Ok(summary) => ExecutionOutcome::success(summary),
            Err(e) => {
                warn!(execution_id = %execution_id, workflow = %kind, error = %e, "workflow aborted");
                let failed_step = match &e {
                    IntentError::StepFailed { step_id, .. } => json!(step_id),
                    _ => serde_json::Value::Null,
                };
                ExecutionOutcome::failure(e.to_string(), json!({ "failedStep": failed_step }))
            }
        };

        let context = self.tracker.complete(execution_id, outcome)?;
        Ok(context.view(false))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
