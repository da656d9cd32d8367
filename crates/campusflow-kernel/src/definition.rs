//! Workflow definitions.
//!
//! A [`WorkflowDefinition`] is a static, named, ordered list of
//! [`StepDescriptor`]s.  Definitions carry no behavior of their own; the
//! executor walks them and the tracker uses them to annotate step logs with
//! the service and description a dashboard shows.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How an execution was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Started from a free-text command.
    NaturalLanguage,
    /// Started explicitly by workflow id.
    Manual,
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NaturalLanguage => write!(f, "natural_language"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// The external service a step talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceKind {
    /// The student / log / assignment data store.
    DataStore,
    /// The outbound messaging provider.
    Messaging,
    /// The calendar provider.
    Calendar,
    /// The audit ledger.
    Ledger,
    /// Local hashing and proof generation.
    Privacy,
    /// Pure in-process logic (filters, analysis).
    Logic,
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DataStore => write!(f, "DataStore"),
            Self::Messaging => write!(f, "Messaging"),
            Self::Calendar => write!(f, "Calendar"),
            Self::Ledger => write!(f, "Ledger"),
            Self::Privacy => write!(f, "Privacy"),
            Self::Logic => write!(f, "Logic"),
        }
    }
}

/// One step of a workflow definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDescriptor {
    /// Step identifier, unique within its workflow (e.g. `FETCH_STUDENTS`).
    pub id: String,
    /// The service this step talks to.
    pub service: ServiceKind,
    /// Human-readable description.
    pub description: String,
    /// Optional guard, shown on diagram edges (e.g. `attendance < 75`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl StepDescriptor {
    /// Create an unconditional step.
    pub fn new(
        id: impl Into<String>,
        service: ServiceKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            service,
            description: description.into(),
            condition: None,
        }
    }

    /// Attach a condition to this step.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}

/// A complete workflow definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    /// Stable machine identifier (e.g. `attendance_low_75`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// One-line description.
    pub description: String,
    /// How this workflow is normally triggered.
    pub trigger: TriggerKind,
    /// The ordered steps.
    pub steps: Vec<StepDescriptor>,
    /// Name of the summary type produced on completion.
    pub output: String,
}

impl WorkflowDefinition {
    /// Look up a step descriptor by id.
    pub fn step(&self, step_id: &str) -> Option<&StepDescriptor> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// The distinct external services this workflow touches, in first-use
    /// order.  Local logic and privacy steps are not integrations.
    pub fn integrations(&self) -> Vec<ServiceKind> {
        let mut seen = Vec::new();
        for step in &self.steps {
            if matches!(step.service, ServiceKind::Logic | ServiceKind::Privacy) {
                continue;
            }
            if !seen.contains(&step.service) {
                seen.push(step.service);
            }
        }
        seen
    }

    /// Render the workflow as a Mermaid `graph TD` diagram.
    ///
    /// Steps are chained in order from a `Start` node to an `End` node; edges
    /// into conditional steps are labelled with the condition.
    pub fn mermaid(&self) -> String {
        let mut diagram = String::from("graph TD\n");
        diagram.push_str(&format!("    Start([{}])\n", self.name));

        for (index, step) in self.steps.iter().enumerate() {
            let node = format!("Step{}", index + 1);
            let prev = if index == 0 {
                "Start".to_string()
            } else {
                format!("Step{index}")
            };

            diagram.push_str(&format!("    {node}[{}<br/>{}]\n", step.id, step.service));
            match &step.condition {
                Some(condition) => {
                    diagram.push_str(&format!("    {prev} -->|{condition}| {node}\n"))
                }
                None => diagram.push_str(&format!("    {prev} --> {node}\n")),
            }
        }

        let last = if self.steps.is_empty() {
            "Start".to_string()
        } else {
            format!("Step{}", self.steps.len())
        };
        diagram.push_str(&format!("    {last} --> End([Complete])\n"));
        diagram
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WorkflowDefinition {
        WorkflowDefinition {
            id: "sample".into(),
            name: "Sample".into(),
            description: "two steps".into(),
            trigger: TriggerKind::NaturalLanguage,
            steps: vec![
                StepDescriptor::new("FETCH", ServiceKind::DataStore, "fetch rows"),
                StepDescriptor::new("FILTER", ServiceKind::Logic, "filter rows")
                    .with_condition("attendance < 75"),
                StepDescriptor::new("NOTIFY", ServiceKind::Messaging, "notify"),
                StepDescriptor::new("AUDIT", ServiceKind::DataStore, "log"),
            ],
            output: "SampleSummary".into(),
        }
    }

    #[test]
    fn mermaid_chains_steps_and_labels_conditions() {
        let diagram = sample().mermaid();
        assert!(diagram.starts_with("graph TD\n"));
        assert!(diagram.contains("Start([Sample])"));
        assert!(diagram.contains("Start --> Step1"));
        assert!(diagram.contains("Step1 -->|attendance < 75| Step2"));
        assert!(diagram.contains("Step4 --> End([Complete])"));
    }

    #[test]
    fn integrations_are_deduplicated_and_skip_logic() {
        let services = sample().integrations();
        assert_eq!(services, vec![ServiceKind::DataStore, ServiceKind::Messaging]);
    }

    #[test]
    fn step_lookup() {
        let wf = sample();
        assert_eq!(wf.step("NOTIFY").unwrap().service, ServiceKind::Messaging);
        assert!(wf.step("MISSING").is_none());
    }

    #[test]
    fn empty_workflow_diagram_still_terminates() {
        let mut wf = sample();
        wf.steps.clear();
        assert!(wf.mermaid().contains("Start --> End([Complete])"));
    }
}
