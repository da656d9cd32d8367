//! Command interpreter -- maps free text to a workflow and its parameters.
//!
//! [`CommandInterpreter`] is the seam where a language-model backed
//! interpreter would plug in.  The shipped [`RuleInterpreter`] works offline:
//! regexes pull out thresholds and dates, and an Aho-Corasick automaton finds
//! the keywords that pick the workflow.
//!
//! Rules, applied to the lower-cased command:
//!
//! 1. "notify/flag/alert/check/find ... students ... below N" or
//!    "attendance ... below N" sets the threshold; `N < 65` selects the
//!    critical workflow, otherwise the low-attendance one.
//! 2. Otherwise "attendance" together with "65" selects the critical
//!    workflow at 65.
//! 3. Otherwise "attendance" selects the low-attendance workflow at 75.
//! 4. "assignment", "incomplete" or "deadline" selects assignment tracking.
//! 5. "performance" or "review" selects the performance review.
//! 6. "schedule", "meeting" or "google meet" requests meetings and extracts
//!    a target date such as "for next Friday at 2pm".
//!
//! Later rules override the workflow chosen by earlier ones.

use aho_corasick::AhoCorasick;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IntentError, Result};
use crate::registry::{WorkflowKind, WorkflowListing};

/// Meeting time used when a scheduling command names no date.
pub const DEFAULT_TARGET_DATE: &str = "Tomorrow 10am";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Parameters extracted from a command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowParams {
    /// Attendance threshold in percent.
    pub threshold: Option<u32>,
    /// Human-readable meeting time, e.g. `next friday at 2pm`.
    pub target_date: Option<String>,
    pub schedule_meeting: bool,
}

/// Result of interpreting a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interpretation {
    /// `None` when no workflow matched.
    pub workflow_id: Option<String>,
    pub params: WorkflowParams,
    /// Between 0.0 and 1.0.
    pub confidence: f64,
    /// Name of the interpreter that produced this result.
    pub source: String,
}

impl Interpretation {
    pub fn is_match(&self) -> bool {
        self.workflow_id.is_some()
    }
}

/// Maps a natural-language command to a workflow.
#[async_trait]
pub trait CommandInterpreter: Send + Sync {
    /// Short identifier recorded in execution metadata.
    fn name(&self) -> &str;

    /// Interpret `command` against the available `workflows`.
    async fn interpret(&self, command: &str, workflows: &[WorkflowListing])
    -> Result<Interpretation>;
}

// ---------------------------------------------------------------------------
// Rule-based interpreter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Attendance,
    Assignment,
    Performance,
    Scheduling,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("attendance", Keyword::Attendance),
    ("assignment", Keyword::Assignment),
    ("incomplete", Keyword::Assignment),
    ("deadline", Keyword::Assignment),
    ("performance", Keyword::Performance),
    ("review", Keyword::Performance),
    ("schedule", Keyword::Scheduling),
    ("meeting", Keyword::Scheduling),
    ("google meet", Keyword::Scheduling),
];

const STUDENTS_BELOW: &str = r"(?:notify|flag|alert|check|find).*students.*(?:under|below|<)\s*(\d+)";
const ATTENDANCE_BELOW: &str = r"attendance.*(?:under|below|less than|<)\s*(\d+)";
const TARGET_DATE: &str = r"(?:for|on|at)\s+((?:next\s+)?(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday|tomorrow|today)(?:\s+at\s+\d+(?::\d{2})?\s*(?:am|pm)?)?)";

/// Offline interpreter built from keyword and regex rules.
pub struct RuleInterpreter {
    threshold_patterns: Vec<Regex>,
    date_pattern: Regex,
    keywords: AhoCorasick,
}

impl RuleInterpreter {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| IntentError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
        };

        let keywords = AhoCorasick::new(KEYWORDS.iter().map(|(word, _)| *word)).map_err(|e| {
            IntentError::InvalidPattern {
                pattern: "keywords".into(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            threshold_patterns: vec![compile(STUDENTS_BELOW)?, compile(ATTENDANCE_BELOW)?],
            date_pattern: compile(TARGET_DATE)?,
            keywords,
        })
    }

    /// Synchronous core of [`CommandInterpreter::interpret`].
    pub fn interpret_text(&self, command: &str) -> Result<Interpretation> {
        let text = command.trim().to_lowercase();
        if text.is_empty() {
            return Err(IntentError::ParseFailed {
                reason: "empty command".into(),
            });
        }

        let found: Vec<Keyword> = self
            .keywords
            .find_overlapping_iter(&text)
            .map(|m| KEYWORDS[m.pattern().as_usize()].1)
            .collect();
        let has = |kw: Keyword| found.contains(&kw);

        let mut workflow: Option<WorkflowKind> = None;
        let mut params = WorkflowParams::default();
        let mut confidence = 0.0;

        if let Some(threshold) = self.extract_threshold(&text)? {
            workflow = Some(if threshold < 65 {
                WorkflowKind::CriticalAttendance
            } else {
                WorkflowKind::LowAttendance
            });
            params.threshold = Some(threshold);
            confidence = 0.8;
        } else if has(Keyword::Attendance) && text.contains("65") {
            workflow = Some(WorkflowKind::CriticalAttendance);
            params.threshold = Some(65);
            confidence = 0.8;
        } else if has(Keyword::Attendance) {
            workflow = Some(WorkflowKind::LowAttendance);
            params.threshold = Some(75);
            confidence = 0.7;
        }

        if has(Keyword::Assignment) {
            workflow = Some(WorkflowKind::AssignmentTracking);
            confidence = 0.8;
        }
        if has(Keyword::Performance) {
            workflow = Some(WorkflowKind::PerformanceReview);
            confidence = 0.8;
        }

        if has(Keyword::Scheduling) {
            params.schedule_meeting = true;
            params.target_date = Some(
                self.date_pattern
                    .captures(&text)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_else(|| DEFAULT_TARGET_DATE.to_string()),
            );
        }

        if workflow.is_none() {
            confidence = 0.0;
        }

        debug!(
            command = %text,
            workflow = ?workflow.map(WorkflowKind::id),
            confidence,
            "rule interpretation"
        );

        Ok(Interpretation {
            workflow_id: workflow.map(|k| k.id().to_string()),
            params,
            confidence,
            source: self.name().to_string(),
        })
    }

    fn extract_threshold(&self, text: &str) -> Result<Option<u32>> {
        let Some(digits) = self
            .threshold_patterns
            .iter()
            .find_map(|re| re.captures(text).and_then(|c| c.get(1)))
        else {
            return Ok(None);
        };

        digits
            .as_str()
            .parse::<u32>()
            .map(Some)
            .map_err(|e| IntentError::ParseFailed {
                reason: format!("threshold '{}' is not a number: {e}", digits.as_str()),
            })
    }
}

#[async_trait]
impl CommandInterpreter for RuleInterpreter {
    fn name(&self) -> &str {
        "rules"
    }

    async fn interpret(
        &self,
        command: &str,
        _workflows: &[WorkflowListing],
    ) -> Result<Interpretation> {
        self.interpret_text(command)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
