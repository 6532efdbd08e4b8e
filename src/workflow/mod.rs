//! Declarative process graphs and the engine that runs them.
//!
//! A [`ProcessDefinition`] is an ordered list of [`Task`]s whose
//! dependencies always point at earlier tasks, so every registered graph
//! is a DAG with a well-defined execution order. Instances are owned by
//! the engine; the bridge only reads them.

pub mod engine;
pub mod serialize;
pub mod wait;

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status shared by process instances and their tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl Status {
    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Failed | Status::Cancelled)
    }

    /// The underlying string value used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Running => "running",
            Status::Completed => "completed",
            Status::Failed => "failed",
            Status::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operator inside a decision rule condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Ne,
}

/// A binary comparison evaluated against the instance variable bag.
/// String operands starting with `$` are variable references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub operator: Operator,
    pub left: Value,
    pub right: Value,
}

/// A typed side effect run when a decision rule matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    /// Set (or overwrite) a workflow variable.
    SetVariable { variable: String, value: Value },
    /// Emit a notification to a recipient (may contain `${}` placeholders).
    Notification { recipient: String },
}

/// One conditional clause of a decision task. Rules are ordered; the first
/// whose condition holds runs its actions and later rules are skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRule {
    pub condition: Condition,
    pub actions: Vec<RuleAction>,
}

/// Type-specific task configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskKind {
    /// An outbound API request. The url may contain `${}` placeholders.
    ApiCall { method: String, url: String },
    /// Conditional routing over the variable bag.
    Decision { rules: Vec<DecisionRule> },
    /// A message to a recipient (comma-joined list or placeholder).
    Notification {
        channel: String,
        recipient: String,
        template: String,
    },
    /// Suspend for a fixed duration.
    Timer { duration_ms: u64 },
}

/// One node in a process graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    /// Ids of tasks that must complete first. Must reference tasks defined
    /// earlier in the list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(flatten)]
    pub kind: TaskKind,
}

/// A declarative process graph. Built fresh per invocation, never
/// persisted by the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tasks: Vec<Task>,
}

/// Execution record for one task inside an instance. Created when the
/// task starts, finalized when it completes, fails, or is cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub status: Status,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One run of a [`ProcessDefinition`], carrying mutable variables and
/// per-task results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub process_id: String,
    pub status: Status,
    pub variables: HashMap<String, Value>,
    pub task_results: HashMap<String, TaskResult>,
}
