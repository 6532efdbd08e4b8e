//! The in-process workflow engine: registers process definitions,
//! validates them, and runs instances on the tokio runtime.
//!
//! Instance state lives behind an `RwLock`ed map so a poller can read
//! snapshots while the run task advances the instance.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use chrono::Utc;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Condition, DecisionRule, Instance, Operator, ProcessDefinition, RuleAction, Status, Task, TaskKind, TaskResult};

type InstanceMap = Arc<RwLock<HashMap<String, Instance>>>;

/// Registers process definitions and executes instances of them.
/// One engine per `run_workflow` call — no state crosses invocations.
pub struct WorkflowEngine {
    processes: RwLock<HashMap<String, Arc<ProcessDefinition>>>,
    instances: InstanceMap,
}

impl WorkflowEngine {
    pub fn new() -> Self {
        Self {
            processes: RwLock::new(HashMap::new()),
            instances: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Validate and store a definition. Task ids must be unique and every
    /// dependency must reference a task defined earlier in the list, so a
    /// registered graph can hold neither cycles nor dangling references.
    pub async fn register_process(&self, def: ProcessDefinition) -> Result<()> {
        let mut seen: HashSet<&str> = HashSet::new();
        for task in &def.tasks {
            for dep in &task.depends_on {
                if !seen.contains(dep.as_str()) {
                    bail!(
                        "task {} depends on {}, which is not defined before it",
                        task.id,
                        dep
                    );
                }
            }
            if !seen.insert(task.id.as_str()) {
                bail!("duplicate task id: {}", task.id);
            }
        }
        tracing::debug!(process = %def.id, tasks = def.tasks.len(), "process registered");
        self.processes.write().await.insert(def.id.clone(), Arc::new(def));
        Ok(())
    }

    /// Create an instance seeded with the given variables and start
    /// executing it in the background. Returns the instance id immediately.
    pub async fn start_process(
        &self,
        process_id: &str,
        variables: HashMap<String, Value>,
    ) -> Result<String> {
        let def = self
            .processes
            .read()
            .await
            .get(process_id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown process: {process_id}"))?;

        let id = Uuid::new_v4().to_string();
        let instance = Instance {
            id: id.clone(),
            process_id: process_id.to_string(),
            status: Status::Pending,
            variables,
            task_results: HashMap::new(),
        };
        self.instances.write().await.insert(id.clone(), instance);

        let instances = Arc::clone(&self.instances);
        let instance_id = id.clone();
        tokio::spawn(async move {
            run_instance(def, instances, instance_id).await;
        });

        Ok(id)
    }

    /// Cloned snapshot of the instance's current state.
    pub async fn get_instance_status(&self, instance_id: &str) -> Option<Instance> {
        self.instances.read().await.get(instance_id).cloned()
    }
}

impl Default for WorkflowEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk the definition's tasks in order, finalizing each result as it
/// goes. A task whose dependencies did not all complete is cancelled
/// without evaluating its body.
async fn run_instance(def: Arc<ProcessDefinition>, instances: InstanceMap, id: String) {
    update(&instances, &id, |i| i.status = Status::Running).await;
    tracing::debug!(instance = %id, process = %def.id, "instance started");

    let mut failed = false;
    for task in &def.tasks {
        if let Some(dep) = unmet_dependency(&instances, &id, task).await {
            update(&instances, &id, |i| {
                i.task_results.insert(
                    task.id.clone(),
                    TaskResult {
                        status: Status::Cancelled,
                        output: None,
                        error: Some(format!("dependency {dep} did not complete")),
                        started_at: None,
                        completed_at: Some(Utc::now()),
                    },
                );
            })
            .await;
            continue;
        }

        update(&instances, &id, |i| {
            i.task_results.insert(
                task.id.clone(),
                TaskResult {
                    status: Status::Running,
                    output: None,
                    error: None,
                    started_at: Some(Utc::now()),
                    completed_at: None,
                },
            );
        })
        .await;

        let outcome = execute_task(task, &instances, &id).await;
        if outcome.is_err() {
            failed = true;
        }

        update(&instances, &id, |i| {
            if let Some(result) = i.task_results.get_mut(&task.id) {
                result.completed_at = Some(Utc::now());
                match &outcome {
                    Ok(output) => {
                        result.status = Status::Completed;
                        result.output = Some(output.clone());
                    }
                    Err(e) => {
                        result.status = Status::Failed;
                        result.error = Some(e.to_string());
                    }
                }
            }
        })
        .await;
    }

    let final_status = if failed { Status::Failed } else { Status::Completed };
    update(&instances, &id, |i| i.status = final_status).await;
    tracing::debug!(instance = %id, status = %final_status, "instance finished");
}

/// The first dependency of `task` that has not completed, if any.
async fn unmet_dependency(instances: &InstanceMap, id: &str, task: &Task) -> Option<String> {
    let map = instances.read().await;
    let instance = map.get(id)?;
    task.depends_on
        .iter()
        .find(|dep| {
            instance.task_results.get(*dep).map(|r| r.status) != Some(Status::Completed)
        })
        .cloned()
}

async fn execute_task(task: &Task, instances: &InstanceMap, id: &str) -> Result<Value> {
    match &task.kind {
        TaskKind::ApiCall { method, url } => {
            let vars = variables(instances, id).await;
            let url = resolve_placeholders(url, &vars);
            tracing::debug!(task = %task.id, %method, %url, "api call resolved");
            Ok(json!({ "method": method, "url": url }))
        }
        TaskKind::Decision { rules } => {
            // Evaluate and mutate under one write guard so the variable
            // reads and writes of a rule are atomic.
            let mut map = instances.write().await;
            let instance = map
                .get_mut(id)
                .ok_or_else(|| anyhow!("instance disappeared: {id}"))?;
            Ok(evaluate_rules(rules, &mut instance.variables))
        }
        TaskKind::Notification {
            channel,
            recipient,
            template,
        } => {
            let vars = variables(instances, id).await;
            let recipient = resolve_placeholders(recipient, &vars);
            if recipient.is_empty() {
                bail!("notification recipient is empty");
            }
            tracing::debug!(task = %task.id, %channel, %recipient, "notification emitted");
            Ok(json!({ "channel": channel, "recipient": recipient, "template": template }))
        }
        TaskKind::Timer { duration_ms } => {
            tokio::time::sleep(Duration::from_millis(*duration_ms)).await;
            Ok(json!({ "sleptMs": duration_ms }))
        }
    }
}

/// First matching rule wins and later rules are not evaluated. Evaluating
/// all rules and keeping the last match would change behavior whenever two
/// conditions hold at once.
fn evaluate_rules(rules: &[DecisionRule], variables: &mut HashMap<String, Value>) -> Value {
    for (index, rule) in rules.iter().enumerate() {
        if !rule.condition.holds(variables) {
            continue;
        }
        let mut applied = Vec::new();
        for action in &rule.actions {
            match action {
                RuleAction::SetVariable { variable, value } => {
                    variables.insert(variable.clone(), value.clone());
                    applied.push(json!({ "type": "set_variable", "variable": variable }));
                }
                RuleAction::Notification { recipient } => {
                    let recipient = resolve_placeholders(recipient, variables);
                    applied.push(json!({ "type": "notification", "recipient": recipient }));
                }
            }
        }
        return json!({ "matchedRule": index, "actions": applied });
    }
    json!({ "matchedRule": Value::Null, "actions": [] })
}

impl Condition {
    /// Whether this comparison holds against the variable bag. Ordering
    /// operators require both operands to resolve to numbers.
    fn holds(&self, variables: &HashMap<String, Value>) -> bool {
        let left = resolve_operand(&self.left, variables);
        let right = resolve_operand(&self.right, variables);
        match self.operator {
            Operator::Eq => left == right,
            Operator::Ne => left != right,
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
                let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) else {
                    return false;
                };
                match self.operator {
                    Operator::Gt => l > r,
                    Operator::Gte => l >= r,
                    Operator::Lt => l < r,
                    Operator::Lte => l <= r,
                    Operator::Eq | Operator::Ne => false,
                }
            }
        }
    }
}

/// A string operand of the form `$name` dereferences a variable; a
/// missing variable resolves to null. Everything else is a literal.
fn resolve_operand(operand: &Value, variables: &HashMap<String, Value>) -> Value {
    if let Value::String(s) = operand
        && let Some(name) = s.strip_prefix('$')
        && !name.starts_with('{')
    {
        return variables.get(name).cloned().unwrap_or(Value::Null);
    }
    operand.clone()
}

/// Replace every `${name}` with the named variable's string form.
/// Unknown names are left intact so misconfiguration stays visible.
pub(crate) fn resolve_placeholders(template: &str, variables: &HashMap<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        match variables.get(name) {
            Some(Value::String(s)) => out.push_str(s),
            Some(value) => out.push_str(&value.to_string()),
            None => out.push_str(&rest[start..start + end + 3]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

async fn variables(instances: &InstanceMap, id: &str) -> HashMap<String, Value> {
    instances
        .read()
        .await
        .get(id)
        .map(|i| i.variables.clone())
        .unwrap_or_default()
}

async fn update<F: FnOnce(&mut Instance)>(instances: &InstanceMap, id: &str, apply: F) {
    if let Some(instance) = instances.write().await.get_mut(id) {
        apply(instance);
    }
}
