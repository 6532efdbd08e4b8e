//! Deadline-bounded waiting for a workflow instance.
//!
//! The engine does not push completion events in this integration, so the
//! waiter polls at a fixed short interval: worst case one interval of
//! staleness, in exchange for no coupling to the engine's internals.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::time::{Instant, sleep};

use super::engine::WorkflowEngine;
use super::serialize;
use crate::consts::POLL_INTERVAL;
use crate::error::BridgeError;

/// Terminal state of one instance, normalized for the response stream.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSnapshot {
    pub instance_id: String,
    pub status: String,
    pub variables: HashMap<String, Value>,
    pub tasks: HashMap<String, Value>,
}

/// Poll the engine until the instance reaches a terminal status or the
/// deadline expires. On timeout the instance may keep running inside the
/// engine, untracked; no partial snapshot is returned.
pub async fn await_instance(
    engine: &WorkflowEngine,
    instance_id: &str,
    timeout: Duration,
) -> Result<InstanceSnapshot, BridgeError> {
    let deadline = Instant::now() + timeout;

    while Instant::now() < deadline {
        if let Some(instance) = engine.get_instance_status(instance_id).await
            && instance.status.is_terminal()
        {
            let tasks = instance
                .task_results
                .iter()
                .map(|(task_id, result)| (task_id.clone(), serialize::task_result(Some(result))))
                .collect();
            return Ok(InstanceSnapshot {
                instance_id: instance.id,
                status: instance.status.as_str().to_string(),
                variables: instance.variables,
                tasks,
            });
        }
        sleep(POLL_INTERVAL).await;
    }

    Err(BridgeError::Timeout {
        instance_id: instance_id.to_string(),
    })
}
