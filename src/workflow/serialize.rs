//! Normalizes engine-native task results into plain JSON: no typed
//! enumerations, no native date objects on the wire.

use serde_json::{Value, json};

use super::TaskResult;

/// Convert a task result into its response-stream form. A missing result
/// reports `"unknown"`; timestamps render as RFC 3339 strings or null;
/// output and error pass through verbatim.
pub fn task_result(result: Option<&TaskResult>) -> Value {
    let Some(result) = result else {
        return json!({ "status": "unknown" });
    };
    json!({
        "status": result.status.as_str(),
        "output": result.output,
        "error": result.error,
        "startedAt": result.started_at.map(|t| t.to_rfc3339()),
        "completedAt": result.completed_at.map(|t| t.to_rfc3339()),
    })
}
