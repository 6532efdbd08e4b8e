//! The bridge error taxonomy. Every kind maps to a stable string code on
//! the error stream and to process exit code 1 — nothing is retried and
//! nothing recovers locally.

use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The payload argument or stdin content was not a valid JSON object.
    #[error("{0}")]
    MalformedPayload(String),

    /// The package is outside the closed {pybrain, pyheart} set.
    #[error("unsupported package: {0}")]
    UnsupportedPackage(String),

    /// The action is not in the package's allow-list.
    #[error("unsupported {package} action: {action}")]
    UnsupportedAction { package: String, action: String },

    /// The instance did not reach a terminal status within the deadline.
    #[error("workflow instance {instance_id} did not finish within the deadline")]
    Timeout { instance_id: String },

    /// Any other fault raised by the inference or workflow engine.
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

impl BridgeError {
    /// Machine-readable code for the error stream.
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::MalformedPayload(_) => "invalid-json",
            BridgeError::UnsupportedPackage(_) => "unsupported-package",
            BridgeError::UnsupportedAction { .. } => "unsupported-action",
            BridgeError::Timeout { .. } => "timeout",
            BridgeError::Upstream(_) => "unexpected",
        }
    }

    /// The single-line JSON object written to stderr on failure.
    pub fn to_json(&self) -> Value {
        json!({ "error": self.code(), "detail": self.to_string() })
    }
}
