//! Request dispatch: routes a (package, action) pair to its handler.
//!
//! The allow-list is closed. An unknown package fails before action
//! lookup, an unknown action fails before any handler runs, and a
//! rejected pair has no side effects.

pub mod routing;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use crate::error::BridgeError;
use crate::inference::InferenceEngine;
use crate::workflow::engine::WorkflowEngine;
use crate::workflow::wait;
use routing::RiskRouting;

/// The two capability packages the bridge can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Package {
    /// Clinical inference: entity extraction and risk scoring.
    Pybrain,
    /// Workflow orchestration.
    Pyheart,
}

impl Package {
    pub fn as_str(&self) -> &'static str {
        match self {
            Package::Pybrain => "pybrain",
            Package::Pyheart => "pyheart",
        }
    }
}

impl FromStr for Package {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pybrain" => Ok(Package::Pybrain),
            "pyheart" => Ok(Package::Pyheart),
            other => Err(BridgeError::UnsupportedPackage(other.to_string())),
        }
    }
}

/// Routes requests into the inference and workflow engines.
///
/// Holds the one process-lifetime inference engine; a workflow engine is
/// created fresh per `run_workflow` call so no workflow state crosses
/// invocations.
pub struct Dispatcher {
    model: Arc<dyn InferenceEngine>,
}

impl Dispatcher {
    pub fn new(model: Arc<dyn InferenceEngine>) -> Self {
        Self { model }
    }

    /// Resolve the pair against the allow-list and run the handler.
    pub async fn dispatch(
        &self,
        package: &str,
        action: &str,
        payload: &Value,
        wait_timeout: Duration,
    ) -> Result<Value, BridgeError> {
        let package = package.parse::<Package>()?;
        tracing::debug!(package = package.as_str(), action, "dispatching");

        match (package, action) {
            (Package::Pybrain, "extract_entities") => Ok(self.extract_entities(payload).await),
            (Package::Pybrain, "predict_risk") => Ok(self.predict_risk(payload).await),
            (Package::Pyheart, "run_workflow") => self.run_workflow(payload, wait_timeout).await,
            _ => Err(BridgeError::UnsupportedAction {
                package: package.as_str().to_string(),
                action: action.to_string(),
            }),
        }
    }

    async fn extract_entities(&self, payload: &Value) -> Value {
        let text = payload.get("text").and_then(Value::as_str).unwrap_or("");
        let entities = self.model.extract_clinical_entities(text).await;
        let info = self.model.info();
        json!({
            "entities": entities,
            "meta": { "model": info.name, "modelType": info.model_type },
        })
    }

    async fn predict_risk(&self, payload: &Value) -> Value {
        // Accept either {patient: {...}} or a bare patient document.
        let patient = payload.get("patient").unwrap_or(payload);
        let risk = self.model.predict_risk_score(patient).await;
        let readmission = self.model.predict_readmission_risk(patient).await;
        let fall = self.model.predict_fall_risk(&fall_context(patient)).await;
        json!({
            "riskScore": risk,
            "secondaryScores": { "readmission": readmission, "fall": fall },
        })
    }

    /// Build the risk routing definition, run it on a fresh engine, and
    /// wait for the instance to finish. The snapshot is augmented with the
    /// input risk score so callers can correlate without re-parsing.
    async fn run_workflow(
        &self,
        payload: &Value,
        wait_timeout: Duration,
    ) -> Result<Value, BridgeError> {
        let routing = RiskRouting::from_payload(payload);
        let engine = WorkflowEngine::new();

        engine.register_process(routing.definition()).await?;
        let instance_id = engine
            .start_process(crate::consts::RISK_ROUTING_PROCESS_ID, routing.variables())
            .await?;

        let snapshot = wait::await_instance(&engine, &instance_id, wait_timeout).await?;
        let mut result = serde_json::to_value(&snapshot).map_err(anyhow::Error::from)?;
        result["riskScore"] = json!(routing.risk_score());
        Ok(result)
    }
}

/// The fall model reads demographics alongside the flat patient fields;
/// feed it the same merged shape the SDK does.
fn fall_context(patient: &Value) -> Value {
    let mut merged = patient.as_object().cloned().unwrap_or_default();
    merged.insert("demographics".to_string(), patient.clone());
    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_parses_known_names() {
        assert_eq!("pybrain".parse::<Package>().unwrap(), Package::Pybrain);
        assert_eq!("pyheart".parse::<Package>().unwrap(), Package::Pyheart);
    }

    #[test]
    fn package_rejects_unknown_names() {
        let err = "tensorflow".parse::<Package>().unwrap_err();
        assert_eq!(err.code(), "unsupported-package");
        assert!(err.to_string().contains("tensorflow"));
    }

    #[test]
    fn package_names_are_case_sensitive() {
        assert!("PyBrain".parse::<Package>().is_err());
    }

    #[test]
    fn fall_context_nests_demographics() {
        let patient = json!({ "age": 70, "medications": ["warfarin"] });
        let merged = fall_context(&patient);
        assert_eq!(merged["age"], 70);
        assert_eq!(merged["demographics"]["age"], 70);
    }
}
