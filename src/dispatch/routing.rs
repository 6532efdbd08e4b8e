//! The clinical risk routing process: the one declarative graph the
//! bridge submits to the workflow engine.

use std::collections::HashMap;

use serde_json::{Value, json};

use crate::consts::{DEFAULT_FHIR_SERVER, DEFAULT_PRIMARY_PHYSICIAN, RISK_ROUTING_PROCESS_ID};
use crate::workflow::{
    Condition, DecisionRule, Operator, ProcessDefinition, RuleAction, Task, TaskKind,
};

/// Caller-supplied context for one risk routing run: patient, model-derived
/// risk score, environment context, and care team.
pub struct RiskRouting {
    patient: Value,
    risk_score: f64,
    context: Value,
    care_team: Vec<String>,
}

impl RiskRouting {
    /// Pull each piece out of the request payload, defaulting independently.
    pub fn from_payload(payload: &Value) -> Self {
        let care_team = payload
            .get("careTeam")
            .and_then(Value::as_array)
            .map(|team| {
                team.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            patient: payload.get("patient").cloned().unwrap_or_else(|| json!({})),
            risk_score: payload
                .get("riskScore")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            context: payload.get("context").cloned().unwrap_or_else(|| json!({})),
            care_team,
        }
    }

    pub fn risk_score(&self) -> f64 {
        self.risk_score
    }

    /// The fixed three-task graph: fetch clinical context, evaluate risk
    /// thresholds, notify the care team. Each dependency points at the
    /// task defined directly before it.
    pub fn definition(&self) -> ProcessDefinition {
        let team_recipient = if self.care_team.is_empty() {
            "${primary_physician}".to_string()
        } else {
            self.care_team.join(",")
        };

        ProcessDefinition {
            id: RISK_ROUTING_PROCESS_ID.to_string(),
            name: "Clinical Risk Routing".to_string(),
            description: "Routes patients based on model-derived risk scores".to_string(),
            tasks: vec![
                Task {
                    id: "fetch-context".to_string(),
                    name: "Fetch Clinical Context".to_string(),
                    depends_on: vec![],
                    kind: TaskKind::ApiCall {
                        method: "GET".to_string(),
                        url: "${fhir_server}/Patient/${patient_id}".to_string(),
                    },
                },
                Task {
                    id: "evaluate-risk".to_string(),
                    name: "Evaluate Risk Thresholds".to_string(),
                    depends_on: vec!["fetch-context".to_string()],
                    kind: TaskKind::Decision {
                        rules: vec![
                            DecisionRule {
                                condition: Condition {
                                    operator: Operator::Gt,
                                    left: json!("$risk_score"),
                                    right: json!(0.8),
                                },
                                actions: vec![
                                    RuleAction::SetVariable {
                                        variable: "care_plan".to_string(),
                                        value: json!("critical-response"),
                                    },
                                    RuleAction::Notification {
                                        recipient: "${primary_physician}".to_string(),
                                    },
                                ],
                            },
                            DecisionRule {
                                condition: Condition {
                                    operator: Operator::Gt,
                                    left: json!("$risk_score"),
                                    right: json!(0.5),
                                },
                                actions: vec![RuleAction::SetVariable {
                                    variable: "care_plan".to_string(),
                                    value: json!("priority-followup"),
                                }],
                            },
                        ],
                    },
                },
                Task {
                    id: "notify-team".to_string(),
                    name: "Notify Care Team".to_string(),
                    depends_on: vec!["evaluate-risk".to_string()],
                    kind: TaskKind::Notification {
                        channel: "email".to_string(),
                        recipient: team_recipient,
                        template: "risk-alert".to_string(),
                    },
                },
            ],
        }
    }

    /// Seed the engine variable bag. Every `${}` placeholder in the graph
    /// resolves against these names at execution time — the builder itself
    /// substitutes nothing.
    pub fn variables(&self) -> HashMap<String, Value> {
        HashMap::from([
            (
                "patient_id".to_string(),
                json!(
                    self.patient
                        .get("id")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                ),
            ),
            (
                "patient_name".to_string(),
                json!(
                    self.patient
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                ),
            ),
            ("risk_score".to_string(), json!(self.risk_score)),
            (
                "fhir_server".to_string(),
                json!(
                    self.context
                        .get("fhirServer")
                        .and_then(Value::as_str)
                        .unwrap_or(DEFAULT_FHIR_SERVER)
                ),
            ),
            (
                "primary_physician".to_string(),
                json!(
                    self.context
                        .get("primaryPhysician")
                        .and_then(Value::as_str)
                        .unwrap_or(DEFAULT_PRIMARY_PHYSICIAN)
                ),
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_has_three_tasks_in_dependency_order() {
        let routing = RiskRouting::from_payload(&json!({}));
        let def = routing.definition();

        assert_eq!(def.id, RISK_ROUTING_PROCESS_ID);
        let ids: Vec<&str> = def.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["fetch-context", "evaluate-risk", "notify-team"]);
        assert_eq!(def.tasks[1].depends_on, ["fetch-context"]);
        assert_eq!(def.tasks[2].depends_on, ["evaluate-risk"]);
    }

    #[test]
    fn care_team_is_comma_joined() {
        let routing = RiskRouting::from_payload(&json!({
            "careTeam": ["a@x.com", "b@x.com"]
        }));
        let def = routing.definition();
        match &def.tasks[2].kind {
            TaskKind::Notification { recipient, .. } => {
                assert_eq!(recipient, "a@x.com,b@x.com");
            }
            other => panic!("expected notification task, got {other:?}"),
        }
    }

    #[test]
    fn empty_care_team_falls_back_to_placeholder() {
        let routing = RiskRouting::from_payload(&json!({}));
        let def = routing.definition();
        match &def.tasks[2].kind {
            TaskKind::Notification { recipient, .. } => {
                assert_eq!(recipient, "${primary_physician}");
            }
            other => panic!("expected notification task, got {other:?}"),
        }
    }

    #[test]
    fn variables_default_when_payload_is_empty() {
        let routing = RiskRouting::from_payload(&json!({}));
        let vars = routing.variables();
        assert_eq!(vars["patient_id"], "unknown");
        assert_eq!(vars["patient_name"], "");
        assert_eq!(vars["risk_score"], 0.0);
        assert_eq!(vars["fhir_server"], DEFAULT_FHIR_SERVER);
        assert_eq!(vars["primary_physician"], DEFAULT_PRIMARY_PHYSICIAN);
    }

    #[test]
    fn variables_take_caller_context() {
        let routing = RiskRouting::from_payload(&json!({
            "patient": { "id": "p1", "name": "Sara" },
            "riskScore": 0.9,
            "context": {
                "fhirServer": "https://fhir.hospital.sa",
                "primaryPhysician": "dr@hospital.sa"
            }
        }));
        let vars = routing.variables();
        assert_eq!(vars["patient_id"], "p1");
        assert_eq!(vars["patient_name"], "Sara");
        assert_eq!(vars["risk_score"], 0.9);
        assert_eq!(vars["fhir_server"], "https://fhir.hospital.sa");
        assert_eq!(vars["primary_physician"], "dr@hospital.sa");
    }

    #[test]
    fn non_string_care_team_entries_are_skipped() {
        let routing = RiskRouting::from_payload(&json!({ "careTeam": ["a@x.com", 7] }));
        let def = routing.definition();
        match &def.tasks[2].kind {
            TaskKind::Notification { recipient, .. } => assert_eq!(recipient, "a@x.com"),
            other => panic!("expected notification task, got {other:?}"),
        }
    }
}
