use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use carebridge::consts::{DEFAULT_PRIMARY_PHYSICIAN, DEFAULT_WAIT_TIMEOUT};
use carebridge::dispatch::Dispatcher;
use carebridge::inference::Entity;
use carebridge::inference::mock::MockModel;

fn dispatcher(risk: f64) -> Dispatcher {
    Dispatcher::new(Arc::new(MockModel::new(risk)))
}

async fn run_workflow(payload: Value) -> Value {
    dispatcher(0.0)
        .dispatch("pyheart", "run_workflow", &payload, DEFAULT_WAIT_TIMEOUT)
        .await
        .unwrap()
}

// ── Allow-list ────────────────────────────────────────────────────

#[tokio::test]
async fn every_valid_pair_dispatches() {
    let d = dispatcher(0.4);
    let timeout = DEFAULT_WAIT_TIMEOUT;

    assert!(
        d.dispatch("pybrain", "extract_entities", &json!({}), timeout)
            .await
            .is_ok()
    );
    assert!(
        d.dispatch("pybrain", "predict_risk", &json!({}), timeout)
            .await
            .is_ok()
    );
    assert!(
        d.dispatch("pyheart", "run_workflow", &json!({}), timeout)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn unknown_package_fails_before_action_lookup() {
    let err = dispatcher(0.4)
        .dispatch("pytorch", "extract_entities", &json!({}), DEFAULT_WAIT_TIMEOUT)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "unsupported-package");
    assert!(err.to_string().contains("pytorch"));
}

#[tokio::test]
async fn unknown_pybrain_action_is_rejected() {
    let err = dispatcher(0.4)
        .dispatch("pybrain", "train_model", &json!({}), DEFAULT_WAIT_TIMEOUT)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "unsupported-action");
    assert!(err.to_string().contains("train_model"));
}

#[tokio::test]
async fn actions_do_not_cross_packages() {
    let d = dispatcher(0.4);
    let err = d
        .dispatch("pyheart", "extract_entities", &json!({}), DEFAULT_WAIT_TIMEOUT)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "unsupported-action");

    let err = d
        .dispatch("pybrain", "run_workflow", &json!({}), DEFAULT_WAIT_TIMEOUT)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "unsupported-action");
}

// ── pybrain handlers ──────────────────────────────────────────────

#[tokio::test]
async fn extract_entities_reports_entities_and_model_meta() {
    let model = MockModel::new(0.2).with_entities(vec![Entity {
        text: "diabetes".into(),
        label: "condition".into(),
        confidence: 0.9,
    }]);
    let d = Dispatcher::new(Arc::new(model));

    let result = d
        .dispatch(
            "pybrain",
            "extract_entities",
            &json!({ "text": "history of diabetes" }),
            DEFAULT_WAIT_TIMEOUT,
        )
        .await
        .unwrap();

    assert_eq!(result["entities"][0]["text"], "diabetes");
    assert_eq!(result["meta"]["model"], "mock");
    assert_eq!(result["meta"]["modelType"], "scripted");
}

#[tokio::test]
async fn predict_risk_reports_primary_and_secondary_scores() {
    let result = dispatcher(0.8)
        .dispatch(
            "pybrain",
            "predict_risk",
            &json!({ "patient": { "id": "p1" } }),
            DEFAULT_WAIT_TIMEOUT,
        )
        .await
        .unwrap();

    assert_eq!(result["riskScore"], 0.8);
    assert_eq!(result["secondaryScores"]["readmission"], 0.4);
    assert_eq!(result["secondaryScores"]["fall"], 0.2);
}

// ── pyheart end-to-end ────────────────────────────────────────────

#[tokio::test]
async fn high_risk_workflow_routes_to_critical_response() {
    let result = run_workflow(json!({
        "patient": { "id": "p1" },
        "riskScore": 0.9,
        "careTeam": ["a@x.com", "b@x.com"]
    }))
    .await;

    assert_eq!(result["status"], "completed");
    assert_eq!(result["riskScore"], 0.9);
    assert_eq!(result["variables"]["care_plan"], "critical-response");

    let tasks = result["tasks"].as_object().unwrap();
    assert_eq!(tasks.len(), 3);
    for id in ["fetch-context", "evaluate-risk", "notify-team"] {
        assert_eq!(tasks[id]["status"], "completed", "task {id}");
    }

    assert_eq!(
        tasks["notify-team"]["output"]["recipient"],
        "a@x.com,b@x.com"
    );
    assert_eq!(
        tasks["fetch-context"]["output"]["url"],
        "https://fhir.example.com/Patient/p1"
    );
}

#[tokio::test]
async fn risk_exactly_at_upper_threshold_does_not_escalate() {
    let result = run_workflow(json!({ "riskScore": 0.8 })).await;
    // strict greater-than: 0.8 falls through to the 0.5 rule instead
    assert_eq!(result["variables"]["care_plan"], "priority-followup");
}

#[tokio::test]
async fn risk_just_above_upper_threshold_escalates() {
    let result = run_workflow(json!({ "riskScore": 0.81 })).await;
    assert_eq!(result["variables"]["care_plan"], "critical-response");
}

#[tokio::test]
async fn risk_exactly_at_lower_threshold_matches_no_rule() {
    let result = run_workflow(json!({ "riskScore": 0.5 })).await;
    assert!(result["variables"].get("care_plan").is_none());
}

#[tokio::test]
async fn mid_risk_routes_to_priority_followup() {
    let result = run_workflow(json!({ "riskScore": 0.55 })).await;
    assert_eq!(result["variables"]["care_plan"], "priority-followup");
}

#[tokio::test]
async fn low_risk_mutates_no_variables() {
    let result = run_workflow(json!({ "riskScore": 0.1 })).await;
    assert!(result["variables"].get("care_plan").is_none());
    assert_eq!(result["status"], "completed");
}

#[tokio::test]
async fn empty_payload_uses_defaults_end_to_end() {
    let result = run_workflow(json!({})).await;

    assert_eq!(result["status"], "completed");
    assert_eq!(result["variables"]["patient_id"], "unknown");
    // empty care team falls back to the seeded primary physician
    assert_eq!(
        result["tasks"]["notify-team"]["output"]["recipient"],
        DEFAULT_PRIMARY_PHYSICIAN
    );
}

#[tokio::test]
async fn workflow_timeout_surfaces_as_timeout_error() {
    // 0 seconds: the deadline passes before the first poll observes a
    // terminal status.
    let err = dispatcher(0.0)
        .dispatch(
            "pyheart",
            "run_workflow",
            &json!({ "riskScore": 0.9 }),
            Duration::from_secs(0),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "timeout");
}
