//! A scripted inference engine for tests. Returns fixed answers.

use async_trait::async_trait;
use serde_json::Value;

use super::{Entity, InferenceEngine, ModelInfo};

/// Fixed-answer test double for [`InferenceEngine`].
pub struct MockModel {
    info: ModelInfo,
    pub entities: Vec<Entity>,
    pub risk: f64,
    pub readmission: f64,
    pub fall: f64,
}

impl MockModel {
    pub fn new(risk: f64) -> Self {
        Self {
            info: ModelInfo {
                name: "mock".to_string(),
                model_type: "scripted".to_string(),
            },
            entities: Vec::new(),
            risk,
            readmission: risk / 2.0,
            fall: risk / 4.0,
        }
    }

    pub fn with_entities(mut self, entities: Vec<Entity>) -> Self {
        self.entities = entities;
        self
    }
}

#[async_trait]
impl InferenceEngine for MockModel {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    async fn extract_clinical_entities(&self, _text: &str) -> Vec<Entity> {
        self.entities.clone()
    }

    async fn predict_risk_score(&self, _patient: &Value) -> f64 {
        self.risk
    }

    async fn predict_readmission_risk(&self, _patient: &Value) -> f64 {
        self.readmission
    }

    async fn predict_fall_risk(&self, _patient: &Value) -> f64 {
        self.fall
    }
}
