//! The clinical inference seam.
//!
//! One engine instance is constructed at startup and shared by every
//! pybrain action for the life of the process. Predictions are stateless,
//! so the shared instance needs no synchronization beyond `Send + Sync`.

pub mod clinical;
pub mod mock;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Readable descriptor for the loaded model.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    pub model_type: String,
}

/// A clinical entity found in free text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub text: String,
    pub label: String,
    pub confidence: f64,
}

/// The borrowed clinical brain. Could be a trained model, a remote
/// service, or a scripted test double.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    fn info(&self) -> &ModelInfo;

    async fn extract_clinical_entities(&self, text: &str) -> Vec<Entity>;

    /// Primary deterioration risk in [0, 1].
    async fn predict_risk_score(&self, patient: &Value) -> f64;

    /// 30-day readmission risk in [0, 1].
    async fn predict_readmission_risk(&self, patient: &Value) -> f64;

    /// Fall risk in [0, 1]. Reads demographics alongside flat fields.
    async fn predict_fall_risk(&self, patient: &Value) -> f64;
}
