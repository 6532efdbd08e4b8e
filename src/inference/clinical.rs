//! Lexicon- and feature-based clinical model: deterministic functions of
//! the patient document, no I/O, scores clamped to [0, 1].

use async_trait::async_trait;
use serde_json::Value;

use super::{Entity, InferenceEngine, ModelInfo};

const CONDITIONS: &[&str] = &[
    "diabetes",
    "hypertension",
    "heart failure",
    "atrial fibrillation",
    "copd",
    "asthma",
    "stroke",
    "chronic kidney disease",
    "pneumonia",
    "sepsis",
];

const MEDICATIONS: &[&str] = &[
    "metformin",
    "insulin",
    "lisinopril",
    "warfarin",
    "apixaban",
    "furosemide",
    "aspirin",
    "atorvastatin",
    "amlodipine",
];

const SYMPTOMS: &[&str] = &[
    "chest pain",
    "shortness of breath",
    "dizziness",
    "fatigue",
    "palpitations",
    "confusion",
    "edema",
    "syncope",
];

/// Rule-based stand-in for the trained clinical models.
pub struct ClinicalModel {
    info: ModelInfo,
}

impl ClinicalModel {
    pub fn new() -> Self {
        Self {
            info: ModelInfo {
                name: "clinical-heuristics-v1".to_string(),
                model_type: "rule-based".to_string(),
            },
        }
    }

    /// Age from the flat document or its demographics block.
    fn age(patient: &Value) -> f64 {
        patient
            .get("age")
            .or_else(|| patient.get("demographics").and_then(|d| d.get("age")))
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }

    fn list_len(patient: &Value, field: &str) -> f64 {
        patient
            .get(field)
            .and_then(Value::as_array)
            .map_or(0, Vec::len) as f64
    }

    fn vital(patient: &Value, name: &str) -> Option<f64> {
        patient
            .get("vitals")
            .and_then(|v| v.get(name))
            .and_then(Value::as_f64)
    }
}

impl Default for ClinicalModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceEngine for ClinicalModel {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    async fn extract_clinical_entities(&self, text: &str) -> Vec<Entity> {
        let mut entities = Vec::new();
        scan(text, CONDITIONS, "condition", 0.9, &mut entities);
        scan(text, MEDICATIONS, "medication", 0.85, &mut entities);
        scan(text, SYMPTOMS, "symptom", 0.75, &mut entities);
        entities
    }

    async fn predict_risk_score(&self, patient: &Value) -> f64 {
        let mut score = (Self::age(patient) / 200.0).min(0.35);
        score += (Self::list_len(patient, "conditions") * 0.12).min(0.36);
        if Self::vital(patient, "systolicBp").is_some_and(|bp| bp >= 160.0) {
            score += 0.15;
        }
        if Self::vital(patient, "oxygenSaturation").is_some_and(|sat| sat < 92.0) {
            score += 0.15;
        }
        score.clamp(0.0, 1.0)
    }

    async fn predict_readmission_risk(&self, patient: &Value) -> f64 {
        let admissions = patient
            .get("priorAdmissions")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let conditions = Self::list_len(patient, "conditions");
        (0.05 + admissions * 0.18 + conditions * 0.08).clamp(0.0, 1.0)
    }

    async fn predict_fall_risk(&self, patient: &Value) -> f64 {
        let mut score: f64 = if Self::age(patient) >= 65.0 { 0.3 } else { 0.1 };
        score += (Self::list_len(patient, "medications") * 0.07).min(0.28);
        if patient
            .get("mobilityImpaired")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            score += 0.25;
        }
        score.clamp(0.0, 1.0)
    }
}

fn scan(text: &str, terms: &[&str], label: &str, confidence: f64, out: &mut Vec<Entity>) {
    let haystack = text.to_lowercase();
    for term in terms {
        if haystack.contains(term) {
            out.push(Entity {
                text: (*term).to_string(),
                label: label.to_string(),
                confidence,
            });
        }
    }
}
