//! Feature projection for the external risk-scoring engine.
//!
//! The risk engine consumes a fixed projection of a normalized
//! assessment.  Delivery is best-effort and at-most-once; the engine is
//! allowed to miss updates, so this module only defines the payload.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::assessment::MovementAssessment;

/// Derived features forwarded to `POST /risk/features/video`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRiskFeatures {
    pub knee_valgus_score: Option<f64>,
    pub trunk_lean_outside_bos: Option<bool>,
    pub foot_plant_outside_com: Option<bool>,
    pub risk_rating: Option<String>,
    pub view_confidence: Option<f64>,
    pub counterfactual_tweak: Option<String>,
    pub predicted_risk_drop: Option<f64>,
    pub peak_risk_phase: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl VideoRiskFeatures {
    /// Project the forwardable features out of a normalized assessment.
    pub fn from_assessment(assessment: &MovementAssessment) -> Self {
        let m = &assessment.metrics;
        Self {
            knee_valgus_score: m.knee_valgus_score,
            trunk_lean_outside_bos: m.trunk_lean_outside_bos,
            foot_plant_outside_com: m.foot_plant_outside_com,
            risk_rating: m.risk_rating.clone(),
            view_confidence: m.view_confidence,
            counterfactual_tweak: m.counterfactual_tweak.clone(),
            predicted_risk_drop: m.predicted_risk_drop,
            peak_risk_phase: m.peak_risk_phase.clone(),
            generated_at: assessment.created_at.unwrap_or_else(Utc::now),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{normalize, RawAssessment};

    #[test]
    fn projection_copies_metrics_and_timestamp() {
        let raw: RawAssessment = serde_json::from_value(serde_json::json!({
            "createdAt": "2026-08-01T10:00:00Z",
            "metrics": {
                "kneeValgusScore": 0.55,
                "trunkLeanOutsideBos": true,
                "footPlantOutsideCom": false,
                "riskRating": "high",
                "viewConfidence": 0.9,
                "counterfactualTweak": "wider stance",
                "predictedRiskDrop": 0.12,
                "peakRiskPhase": "landing",
            },
        }))
        .unwrap();
        let a = normalize(raw);

        let features = VideoRiskFeatures::from_assessment(&a);
        assert_eq!(features.knee_valgus_score, Some(0.55));
        assert_eq!(features.trunk_lean_outside_bos, Some(true));
        assert_eq!(features.foot_plant_outside_com, Some(false));
        assert_eq!(features.risk_rating.as_deref(), Some("high"));
        assert_eq!(features.view_confidence, Some(0.9));
        assert_eq!(features.counterfactual_tweak.as_deref(), Some("wider stance"));
        assert_eq!(features.predicted_risk_drop, Some(0.12));
        assert_eq!(features.peak_risk_phase.as_deref(), Some("landing"));
        assert_eq!(features.generated_at, a.created_at.unwrap());
    }

    #[test]
    fn projection_serializes_with_wire_field_names() {
        let raw: RawAssessment = serde_json::from_value(serde_json::json!({
            "createdAt": "2026-08-01T10:00:00Z",
            "metrics": { "kneeValgusScore": 0.3 },
        }))
        .unwrap();
        let features = VideoRiskFeatures::from_assessment(&normalize(raw));

        let json = serde_json::to_value(&features).unwrap();
        assert_eq!(json["kneeValgusScore"], serde_json::json!(0.3));
        assert!(json.get("generatedAt").is_some());
    }
}
