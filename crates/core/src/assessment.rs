//! Canonical movement-assessment types.
//!
//! These are the *normalized* shapes held in memory after a server
//! response has passed through [`crate::normalize`].  Every collection
//! is present (possibly empty) and every nested structure is owned, so
//! downstream code never branches on "missing vs empty" and never
//! aliases a server response object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::AssessmentId;

/// A labeled still frame attached to an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyFrame {
    pub id: uuid::Uuid,
    pub url: String,
    pub label: Option<String>,
    pub captured_at: Option<DateTime<Utc>>,
}

/// Numeric movement metrics produced by the scoring model.
///
/// Individual metrics stay optional (the model does not score every
/// metric for every view); unknown metrics are preserved in `extra`
/// so a newer server cannot silently drop data on the floor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementMetrics {
    pub knee_valgus_score: Option<f64>,
    pub trunk_lean_outside_bos: Option<bool>,
    pub foot_plant_outside_com: Option<bool>,
    pub risk_rating: Option<String>,
    pub view_confidence: Option<f64>,
    pub counterfactual_tweak: Option<String>,
    pub predicted_risk_drop: Option<f64>,
    pub peak_risk_phase: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A single corrective drill inside a micro-plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drill {
    pub name: String,
    pub sets: Option<u32>,
    pub reps: Option<u32>,
    pub cue: Option<String>,
}

/// A short corrective drill assignment attached to an assessment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroPlan {
    pub drills: Vec<Drill>,
    pub completion: Option<ProofCompletion>,
    /// `true` only while the fix is neither assigned nor completed.
    pub quick_assign_available: bool,
}

/// A visual annotation rendered over a key frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overlay {
    pub frame_id: Option<uuid::Uuid>,
    pub kind: String,
    pub data: serde_json::Value,
}

/// The athlete's logged completion of a corrective micro-plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofCompletion {
    pub completed: bool,
    pub rpe: Option<f64>,
    pub pain: Option<f64>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Record of whether a corrective fix was assigned and/or completed,
/// plus derived confidence and verdict fields.
///
/// The server response is the source of truth on every round trip; the
/// local copy is a working cache mutated optimistically by the proof
/// tracker and reconciled via [`crate::proof::apply_proof_update`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    pub fix_assigned: bool,
    pub completion: Option<ProofCompletion>,
    pub band: Option<String>,
    pub uncertainty_0_to_1: Option<f64>,
    pub view_quality: Option<f64>,
    pub micro_plan: Option<MicroPlan>,
    pub verdict: Option<String>,
    pub verdict_reason: Option<String>,
}

/// Canonical, fully-defaulted movement assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementAssessment {
    pub id: AssessmentId,
    pub athlete_id: String,
    pub drill_type: String,
    pub created_at: Option<DateTime<Utc>>,
    pub cues: Vec<String>,
    pub metrics: MovementMetrics,
    pub frames: Vec<KeyFrame>,
    pub micro_plan: Option<MicroPlan>,
    pub proof: Option<Proof>,
    pub overlays: Vec<Overlay>,
    /// Read-through cache of `proof.band` for display.
    pub band_summary: Option<String>,
    /// Read-through cache of `proof.uncertainty_0_to_1` for display.
    pub uncertainty_0_to_1: Option<f64>,
}

impl MovementAssessment {
    /// Whether the attached micro-plan has been logged as completed.
    pub fn is_completed(&self) -> bool {
        self.proof
            .as_ref()
            .and_then(|p| p.completion.as_ref())
            .map(|c| c.completed)
            .unwrap_or(false)
    }

    /// Whether a corrective fix is currently assigned.
    pub fn fix_assigned(&self) -> bool {
        self.proof.as_ref().map(|p| p.fix_assigned).unwrap_or(false)
    }
}
