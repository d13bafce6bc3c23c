//! Total normalization of raw assessment API responses.
//!
//! The assessment API's response shape is only partially specified:
//! any field may be absent, `null`, or carried in a nested `proof`
//! object instead of at the top level.  Everything that enters the
//! in-memory model passes through [`normalize`] exactly once, which
//! replaces every optional collection with an empty one, rebuilds every
//! nested structure (no aliasing of response objects), and recomputes
//! the derived micro-plan fields.  Downstream code never re-normalizes.
//!
//! Normalization is idempotent: serializing a canonical assessment and
//! feeding it back through [`normalize`] is a no-op.  The proof tracker
//! relies on this when it re-uses [`normalize_proof`] on the partial
//! responses returned by proof PATCH calls.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::assessment::{
    Drill, KeyFrame, MicroPlan, MovementAssessment, MovementMetrics, Overlay, Proof,
    ProofCompletion,
};

// ---------------------------------------------------------------------------
// Raw response shapes (everything optional)
// ---------------------------------------------------------------------------

/// Assessment as returned by the server, before normalization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAssessment {
    pub id: Option<uuid::Uuid>,
    pub athlete_id: Option<String>,
    pub drill_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub cues: Option<Vec<String>>,
    pub metrics: Option<RawMetrics>,
    pub frames: Option<Vec<RawKeyFrame>>,
    pub micro_plan: Option<RawMicroPlan>,
    pub proof: Option<RawProof>,
    pub overlays: Option<Vec<RawOverlay>>,
    pub band_summary: Option<String>,
    pub uncertainty_0_to_1: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMetrics {
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

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawKeyFrame {
    pub id: Option<uuid::Uuid>,
    pub url: Option<String>,
    pub label: Option<String>,
    pub captured_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMicroPlan {
    pub drills: Option<Vec<RawDrill>>,
    pub completion: Option<RawCompletion>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDrill {
    pub name: Option<String>,
    pub sets: Option<u32>,
    pub reps: Option<u32>,
    pub cue: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCompletion {
    pub completed: Option<bool>,
    pub rpe: Option<f64>,
    pub pain: Option<f64>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Proof as returned by the server (also the shape of proof PATCH
/// responses, which is why `fix_assigned` stays optional here).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProof {
    pub fix_assigned: Option<bool>,
    pub completion: Option<RawCompletion>,
    pub band: Option<String>,
    pub uncertainty_0_to_1: Option<f64>,
    pub view_quality: Option<f64>,
    pub micro_plan: Option<RawMicroPlan>,
    pub verdict: Option<String>,
    pub verdict_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOverlay {
    pub frame_id: Option<uuid::Uuid>,
    pub kind: Option<String>,
    pub data: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Normalizers
// ---------------------------------------------------------------------------

/// Normalize a raw server assessment into the canonical shape.
pub fn normalize(raw: RawAssessment) -> MovementAssessment {
    let proof = raw.proof.map(normalize_proof);

    let fix_assigned = proof.as_ref().map(|p| p.fix_assigned).unwrap_or(false);
    let proof_completion = proof.as_ref().and_then(|p| p.completion.clone());

    // Prefer the assessment-level plan; fall back to the one nested in
    // the proof so a partial response still yields a usable plan.
    let micro_plan = raw
        .micro_plan
        .map(|mp| normalize_micro_plan(mp, fix_assigned, proof_completion.clone()))
        .or_else(|| proof.as_ref().and_then(|p| p.micro_plan.clone()));

    // Top-level convenience fields read through to the proof.
    let band_summary = raw
        .band_summary
        .or_else(|| proof.as_ref().and_then(|p| p.band.clone()));
    let uncertainty_0_to_1 = raw
        .uncertainty_0_to_1
        .or_else(|| proof.as_ref().and_then(|p| p.uncertainty_0_to_1));

    MovementAssessment {
        id: raw.id.unwrap_or_default(),
        athlete_id: raw.athlete_id.unwrap_or_default(),
        drill_type: raw.drill_type.unwrap_or_default(),
        created_at: raw.created_at,
        cues: raw.cues.unwrap_or_default(),
        metrics: raw.metrics.map(normalize_metrics).unwrap_or_default(),
        frames: raw
            .frames
            .unwrap_or_default()
            .into_iter()
            .map(normalize_key_frame)
            .collect(),
        micro_plan,
        proof,
        overlays: raw
            .overlays
            .unwrap_or_default()
            .into_iter()
            .map(normalize_overlay)
            .collect(),
        band_summary,
        uncertainty_0_to_1,
    }
}

/// Normalize a raw proof, including the micro-plan nested inside it.
pub fn normalize_proof(raw: RawProof) -> Proof {
    let fix_assigned = raw.fix_assigned.unwrap_or(false);
    let completion = raw.completion.map(normalize_completion);
    let micro_plan = raw
        .micro_plan
        .map(|mp| normalize_micro_plan(mp, fix_assigned, completion.clone()));

    Proof {
        fix_assigned,
        completion,
        band: raw.band,
        uncertainty_0_to_1: raw.uncertainty_0_to_1,
        view_quality: raw.view_quality,
        micro_plan,
        verdict: raw.verdict,
        verdict_reason: raw.verdict_reason,
    }
}

/// Normalize a raw micro-plan against the owning proof's state.
///
/// `quick_assign_available` is derived, never trusted from the wire:
/// it is `false` whenever the plan is completed, and otherwise mirrors
/// `!fix_assigned`.  The plan's completion reads through to the proof's
/// completion when one exists.
pub fn normalize_micro_plan(
    raw: RawMicroPlan,
    fix_assigned: bool,
    proof_completion: Option<ProofCompletion>,
) -> MicroPlan {
    let completion = proof_completion.or_else(|| raw.completion.map(normalize_completion));
    let completed = completion.as_ref().map(|c| c.completed).unwrap_or(false);

    MicroPlan {
        drills: raw
            .drills
            .unwrap_or_default()
            .into_iter()
            .map(normalize_drill)
            .collect(),
        completion,
        quick_assign_available: !fix_assigned && !completed,
    }
}

pub fn normalize_completion(raw: RawCompletion) -> ProofCompletion {
    ProofCompletion {
        completed: raw.completed.unwrap_or(false),
        rpe: raw.rpe,
        pain: raw.pain,
        completed_at: raw.completed_at,
    }
}

fn normalize_drill(raw: RawDrill) -> Drill {
    Drill {
        name: raw.name.unwrap_or_default(),
        sets: raw.sets,
        reps: raw.reps,
        cue: raw.cue,
    }
}

fn normalize_key_frame(raw: RawKeyFrame) -> KeyFrame {
    KeyFrame {
        id: raw.id.unwrap_or_default(),
        url: raw.url.unwrap_or_default(),
        label: raw.label,
        captured_at: raw.captured_at,
    }
}

fn normalize_metrics(raw: RawMetrics) -> MovementMetrics {
    MovementMetrics {
        knee_valgus_score: raw.knee_valgus_score,
        trunk_lean_outside_bos: raw.trunk_lean_outside_bos,
        foot_plant_outside_com: raw.foot_plant_outside_com,
        risk_rating: raw.risk_rating,
        view_confidence: raw.view_confidence,
        counterfactual_tweak: raw.counterfactual_tweak,
        predicted_risk_drop: raw.predicted_risk_drop,
        peak_risk_phase: raw.peak_risk_phase,
        extra: raw.extra,
    }
}

fn normalize_overlay(raw: RawOverlay) -> Overlay {
    Overlay {
        frame_id: raw.frame_id,
        kind: raw.kind.unwrap_or_default(),
        data: raw.data.unwrap_or(serde_json::Value::Null),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
