//! Proof merge algorithm and completion-input validation.
//!
//! Proof PATCH responses are partial: the server may return a fresh
//! proof, or nothing at all (in which case the optimistically assumed
//! target state stands).  [`apply_proof_update`] reconciles either case
//! into the stored assessment without ever aliasing a response object.

use validator::Validate;

use crate::assessment::{MicroPlan, MovementAssessment, Proof, ProofCompletion};
use crate::error::CoreError;
use crate::normalize::{normalize_proof, RawProof};

/// Bounded numeric inputs for logging a micro-plan completion.
///
/// Both values live on the closed `[0, 10]` scale used by the
/// completion dialog; violations abort locally before any request.
#[derive(Debug, Clone, Copy, Validate)]
pub struct CompletionInput {
    /// Rating of perceived exertion.
    #[validate(range(min = 0.0, max = 10.0, message = "RPE must be between 0 and 10"))]
    pub rpe: f64,
    /// Pain score.
    #[validate(range(min = 0.0, max = 10.0, message = "Pain must be between 0 and 10"))]
    pub pain: f64,
}

impl CompletionInput {
    /// Validate both bounds, mapping to a domain error.
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate().map_err(|e| {
            let msg = e
                .field_errors()
                .values()
                .flat_map(|errs| errs.iter())
                .filter_map(|err| err.message.as_ref())
                .map(|m| m.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            CoreError::Validation(if msg.is_empty() {
                "Completion input out of range".to_string()
            } else {
                msg
            })
        })
    }
}

/// Merge a proof update into a stored assessment.
///
/// Given an optional fresh proof from the server and an optional
/// `fix_assigned` override (the optimistic target of a quick-assign):
///
/// 1. No fresh proof and no override is a no-op.
/// 2. Effective `fix_assigned` is `override ?? fresh ?? existing ?? false`.
/// 3. The fresh (else existing) proof's completion and micro-plan are
///    rebuilt, never aliased.
/// 4. The micro-plan's `quick_assign_available` and `completion` are
///    recomputed from the merged proof.
/// 5. `band_summary` and `uncertainty_0_to_1` read through onto the
///    assessment's top-level convenience fields.
pub fn apply_proof_update(
    assessment: &mut MovementAssessment,
    fresh: Option<RawProof>,
    fix_assigned_override: Option<bool>,
) {
    if fresh.is_none() && fix_assigned_override.is_none() {
        return;
    }

    let fresh_fix_assigned = fresh.as_ref().and_then(|p| p.fix_assigned);
    let mut merged = match fresh {
        Some(raw) => normalize_proof(raw),
        None => assessment.proof.clone().unwrap_or_default(),
    };

    merged.fix_assigned = fix_assigned_override
        .or(fresh_fix_assigned)
        .or(assessment.proof.as_ref().map(|p| p.fix_assigned))
        .unwrap_or(false);

    // The merged proof's plan wins when present; otherwise the stored
    // plan is kept and its derived fields recomputed.
    let plan = merged
        .micro_plan
        .take()
        .or_else(|| assessment.micro_plan.take());
    let plan = plan.map(|mut mp| {
        mp.completion = merged.completion.clone();
        mp.quick_assign_available = !merged.fix_assigned && !completed(&merged);
        mp
    });
    merged.micro_plan = plan.clone();
    assessment.micro_plan = plan;

    if merged.band.is_some() {
        assessment.band_summary = merged.band.clone();
    }
    if merged.uncertainty_0_to_1.is_some() {
        assessment.uncertainty_0_to_1 = merged.uncertainty_0_to_1;
    }

    assessment.proof = Some(merged);
}

/// Record a completion while preserving the rest of the proof.
///
/// Used when the server acknowledges a completion request without
/// returning a fresh proof; the optimistically assumed state stands.
pub fn record_completion(assessment: &mut MovementAssessment, completion: ProofCompletion) {
    let mut proof = assessment.proof.clone().unwrap_or_default();
    proof.completion = Some(completion.clone());

    let fix_assigned = proof.fix_assigned;
    let completed = completion.completed;
    let recompute = |mp: &mut MicroPlan| {
        mp.completion = Some(completion.clone());
        mp.quick_assign_available = !fix_assigned && !completed;
    };
    if let Some(mp) = proof.micro_plan.as_mut() {
        recompute(mp);
    }
    if let Some(mp) = assessment.micro_plan.as_mut() {
        recompute(mp);
    }

    assessment.proof = Some(proof);
}

/// Drop the completion sub-object while preserving `fix_assigned`.
///
/// Used when the server acknowledges a clear-completion request without
/// returning a fresh proof.
pub fn clear_completion(assessment: &mut MovementAssessment) {
    let mut proof = assessment.proof.clone().unwrap_or_default();
    proof.completion = None;

    let fix_assigned = proof.fix_assigned;
    let recompute = |mp: &mut MicroPlan| {
        mp.completion = None;
        mp.quick_assign_available = !fix_assigned;
    };
    if let Some(mp) = proof.micro_plan.as_mut() {
        recompute(mp);
    }
    if let Some(mp) = assessment.micro_plan.as_mut() {
        recompute(mp);
    }

    assessment.proof = Some(proof);
}

fn completed(proof: &Proof) -> bool {
    proof
        .completion
        .as_ref()
        .map(|c| c.completed)
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
