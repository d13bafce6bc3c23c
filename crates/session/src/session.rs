//! The assessment page session.
//!
//! State lives behind a `std::sync::Mutex` that is only held for
//! synchronous reads and writes, never across an await: network calls
//! run unlocked, and their results are reconciled against whatever the
//! state is when they land.  That is what lets two proof operations on
//! different assessments genuinely overlap while the
//! [`ProofTracker`] serializes same-slot operations.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use formcheck_capture::controller::FrameBatch;
use formcheck_client::api::{
    AssessmentApi, FramePayload, ProofPatch, RiskSink, SubmitAssessmentRequest, SubmitContext,
};
use formcheck_core::assessment::{MovementAssessment, ProofCompletion};
use formcheck_core::error::CoreError;
use formcheck_core::frames::{DraftPatch, FrameDraft, FrameDraftStore};
use formcheck_core::normalize::normalize;
use formcheck_core::proof::{
    apply_proof_update, clear_completion as clear_proof_completion, record_completion,
    CompletionInput,
};
use formcheck_core::types::{AssessmentId, DraftId};

use crate::error::SessionError;
use crate::proof_tracker::{ProofOp, ProofTracker};
use crate::risk_forward::RiskFeatureForwarder;
use crate::speech::SpeechSynth;

struct SessionState {
    athlete_id: String,
    drafts: FrameDraftStore,
    history: Vec<MovementAssessment>,
}

/// One open assessment page: the selected athlete, their frame drafts,
/// and the loaded assessment history.
pub struct Session {
    api: Arc<dyn AssessmentApi>,
    risk: RiskFeatureForwarder,
    speech: Arc<dyn SpeechSynth>,
    tracker: ProofTracker,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(
        athlete_id: impl Into<String>,
        api: Arc<dyn AssessmentApi>,
        risk_sink: Arc<dyn RiskSink>,
        speech: Arc<dyn SpeechSynth>,
    ) -> Self {
        Self {
            api,
            risk: RiskFeatureForwarder::new(risk_sink),
            speech,
            tracker: ProofTracker::new(),
            state: Mutex::new(SessionState {
                athlete_id: athlete_id.into(),
                drafts: FrameDraftStore::new(),
                history: Vec::new(),
            }),
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn athlete_id(&self) -> String {
        self.lock().athlete_id.clone()
    }

    pub fn drafts(&self) -> Vec<FrameDraft> {
        self.lock().drafts.drafts().to_vec()
    }

    pub fn history(&self) -> Vec<MovementAssessment> {
        self.lock().history.clone()
    }

    pub fn assessment(&self, id: AssessmentId) -> Option<MovementAssessment> {
        self.lock().history.iter().find(|a| a.id == id).cloned()
    }

    /// In-flight bookkeeping, used by the UI to disable buttons.
    pub fn tracker(&self) -> &ProofTracker {
        &self.tracker
    }

    // -- athlete ------------------------------------------------------------

    /// Select a different athlete, dropping the previous athlete's
    /// history and drafts.
    pub fn switch_athlete(&self, athlete_id: impl Into<String>) {
        let mut state = self.lock();
        state.athlete_id = athlete_id.into();
        state.history.clear();
        state.drafts.reset();
        tracing::info!(athlete_id = %state.athlete_id, "Switched athlete");
    }

    // -- drafts -------------------------------------------------------------

    /// Append a batch of uploaded frames from the capture pipeline.
    pub fn append_frames(&self, batch: FrameBatch) {
        self.lock().drafts.append_filled(batch.drafts);
    }

    /// Paste-a-URL path: fill the first blank slot in place.
    pub fn paste_frame_url(&self, url: impl Into<String>) -> DraftId {
        self.lock().drafts.fill_first_blank(url.into())
    }

    pub fn update_draft(&self, id: DraftId, patch: DraftPatch) {
        self.lock().drafts.update(id, patch);
    }

    pub fn remove_draft(&self, id: DraftId) {
        self.lock().drafts.remove(id);
    }

    pub fn add_blank_draft(&self) -> DraftId {
        self.lock().drafts.add_blank()
    }

    // -- history ------------------------------------------------------------

    /// Fetch the athlete's recent assessments, normalize each, and
    /// store them most-recent-first.  Returns the loaded count.
    pub async fn load_history(&self, limit: Option<u32>) -> Result<usize, SessionError> {
        let athlete_id = self.athlete_id();
        let raw = self.api.athlete_history(&athlete_id, limit).await?;

        let mut assessments: Vec<_> = raw.into_iter().map(normalize).collect();
        // Undated assessments sort last.
        assessments.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let count = assessments.len();
        tracing::info!(athlete_id = %athlete_id, count, "Assessment history loaded");
        self.lock().history = assessments;
        Ok(count)
    }

    // -- submission ---------------------------------------------------------

    /// Submit the current drafts for scoring.
    ///
    /// Validation failures surface before any network call and leave
    /// the drafts untouched, as does an API failure.  On success the
    /// normalized assessment is prepended to the history and the draft
    /// store resets; cue readout and risk forwarding then run
    /// best-effort.
    pub async fn submit(
        &self,
        drill_type: &str,
        context: SubmitContext,
    ) -> Result<MovementAssessment, SessionError> {
        let (athlete_id, frames) = {
            let state = self.lock();
            (state.athlete_id.clone(), state.drafts.submittable())
        };

        if athlete_id.trim().is_empty() {
            return Err(CoreError::Validation("No athlete selected".to_string()).into());
        }
        if frames.is_empty() {
            return Err(
                CoreError::Validation("At least one frame is required".to_string()).into(),
            );
        }

        let request = SubmitAssessmentRequest {
            athlete_id: athlete_id.clone(),
            drill_type: drill_type.to_string(),
            frames: frames.iter().map(FramePayload::from).collect(),
            context,
        };
        tracing::info!(
            athlete_id = %athlete_id,
            drill_type,
            frame_count = request.frames.len(),
            "Submitting assessment"
        );

        let raw = self.api.submit_assessment(&request).await?;
        let assessment = normalize(raw);

        {
            let mut state = self.lock();
            state.history.insert(0, assessment.clone());
            state.drafts.reset();
        }

        self.speech.speak(&assessment.cues);
        self.risk.forward_best_effort(&assessment).await;

        Ok(assessment)
    }

    // -- proof operations ---------------------------------------------------

    /// Toggle the recommended-fix assignment for one assessment.
    ///
    /// Optimistic with reconciliation: the target state is the negation
    /// of the current one, the PATCH carries only that target, and the
    /// merge applies the target as an override on top of whatever proof
    /// the server returns.  A same-kind operation already in flight for
    /// this assessment is rejected without a network call.
    pub async fn quick_assign(&self, id: AssessmentId) -> Result<(), SessionError> {
        let _guard = self.tracker.try_begin(id, ProofOp::Assign)?;

        let current = {
            let state = self.lock();
            let assessment = state
                .history
                .iter()
                .find(|a| a.id == id)
                .ok_or(SessionError::UnknownAssessment(id))?;
            assessment
                .proof
                .as_ref()
                .map(|p| p.fix_assigned)
                .unwrap_or(false)
        };
        let target = !current;
        tracing::info!(assessment_id = %id, target, "Toggling fix assignment");

        let fresh = self.api.patch_proof(id, &ProofPatch::assign(target)).await?;

        let mut state = self.lock();
        if let Some(assessment) = state.history.iter_mut().find(|a| a.id == id) {
            apply_proof_update(assessment, fresh, Some(target));
        }
        Ok(())
    }

    /// Log a micro-plan completion with its bounded RPE/pain inputs.
    pub async fn log_completion(
        &self,
        id: AssessmentId,
        input: CompletionInput,
    ) -> Result<(), SessionError> {
        input.check()?;
        let _guard = self.tracker.try_begin(id, ProofOp::Completion)?;
        self.expect_known(id)?;

        let fresh = self
            .api
            .patch_proof(id, &ProofPatch::complete(input.rpe, input.pain))
            .await?;

        let mut state = self.lock();
        if let Some(assessment) = state.history.iter_mut().find(|a| a.id == id) {
            match fresh {
                Some(raw) => apply_proof_update(assessment, Some(raw), None),
                None => record_completion(
                    assessment,
                    ProofCompletion {
                        completed: true,
                        rpe: Some(input.rpe),
                        pain: Some(input.pain),
                        completed_at: Some(Utc::now()),
                    },
                ),
            }
        }
        tracing::info!(assessment_id = %id, "Completion logged");
        Ok(())
    }

    /// Clear a previously logged completion, preserving the fix
    /// assignment.
    pub async fn clear_completion(&self, id: AssessmentId) -> Result<(), SessionError> {
        let _guard = self.tracker.try_begin(id, ProofOp::Completion)?;
        self.expect_known(id)?;

        let fresh = self
            .api
            .patch_proof(id, &ProofPatch::clear_completion())
            .await?;

        let mut state = self.lock();
        if let Some(assessment) = state.history.iter_mut().find(|a| a.id == id) {
            match fresh {
                Some(raw) => apply_proof_update(assessment, Some(raw), None),
                None => clear_proof_completion(assessment),
            }
        }
        tracing::info!(assessment_id = %id, "Completion cleared");
        Ok(())
    }

    // -- internals ----------------------------------------------------------

    fn expect_known(&self, id: AssessmentId) -> Result<(), SessionError> {
        if self.lock().history.iter().any(|a| a.id == id) {
            Ok(())
        } else {
            Err(SessionError::UnknownAssessment(id))
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
