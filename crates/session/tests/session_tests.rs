//! Integration tests for the session controller.
//!
//! Runs [`Session`] against in-memory fakes for the assessment API,
//! the risk sink, and speech output, covering submission, history
//! loading, and the race-guarded proof operations.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;

use formcheck_client::api::{
    AssessmentApi, ProofPatch, RiskSink, SubmitAssessmentRequest, SubmitContext,
};
use formcheck_client::error::ApiError;
use formcheck_core::error::CoreError;
use formcheck_core::normalize::{RawAssessment, RawProof};
use formcheck_core::proof::CompletionInput;
use formcheck_core::risk::VideoRiskFeatures;
use formcheck_core::types::AssessmentId;
use formcheck_session::error::SessionError;
use formcheck_session::proof_tracker::ProofOp;
use formcheck_session::session::Session;
use formcheck_session::speech::{NoopSpeech, SpeechSynth};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

fn raw(json: serde_json::Value) -> RawAssessment {
    serde_json::from_value(json).unwrap()
}

#[derive(Default)]
struct FakeApi {
    submit_calls: AtomicUsize,
    patch_calls: AtomicUsize,
    last_submit: Mutex<Option<SubmitAssessmentRequest>>,
    last_patch: Mutex<Option<ProofPatch>>,
    history: Mutex<Vec<RawAssessment>>,
    submit_response: Mutex<Option<RawAssessment>>,
    patch_response: Mutex<Option<RawProof>>,
    fail_submit: bool,
    fail_patch: bool,
    patch_latency: Option<Duration>,
}

impl FakeApi {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn with_history(history: Vec<RawAssessment>) -> Arc<Self> {
        let api = Self::default();
        *api.history.lock().unwrap() = history;
        Arc::new(api)
    }

    fn failing_submit() -> Arc<Self> {
        Arc::new(Self {
            fail_submit: true,
            ..Self::default()
        })
    }

    fn set_submit_response(&self, assessment: RawAssessment) {
        *self.submit_response.lock().unwrap() = Some(assessment);
    }

    fn set_patch_response(&self, proof: RawProof) {
        *self.patch_response.lock().unwrap() = Some(proof);
    }

    fn server_error() -> ApiError {
        ApiError::Api {
            status: 500,
            body: "server error".to_string(),
        }
    }
}

#[async_trait]
impl AssessmentApi for FakeApi {
    async fn submit_assessment(
        &self,
        request: &SubmitAssessmentRequest,
    ) -> Result<RawAssessment, ApiError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_submit.lock().unwrap() = Some(request.clone());
        if self.fail_submit {
            return Err(Self::server_error());
        }
        Ok(self
            .submit_response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_default())
    }

    async fn athlete_history(
        &self,
        _athlete_id: &str,
        _limit: Option<u32>,
    ) -> Result<Vec<RawAssessment>, ApiError> {
        Ok(self.history.lock().unwrap().clone())
    }

    async fn patch_proof(
        &self,
        _assessment_id: AssessmentId,
        patch: &ProofPatch,
    ) -> Result<Option<RawProof>, ApiError> {
        self.patch_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_patch.lock().unwrap() = Some(patch.clone());
        if let Some(latency) = self.patch_latency {
            tokio::time::sleep(latency).await;
        }
        if self.fail_patch {
            return Err(Self::server_error());
        }
        Ok(self.patch_response.lock().unwrap().clone())
    }
}

#[derive(Default)]
struct FakeRiskSink {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl RiskSink for FakeRiskSink {
    async fn forward_video_features(
        &self,
        _athlete_id: &str,
        _features: &VideoRiskFeatures,
    ) -> Result<(), ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(FakeApi::server_error());
        }
        Ok(())
    }
}

#[derive(Default)]
struct RecordingSpeech {
    spoken: Mutex<Vec<Vec<String>>>,
}

impl SpeechSynth for RecordingSpeech {
    fn speak(&self, cues: &[String]) {
        self.spoken.lock().unwrap().push(cues.to_vec());
    }
}

fn session(api: Arc<FakeApi>) -> Session {
    Session::new("athlete-1", api, Arc::new(FakeRiskSink::default()), Arc::new(NoopSpeech))
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[tokio::test]
async fn load_history_normalizes_and_sorts_most_recent_first() {
    let api = FakeApi::with_history(vec![
        raw(serde_json::json!({
            "id": uuid::Uuid::new_v4(),
            "createdAt": "2026-08-01T10:00:00Z",
            "drillType": "drop_jump",
        })),
        raw(serde_json::json!({
            "id": uuid::Uuid::new_v4(),
            // Undated rows sort last.
        })),
        raw(serde_json::json!({
            "id": uuid::Uuid::new_v4(),
            "createdAt": "2026-08-20T10:00:00Z",
            "drillType": "cutting",
        })),
    ]);
    let session = session(api);

    let count = session.load_history(Some(20)).await.unwrap();
    assert_eq!(count, 3);

    let history = session.history();
    assert_eq!(history[0].drill_type, "cutting");
    assert_eq!(history[1].drill_type, "drop_jump");
    assert!(history[2].created_at.is_none());
    // Normalization totalized the optional collections.
    assert!(history[2].cues.is_empty());
    assert!(history[2].frames.is_empty());
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_happy_path_updates_history_and_resets_drafts() {
    let api = FakeApi::new();
    api.set_submit_response(raw(serde_json::json!({
        "id": uuid::Uuid::new_v4(),
        "athleteId": "athlete-1",
        "drillType": "drop_jump",
        "cues": ["Soft knees", "Chest up"],
    })));
    let risk = Arc::new(FakeRiskSink::default());
    let speech = Arc::new(RecordingSpeech::default());
    let session = Session::new("athlete-1", api.clone(), risk.clone(), speech.clone());

    session.paste_frame_url("https://x/f1.jpg");
    session.paste_frame_url("https://x/f2.jpg");

    let assessment = session.submit("drop_jump", SubmitContext::default()).await.unwrap();
    assert_eq!(assessment.cues, ["Soft knees", "Chest up"]);

    // Only the submittable drafts went on the wire.
    let request = api.last_submit.lock().unwrap().clone().unwrap();
    assert_eq!(request.athlete_id, "athlete-1");
    assert_eq!(request.frames.len(), 2);
    assert_eq!(request.frames[0].url, "https://x/f1.jpg");

    // History prepends, drafts reset to one blank slot.
    assert_eq!(session.history().len(), 1);
    let drafts = session.drafts();
    assert_eq!(drafts.len(), 1);
    assert!(drafts[0].is_blank());

    // Best-effort collaborators each ran once.
    assert_eq!(risk.calls.load(Ordering::SeqCst), 1);
    assert_eq!(speech.spoken.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn submit_without_frames_is_blocked_before_any_network_call() {
    let api = FakeApi::new();
    let session = session(api.clone());

    let err = session.submit("drop_jump", SubmitContext::default()).await.unwrap_err();
    assert_matches!(err, SessionError::Core(CoreError::Validation(_)));
    assert_eq!(api.submit_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn submit_without_athlete_is_blocked() {
    let api = FakeApi::new();
    let session = session(api.clone());
    session.switch_athlete("");
    session.paste_frame_url("https://x/f1.jpg");

    let err = session.submit("drop_jump", SubmitContext::default()).await.unwrap_err();
    assert_matches!(err, SessionError::Core(CoreError::Validation(_)));
    assert_eq!(api.submit_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn submit_failure_leaves_drafts_untouched() {
    let api = FakeApi::failing_submit();
    let session = session(api.clone());
    session.paste_frame_url("https://x/f1.jpg");
    let before = session.drafts();

    let err = session.submit("drop_jump", SubmitContext::default()).await.unwrap_err();
    assert_matches!(err, SessionError::Api(ApiError::Api { status: 500, .. }));
    assert_eq!(session.drafts(), before);
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn risk_forward_failure_does_not_fail_the_submission() {
    let api = FakeApi::new();
    api.set_submit_response(raw(serde_json::json!({ "id": uuid::Uuid::new_v4() })));
    let risk = Arc::new(FakeRiskSink {
        fail: true,
        ..FakeRiskSink::default()
    });
    let session = Session::new("athlete-1", api, risk.clone(), Arc::new(NoopSpeech));
    session.paste_frame_url("https://x/f1.jpg");

    assert!(session.submit("drop_jump", SubmitContext::default()).await.is_ok());
    assert_eq!(risk.calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.history().len(), 1);
}

// ---------------------------------------------------------------------------
// Quick assign
// ---------------------------------------------------------------------------

fn seeded_session(api: Arc<FakeApi>, id: AssessmentId) -> Session {
    *api.history.lock().unwrap() = vec![raw(serde_json::json!({
        "id": id,
        "athleteId": "athlete-1",
        "microPlan": { "drills": [{ "name": "Step-down" }] },
        "proof": { "fixAssigned": false },
    }))];
    session(api)
}

#[tokio::test]
async fn quick_assign_toggles_and_recomputes_availability() {
    let api = FakeApi::new();
    let id = uuid::Uuid::new_v4();
    let session = seeded_session(api.clone(), id);
    session.load_history(None).await.unwrap();

    session.quick_assign(id).await.unwrap();
    let a = session.assessment(id).unwrap();
    assert!(a.proof.as_ref().unwrap().fix_assigned);
    assert!(!a.micro_plan.as_ref().unwrap().quick_assign_available);
    let patch = api.last_patch.lock().unwrap().clone().unwrap();
    assert_eq!(patch.fix_assigned, Some(true));

    // Second toggle flips back and re-opens quick assign.
    session.quick_assign(id).await.unwrap();
    let a = session.assessment(id).unwrap();
    assert!(!a.proof.as_ref().unwrap().fix_assigned);
    assert!(a.micro_plan.as_ref().unwrap().quick_assign_available);
}

#[tokio::test]
async fn quick_assign_override_wins_over_stale_server_proof() {
    let api = FakeApi::new();
    let id = uuid::Uuid::new_v4();
    let session = seeded_session(api.clone(), id);
    session.load_history(None).await.unwrap();

    // Server echoes the old state; the optimistic target must win.
    api.set_patch_response(serde_json::from_value(serde_json::json!({
        "fixAssigned": false,
        "band": "amber",
    })).unwrap());

    session.quick_assign(id).await.unwrap();
    let a = session.assessment(id).unwrap();
    assert!(a.proof.as_ref().unwrap().fix_assigned);
    assert_eq!(a.band_summary.as_deref(), Some("amber"));
}

#[tokio::test(start_paused = true)]
async fn concurrent_quick_assigns_issue_exactly_one_network_call() {
    let api = Arc::new(FakeApi {
        patch_latency: Some(Duration::from_millis(200)),
        ..FakeApi::default()
    });
    let id = uuid::Uuid::new_v4();
    let session = Arc::new(seeded_session(api.clone(), id));
    session.load_history(None).await.unwrap();

    let first = tokio::spawn({
        let session = session.clone();
        async move { session.quick_assign(id).await }
    });
    // Let the first call claim its slot and park in the fake latency.
    tokio::task::yield_now().await;

    let err = session.quick_assign(id).await.unwrap_err();
    assert_matches!(err, SessionError::OperationInFlight { op: ProofOp::Assign, .. });

    first.await.unwrap().unwrap();
    assert_eq!(api.patch_calls.load(Ordering::SeqCst), 1);

    // The slot is free again once the first call lands.
    session.quick_assign(id).await.unwrap();
    assert_eq!(api.patch_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn quick_assign_unknown_assessment_makes_no_network_call() {
    let api = FakeApi::new();
    let session = session(api.clone());

    let err = session.quick_assign(uuid::Uuid::new_v4()).await.unwrap_err();
    assert_matches!(err, SessionError::UnknownAssessment(_));
    assert_eq!(api.patch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn quick_assign_failure_leaves_state_unchanged_and_releases_slot() {
    let api = Arc::new(FakeApi {
        fail_patch: true,
        ..FakeApi::default()
    });
    let id = uuid::Uuid::new_v4();
    let session = seeded_session(api.clone(), id);
    session.load_history(None).await.unwrap();
    let before = session.assessment(id).unwrap();

    let err = session.quick_assign(id).await.unwrap_err();
    assert_matches!(err, SessionError::Api(_));
    assert_eq!(session.assessment(id).unwrap(), before);

    // The failed attempt released its guard; the retry reaches the API.
    let _ = session.quick_assign(id).await;
    assert_eq!(api.patch_calls.load(Ordering::SeqCst), 2);
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn out_of_range_rpe_is_rejected_before_any_patch() {
    let api = FakeApi::new();
    let id = uuid::Uuid::new_v4();
    let session = seeded_session(api.clone(), id);
    session.load_history(None).await.unwrap();

    let err = session
        .log_completion(id, CompletionInput { rpe: 11.0, pain: 2.0 })
        .await
        .unwrap_err();
    assert_matches!(err, SessionError::Core(CoreError::Validation(_)));
    assert_eq!(api.patch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn log_completion_records_optimistically_without_a_proof_body() {
    let api = FakeApi::new();
    let id = uuid::Uuid::new_v4();
    let session = seeded_session(api.clone(), id);
    session.load_history(None).await.unwrap();

    session
        .log_completion(id, CompletionInput { rpe: 6.0, pain: 1.0 })
        .await
        .unwrap();

    let a = session.assessment(id).unwrap();
    let completion = a.proof.as_ref().unwrap().completion.as_ref().unwrap();
    assert!(completion.completed);
    assert_eq!(completion.rpe, Some(6.0));
    assert_eq!(completion.pain, Some(1.0));
    assert!(!a.micro_plan.as_ref().unwrap().quick_assign_available);

    let patch = api.last_patch.lock().unwrap().clone().unwrap();
    assert_eq!(patch.completed, Some(true));
    assert_eq!(patch.rpe, Some(6.0));
}

#[tokio::test]
async fn clear_completion_preserves_fix_assignment() {
    let api = FakeApi::new();
    let id = uuid::Uuid::new_v4();
    *api.history.lock().unwrap() = vec![raw(serde_json::json!({
        "id": id,
        "microPlan": { "drills": [] },
        "proof": {
            "fixAssigned": true,
            "completion": { "completed": true, "rpe": 7.0 },
        },
    }))];
    let session = session(api.clone());
    session.load_history(None).await.unwrap();

    session.clear_completion(id).await.unwrap();

    let a = session.assessment(id).unwrap();
    let proof = a.proof.as_ref().unwrap();
    assert!(proof.fix_assigned);
    assert!(proof.completion.is_none());
    assert!(a.micro_plan.as_ref().unwrap().completion.is_none());

    let patch = api.last_patch.lock().unwrap().clone().unwrap();
    assert_eq!(patch.completed, Some(false));
    assert_eq!(patch.rpe, None);
}

#[tokio::test]
async fn assign_does_not_block_completion_for_the_same_assessment() {
    let api = Arc::new(FakeApi {
        patch_latency: Some(Duration::from_millis(200)),
        ..FakeApi::default()
    });
    let id = uuid::Uuid::new_v4();
    let session = Arc::new(seeded_session(api.clone(), id));
    session.load_history(None).await.unwrap();

    let assign = tokio::spawn({
        let session = session.clone();
        async move { session.quick_assign(id).await }
    });
    tokio::task::yield_now().await;

    session
        .log_completion(id, CompletionInput { rpe: 5.0, pain: 0.0 })
        .await
        .unwrap();
    assign.await.unwrap().unwrap();
    assert_eq!(api.patch_calls.load(Ordering::SeqCst), 2);
}

// ---------------------------------------------------------------------------
// Athlete switching
// ---------------------------------------------------------------------------

#[tokio::test]
async fn switch_athlete_drops_history_and_drafts() {
    let api = FakeApi::with_history(vec![raw(serde_json::json!({
        "id": uuid::Uuid::new_v4(),
    }))]);
    let session = session(api);
    session.load_history(None).await.unwrap();
    session.paste_frame_url("https://x/f1.jpg");

    session.switch_athlete("athlete-2");

    assert_eq!(session.athlete_id(), "athlete-2");
    assert!(session.history().is_empty());
    let drafts = session.drafts();
    assert_eq!(drafts.len(), 1);
    assert!(drafts[0].is_blank());
}
