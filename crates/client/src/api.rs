//! Collaborator trait seams and wire DTOs.
//!
//! The capture and session crates depend on these traits, never on the
//! concrete HTTP types, so every pipeline test can run against an
//! in-memory fake.  [`crate::http::HttpApi`] implements all of them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use formcheck_core::frames::FrameDraft;
use formcheck_core::normalize::{RawAssessment, RawProof};
use formcheck_core::risk::VideoRiskFeatures;
use formcheck_core::types::AssessmentId;

use crate::error::ApiError;

// ---------------------------------------------------------------------------
// Request shapes
// ---------------------------------------------------------------------------

/// A single frame as carried in a submission request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FramePayload {
    pub id: uuid::Uuid,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub captured_at: DateTime<Utc>,
}

impl From<&FrameDraft> for FramePayload {
    fn from(draft: &FrameDraft) -> Self {
        Self {
            id: draft.id,
            url: draft.url.clone(),
            label: draft.label.clone(),
            captured_at: draft.captured_at,
        }
    }
}

/// Optional environment context attached to a submission.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surface: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_f: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity_pct: Option<f64>,
}

/// Body of `POST /assessments`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAssessmentRequest {
    pub athlete_id: String,
    pub drill_type: String,
    pub frames: Vec<FramePayload>,
    pub context: SubmitContext,
}

/// Body of `PATCH /assessments/{id}/proof`.  All fields optional; only
/// the ones the operation changes are sent.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_assigned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpe: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pain: Option<f64>,
}

impl ProofPatch {
    /// Patch carrying only the quick-assign target state.
    pub fn assign(fix_assigned: bool) -> Self {
        Self {
            fix_assigned: Some(fix_assigned),
            ..Self::default()
        }
    }

    /// Patch logging a completion with its bounded inputs.
    pub fn complete(rpe: f64, pain: f64) -> Self {
        Self {
            completed: Some(true),
            rpe: Some(rpe),
            pain: Some(pain),
            ..Self::default()
        }
    }

    /// Patch clearing a previously logged completion.
    pub fn clear_completion() -> Self {
        Self {
            completed: Some(false),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

/// Response of `GET /assessments/athlete/{id}`.
#[derive(Debug, Deserialize)]
pub struct HistoryResponse {
    pub assessments: Vec<RawAssessment>,
}

/// Response of `PATCH /assessments/{id}/proof`.  The proof may be
/// absent, in which case the caller's optimistic target state stands.
#[derive(Debug, Default, Deserialize)]
pub struct ProofPatchResponse {
    pub proof: Option<RawProof>,
}

/// Response of `POST /media/upload`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedMedia {
    pub url: String,
    pub filename: String,
    pub mimetype: String,
    pub size: u64,
}

/// One row of the athlete directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AthleteSummary {
    pub id: String,
    pub display_name: String,
}

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// The external movement-assessment service.
#[async_trait]
pub trait AssessmentApi: Send + Sync {
    /// Submit frames for scoring.  Returns the raw (un-normalized)
    /// assessment; callers normalize exactly once.
    async fn submit_assessment(
        &self,
        request: &SubmitAssessmentRequest,
    ) -> Result<RawAssessment, ApiError>;

    /// Fetch recent assessments for one athlete.
    async fn athlete_history(
        &self,
        athlete_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<RawAssessment>, ApiError>;

    /// Update the proof record of one assessment.
    async fn patch_proof(
        &self,
        assessment_id: AssessmentId,
        patch: &ProofPatch,
    ) -> Result<Option<RawProof>, ApiError>;
}

/// Object storage for frame media.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload a single blob and return its stable URL.  Never retried
    /// here; retry policy belongs to the caller.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        mimetype: &str,
    ) -> Result<UploadedMedia, ApiError>;
}

/// The external risk-scoring engine's feature intake.
#[async_trait]
pub trait RiskSink: Send + Sync {
    async fn forward_video_features(
        &self,
        athlete_id: &str,
        features: &VideoRiskFeatures,
    ) -> Result<(), ApiError>;
}

/// Read-only athlete roster used by the selection UI.
#[async_trait]
pub trait AthleteDirectory: Send + Sync {
    async fn list_athletes(&self) -> Result<Vec<AthleteSummary>, ApiError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
