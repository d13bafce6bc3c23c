//! HTTP implementation of the collaborator traits.
//!
//! One [`HttpApi`] talks to the whole FormCheck backend: assessments,
//! media upload, risk feature intake, and the athlete directory share a
//! base URL, a pooled [`reqwest::Client`], and an injected credentials
//! provider.

use std::sync::Arc;

use async_trait::async_trait;

use formcheck_core::normalize::{RawAssessment, RawProof};
use formcheck_core::risk::VideoRiskFeatures;
use formcheck_core::types::AssessmentId;

use crate::api::{
    AssessmentApi, AthleteDirectory, AthleteSummary, HistoryResponse, MediaStore, ProofPatch,
    ProofPatchResponse, RiskSink, SubmitAssessmentRequest, UploadedMedia,
};
use crate::config::ClientConfig;
use crate::credentials::CredentialsProvider;
use crate::error::ApiError;

/// HTTP client for the FormCheck backend.
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialsProvider>,
}

impl HttpApi {
    /// Build a client from configuration and a credentials provider.
    pub fn new(
        config: &ClientConfig,
        credentials: Arc<dyn CredentialsProvider>,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Reuse an existing [`reqwest::Client`] (connection pooling when
    /// the application holds several API handles).
    pub fn with_client(
        client: reqwest::Client,
        base_url: String,
        credentials: Arc<dyn CredentialsProvider>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the current bearer token, read per request so rotation
    /// takes effect immediately.
    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.credentials.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code.  Returns the
    /// response unchanged on success, or an [`ApiError::Api`] with the
    /// status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl AssessmentApi for HttpApi {
    async fn submit_assessment(
        &self,
        request: &SubmitAssessmentRequest,
    ) -> Result<RawAssessment, ApiError> {
        let response = self
            .authorize(self.client.post(self.url("/assessments")))
            .json(request)
            .send()
            .await?;

        let raw = Self::parse_response::<RawAssessment>(response).await?;
        tracing::info!(
            athlete_id = %request.athlete_id,
            drill_type = %request.drill_type,
            frame_count = request.frames.len(),
            "Assessment submitted",
        );
        Ok(raw)
    }

    async fn athlete_history(
        &self,
        athlete_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<RawAssessment>, ApiError> {
        let mut builder = self
            .client
            .get(self.url(&format!("/assessments/athlete/{athlete_id}")));
        if let Some(limit) = limit {
            builder = builder.query(&[("limit", limit)]);
        }

        let response = self.authorize(builder).send().await?;
        let history = Self::parse_response::<HistoryResponse>(response).await?;
        Ok(history.assessments)
    }

    async fn patch_proof(
        &self,
        assessment_id: AssessmentId,
        patch: &ProofPatch,
    ) -> Result<Option<RawProof>, ApiError> {
        let response = self
            .authorize(
                self.client
                    .patch(self.url(&format!("/assessments/{assessment_id}/proof"))),
            )
            .json(patch)
            .send()
            .await?;

        let parsed = Self::parse_response::<ProofPatchResponse>(response).await?;
        Ok(parsed.proof)
    }
}

#[async_trait]
impl MediaStore for HttpApi {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        mimetype: &str,
    ) -> Result<UploadedMedia, ApiError> {
        let size = bytes.len();
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mimetype)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .authorize(self.client.post(self.url("/media/upload")))
            .multipart(form)
            .send()
            .await?;

        let media = Self::parse_response::<UploadedMedia>(response).await?;
        tracing::debug!(filename, size, url = %media.url, "Media uploaded");
        Ok(media)
    }
}

#[async_trait]
impl RiskSink for HttpApi {
    async fn forward_video_features(
        &self,
        athlete_id: &str,
        features: &VideoRiskFeatures,
    ) -> Result<(), ApiError> {
        let body = serde_json::json!({
            "athleteId": athlete_id,
            "features": features,
        });

        let response = self
            .authorize(self.client.post(self.url("/risk/features/video")))
            .json(&body)
            .send()
            .await?;

        Self::check_status(response).await
    }
}

#[async_trait]
impl AthleteDirectory for HttpApi {
    async fn list_athletes(&self) -> Result<Vec<AthleteSummary>, ApiError> {
        let response = self.authorize(self.client.get(self.url("/athletes"))).send().await?;
        Self::parse_response(response).await
    }
}
