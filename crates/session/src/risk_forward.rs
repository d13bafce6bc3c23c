//! Best-effort delivery of risk features after a submission.

use std::sync::Arc;

use formcheck_client::api::RiskSink;
use formcheck_core::assessment::MovementAssessment;
use formcheck_core::risk::VideoRiskFeatures;

/// Forwards the video-derived feature projection to the risk engine.
///
/// Delivery is at-most-once and strictly best-effort: a failed or
/// rejected forward is logged and swallowed, and never affects the
/// submission that triggered it.
pub struct RiskFeatureForwarder {
    sink: Arc<dyn RiskSink>,
}

impl RiskFeatureForwarder {
    pub fn new(sink: Arc<dyn RiskSink>) -> Self {
        Self { sink }
    }

    pub async fn forward_best_effort(&self, assessment: &MovementAssessment) {
        let features = VideoRiskFeatures::from_assessment(assessment);
        match self
            .sink
            .forward_video_features(&assessment.athlete_id, &features)
            .await
        {
            Ok(()) => {
                tracing::debug!(
                    assessment_id = %assessment.id,
                    "Risk features forwarded"
                );
            }
            Err(e) => {
                tracing::warn!(
                    assessment_id = %assessment.id,
                    network = e.is_network(),
                    error = %e,
                    "Risk feature forward failed; continuing"
                );
            }
        }
    }
}
