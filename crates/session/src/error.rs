use formcheck_client::error::ApiError;
use formcheck_core::error::CoreError;
use formcheck_core::types::AssessmentId;

use crate::proof_tracker::ProofOp;

/// Errors from the session controller.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// A proof operation of the same kind is already outstanding for
    /// this assessment; the request was dropped without a network call.
    #[error("A {op} update is already in flight for assessment {id}")]
    OperationInFlight { id: AssessmentId, op: ProofOp },

    /// The assessment id is not present in the loaded history.
    #[error("Assessment {0} is not in the loaded history")]
    UnknownAssessment(AssessmentId),
}
