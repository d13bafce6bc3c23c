use formcheck_client::error::ApiError;

use crate::extract::ExtractionError;

/// Errors from the capture pipeline.
///
/// Each variant is caught at the controller boundary and surfaced as a
/// single user-facing message; the controller always returns to a
/// consistent state (stream released, processing flag cleared).
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// Camera permission denied or no camera present.
    #[error("Camera unavailable: {0}")]
    CameraAccess(String),

    /// The platform cannot record from the active stream.
    #[error("Recorder failed to start: {0}")]
    RecorderStart(String),

    /// Key-frame extraction failed; no frames were appended.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// A frame upload failed; the whole batch is abandoned.
    #[error("Frame upload failed: {0}")]
    Upload(#[source] ApiError),

    /// The recording was cancelled; buffered data was discarded and
    /// nothing reached extraction or upload.
    #[error("Capture cancelled")]
    Cancelled,

    /// An operation was requested in the wrong state.
    #[error("Invalid capture state: expected {expected}, found {found}")]
    InvalidState {
        expected: &'static str,
        found: &'static str,
    },
}
