/// Errors from the pure domain layer.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Input rejected before any network call.
    #[error("Validation failed: {0}")]
    Validation(String),
}
