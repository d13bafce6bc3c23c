/// Identifier for a server-side assessment row (UUID v7 on the server).
pub type AssessmentId = uuid::Uuid;

/// Identifier for a client-generated frame draft.
pub type DraftId = uuid::Uuid;
