//! Page-level session controller.
//!
//! One [`Session`](session::Session) per open assessment page: it owns
//! the selected athlete, the frame draft store, and the in-memory
//! assessment history, and drives submission, history loading, and the
//! race-guarded proof operations against the collaborator traits from
//! `formcheck-client`.

pub mod error;
pub mod proof_tracker;
pub mod risk_forward;
pub mod session;
pub mod speech;
