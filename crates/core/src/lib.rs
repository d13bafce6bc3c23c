//! Domain model for the FormCheck movement-assessment pipeline.
//!
//! Pure types and functions shared by the capture, client, and session
//! crates: frame drafts with slot-filling semantics, the canonical
//! [`MovementAssessment`](assessment::MovementAssessment) shape and its
//! total normalizer, the proof merge algorithm, and the risk feature
//! projection.  No I/O lives here.

pub mod assessment;
pub mod error;
pub mod frames;
pub mod normalize;
pub mod proof;
pub mod risk;
pub mod types;
