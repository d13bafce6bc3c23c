//! HTTP clients for the FormCheck external collaborators.
//!
//! Wraps the assessment API, media upload API, risk feature API, and
//! athlete directory using [`reqwest`].  Each collaborator sits behind
//! an `async_trait` seam ([`api::AssessmentApi`], [`api::MediaStore`],
//! [`api::RiskSink`], [`api::AthleteDirectory`]) so the capture and
//! session crates can be driven by in-memory fakes in tests.
//!
//! Credentials are injected via [`credentials::CredentialsProvider`];
//! there is no module-level token state.

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
