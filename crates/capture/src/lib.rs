//! Capture pipeline: camera lifecycle, recording, key-frame
//! extraction, and race-safe frame upload.
//!
//! [`controller::CaptureController`] owns the state machine
//! (`Idle -> Previewing -> Recording -> Idle` with an orthogonal
//! processing flag).  Hardware sits behind the [`hardware`] trait
//! seams; key-frame extraction behind [`extract::FrameExtractor`],
//! with an ffmpeg/ffprobe subprocess implementation.

pub mod blob;
pub mod controller;
pub mod error;
pub mod extract;
pub mod hardware;
