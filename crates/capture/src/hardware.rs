//! Trait seams over the capture hardware.
//!
//! The camera stream and any preview surface are exclusively owned by
//! the [`CaptureController`](crate::controller::CaptureController) for
//! the duration of one capture session; nothing else reads or mutates
//! them.  Platform integrations implement these traits; tests use
//! in-memory fakes.

use async_trait::async_trait;

use crate::blob::VideoBlob;
use crate::error::CaptureError;

/// A camera device that can hand out live streams.
#[async_trait]
pub trait Camera: Send + Sync {
    /// Acquire a live stream, prompting for permission if needed.
    ///
    /// Fails with [`CaptureError::CameraAccess`] when permission is
    /// denied or no camera exists.
    async fn acquire(&self) -> Result<Box<dyn CameraStream>, CaptureError>;
}

/// An acquired live camera stream attached to a preview surface.
///
/// Every acquisition must be balanced by exactly one [`release`]
/// (stop the tracks, clear the preview source), on success paths and
/// failure paths alike.
///
/// [`release`]: CameraStream::release
pub trait CameraStream: Send {
    fn release(&mut self);
}

/// A recording backend for a live stream.
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Start recording against the active stream.
    ///
    /// Fails with [`CaptureError::RecorderStart`] when the platform
    /// lacks recording support for the stream's format.
    async fn start(
        &self,
        stream: &mut dyn CameraStream,
    ) -> Result<Box<dyn ActiveRecording>, CaptureError>;
}

/// An in-progress recording.
#[async_trait]
pub trait ActiveRecording: Send {
    /// Stop and assemble the buffered chunks into one clip.
    ///
    /// May legitimately return `None` when the recorder produced no
    /// data.  Note that a recorder can still deliver buffered data
    /// after a cancel; the controller decides whether to use it.
    async fn stop(self: Box<Self>) -> Option<VideoBlob>;
}
