//! The capture state machine.
//!
//! `Idle -> Previewing -> Recording -> Idle`, with an orthogonal
//! `processing` flag covering post-stop frame extraction and upload.
//! A cancel is signalled through a per-recording
//! [`CancellationToken`] captured *before* the underlying stop call and
//! consulted again wherever results are about to be used, so buffered
//! recorder data delivered after a cancel never reaches extraction or
//! upload.
//!
//! Uploads for one batch run strictly sequentially in extraction order:
//! labels are positional, and bounding in-flight bodies to one keeps
//! memory flat on low-end devices.  A failed upload abandons the whole
//! batch; no partial batch is ever emitted.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use formcheck_client::api::MediaStore;
use formcheck_core::frames::{batch_labels, numbered_labels, FrameDraft};

use crate::blob::{ImageBlob, VideoBlob};
use crate::error::CaptureError;
use crate::extract::{ExtractionError, FrameExtractor, DEFAULT_FRAME_COUNT};
use crate::hardware::{ActiveRecording, Camera, CameraStream, Recorder};

/// Default label hint for frames captured from the live camera.
pub const CAPTURED_FRAME_HINT: &str = "Captured frame";

/// Observable state of the capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Previewing,
    Recording,
}

impl CaptureState {
    pub fn name(self) -> &'static str {
        match self {
            CaptureState::Idle => "idle",
            CaptureState::Previewing => "previewing",
            CaptureState::Recording => "recording",
        }
    }
}

/// One batch of uploaded frame drafts, emitted after a commit stop or
/// an ingest call.  Appended to the draft store atomically.
#[derive(Debug, Clone)]
pub struct FrameBatch {
    pub drafts: Vec<FrameDraft>,
}

/// Bookkeeping for the recording in progress.
struct RecordingHandle {
    active: Box<dyn ActiveRecording>,
    cancel: CancellationToken,
}

/// Owns the camera/recording lifecycle and the extract-then-upload
/// pipeline.  The camera stream is exclusively owned here for the
/// duration of one capture session.
pub struct CaptureController {
    camera: Arc<dyn Camera>,
    recorder: Arc<dyn Recorder>,
    extractor: Arc<dyn FrameExtractor>,
    media: Arc<dyn MediaStore>,
    target_frame_count: usize,
    stream: Option<Box<dyn CameraStream>>,
    recording: Option<RecordingHandle>,
    processing: bool,
}

impl CaptureController {
    pub fn new(
        camera: Arc<dyn Camera>,
        recorder: Arc<dyn Recorder>,
        extractor: Arc<dyn FrameExtractor>,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        Self {
            camera,
            recorder,
            extractor,
            media,
            target_frame_count: DEFAULT_FRAME_COUNT,
            stream: None,
            recording: None,
            processing: false,
        }
    }

    /// Override the number of key frames extracted per clip.
    pub fn with_target_frame_count(mut self, count: usize) -> Self {
        self.target_frame_count = count;
        self
    }

    pub fn state(&self) -> CaptureState {
        if self.recording.is_some() {
            CaptureState::Recording
        } else if self.stream.is_some() {
            CaptureState::Previewing
        } else {
            CaptureState::Idle
        }
    }

    /// Whether post-stop extraction/upload is still running.
    pub fn is_processing(&self) -> bool {
        self.processing
    }

    // -- transitions --------------------------------------------------------

    /// `Idle -> Previewing`: acquire the camera and attach the preview.
    pub async fn start_preview(&mut self) -> Result<(), CaptureError> {
        self.expect_state(CaptureState::Idle, "idle")?;

        let stream = self.camera.acquire().await?;
        self.stream = Some(stream);
        tracing::info!("Camera preview started");
        Ok(())
    }

    /// `Previewing -> Recording`: start the recorder on the stream.
    ///
    /// On failure the stream is torn down and the controller returns to
    /// `Idle`, per the cleanup discipline.
    pub async fn start_recording(&mut self) -> Result<(), CaptureError> {
        self.expect_state(CaptureState::Previewing, "previewing")?;

        let stream = self.stream.as_mut().expect("previewing implies a stream");
        match self.recorder.start(stream.as_mut()).await {
            Ok(active) => {
                self.recording = Some(RecordingHandle {
                    active,
                    cancel: CancellationToken::new(),
                });
                tracing::info!("Recording started");
                Ok(())
            }
            Err(e) => {
                self.release_stream();
                Err(e)
            }
        }
    }

    /// Commit stop: assemble the clip, tear down the stream, extract
    /// key frames, and upload each sequentially.
    ///
    /// Returns `Ok(None)` when the recording was cancelled between the
    /// stop request and the recorder's stop completion.
    pub async fn stop_and_analyze(&mut self) -> Result<Option<FrameBatch>, CaptureError> {
        self.expect_state(CaptureState::Recording, "recording")?;

        let handle = self.recording.take().expect("recording implies a handle");
        // Captured before the stop call; the recorder may still deliver
        // buffered data afterwards.
        let cancel = handle.cancel.clone();

        let blob = handle.active.stop().await;
        // The stream is torn down regardless of what the stop produced.
        self.release_stream();

        if cancel.is_cancelled() {
            tracing::info!("Recording cancelled during stop; discarding buffered data");
            return Ok(None);
        }

        let blob = match blob {
            Some(blob) if !blob.is_empty() => blob,
            _ => {
                return Err(CaptureError::Extraction(ExtractionError::Undecodable(
                    "recorder produced no data".to_string(),
                )))
            }
        };

        match self.process_clip(blob, cancel, CAPTURED_FRAME_HINT).await {
            Ok(batch) => Ok(Some(batch)),
            Err(CaptureError::Cancelled) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Cancellation signal for the recording in progress, if any.
    ///
    /// Escape bindings and navigation-away handlers hold a clone of
    /// this token so they can cancel without exclusive access to the
    /// controller; the pipeline consults it at every point of use.
    pub fn cancel_handle(&self) -> Option<CancellationToken> {
        self.recording.as_ref().map(|h| h.cancel.clone())
    }

    /// Cancel the session from `Recording` or `Previewing`.
    ///
    /// Stops and releases the camera stream, discards any buffered
    /// recorder data, never invokes extraction or upload, and returns
    /// the controller to `Idle`.
    pub async fn cancel(&mut self) {
        if let Some(handle) = self.recording.take() {
            // Set the flag first: the stop callback below (and any
            // concurrently completing commit stop) checks it at the
            // point of use.
            handle.cancel.cancel();
            let discarded = handle.active.stop().await;
            if discarded.is_some() {
                tracing::debug!("Discarded buffered recorder data after cancel");
            }
        }
        self.release_stream();
        tracing::info!("Capture cancelled");
    }

    /// Single-key record/stop toggle.
    ///
    /// Binds onto the existing transitions: from `Idle` it acquires the
    /// camera and starts recording; from `Previewing` it starts
    /// recording; from `Recording` it performs a commit stop.
    pub async fn toggle_record(&mut self) -> Result<Option<FrameBatch>, CaptureError> {
        match self.state() {
            CaptureState::Idle => {
                self.start_preview().await?;
                self.start_recording().await?;
                Ok(None)
            }
            CaptureState::Previewing => {
                self.start_recording().await?;
                Ok(None)
            }
            CaptureState::Recording => self.stop_and_analyze().await,
        }
    }

    // -- alternate inputs ---------------------------------------------------

    /// Run a user-selected or dropped video file through the same
    /// extract-then-upload pipeline as a live recording.
    pub async fn ingest_video(&mut self, blob: VideoBlob) -> Result<FrameBatch, CaptureError> {
        self.process_clip(blob, CancellationToken::new(), CAPTURED_FRAME_HINT)
            .await
    }

    /// Upload dropped or pasted still images directly, skipping
    /// extraction.  Images are numbered from the hint rather than
    /// labeled with drill phases.
    pub async fn ingest_images(
        &mut self,
        images: Vec<ImageBlob>,
        hint: &str,
    ) -> Result<FrameBatch, CaptureError> {
        let labels = numbered_labels(images.len(), hint);
        self.processing = true;
        let result = self
            .upload_batch(images, labels, &CancellationToken::new())
            .await;
        self.processing = false;
        result
    }

    // -- pipeline -----------------------------------------------------------

    /// Extract key frames from a clip and upload them sequentially.
    async fn process_clip(
        &mut self,
        blob: VideoBlob,
        cancel: CancellationToken,
        hint: &str,
    ) -> Result<FrameBatch, CaptureError> {
        self.processing = true;
        let result = self.process_clip_inner(blob, cancel, hint).await;
        self.processing = false;
        result
    }

    async fn process_clip_inner(
        &mut self,
        blob: VideoBlob,
        cancel: CancellationToken,
        hint: &str,
    ) -> Result<FrameBatch, CaptureError> {
        if cancel.is_cancelled() {
            return Err(CaptureError::Cancelled);
        }

        let images = self
            .extractor
            .extract_frames(&blob, self.target_frame_count)
            .await?;

        let labels = batch_labels(images.len(), hint);
        self.upload_batch(images, labels, &cancel).await
    }

    /// Upload each image **sequentially**, preserving extraction order
    /// so positional labels stay correct under variable latency.
    async fn upload_batch(
        &mut self,
        images: Vec<ImageBlob>,
        labels: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<FrameBatch, CaptureError> {
        let mut drafts = Vec::with_capacity(images.len());

        for (index, image) in images.into_iter().enumerate() {
            // Checked at the point of use, not just at invocation.
            if cancel.is_cancelled() {
                return Err(CaptureError::Cancelled);
            }

            let filename = format!(
                "frame-{}-{index}.{}",
                uuid::Uuid::new_v4(),
                extension_for(&image.mimetype)
            );
            let mimetype = image.mimetype.clone();
            let media = self
                .media
                .upload(image.bytes, &filename, &mimetype)
                .await
                .map_err(CaptureError::Upload)?;

            drafts.push(FrameDraft::filled(media.url, Some(labels[index].clone())));
        }

        tracing::info!(frame_count = drafts.len(), "Frame batch uploaded");
        Ok(FrameBatch { drafts })
    }

    // -- internals ----------------------------------------------------------

    fn expect_state(
        &self,
        expected: CaptureState,
        expected_name: &'static str,
    ) -> Result<(), CaptureError> {
        let current = self.state();
        if current != expected {
            return Err(CaptureError::InvalidState {
                expected: expected_name,
                found: current.name(),
            });
        }
        Ok(())
    }

    /// Stop the stream's tracks and clear the preview, exactly once.
    fn release_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
        }
    }
}

/// File extension for an image mimetype; uploads default to JPEG.
fn extension_for(mimetype: &str) -> &'static str {
    match mimetype {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}
