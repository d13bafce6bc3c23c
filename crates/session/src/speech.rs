//! Cue readout seam.

/// Reads coaching cues aloud after a submission.  Strictly best-effort;
/// implementations must never block or fail the caller.
pub trait SpeechSynth: Send + Sync {
    fn speak(&self, cues: &[String]);
}

/// Default implementation for platforms without speech output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSpeech;

impl SpeechSynth for NoopSpeech {
    fn speak(&self, _cues: &[String]) {}
}
