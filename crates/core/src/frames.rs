//! Frame drafts and the slot-filling draft store.
//!
//! A frame draft is a not-yet-submitted candidate still image (url,
//! optional label, capture timestamp).  The store keeps an ordered list
//! of drafts with one invariant: after any append there is exactly one
//! trailing blank slot available for manual URL entry, unless the user
//! has explicitly added extra blank rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::DraftId;

/// Default positional labels for key frames extracted from one clip.
pub const KEY_FRAME_LABELS: &[&str] = &["Landing", "Plant", "Push-off"];

/// A not-yet-submitted candidate key frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameDraft {
    pub id: DraftId,
    pub url: String,
    pub label: Option<String>,
    pub captured_at: DateTime<Utc>,
}

impl FrameDraft {
    /// A blank slot awaiting an upload or a pasted URL.
    pub fn blank() -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            url: String::new(),
            label: None,
            captured_at: Utc::now(),
        }
    }

    /// A filled draft for a completed upload.
    pub fn filled(url: String, label: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            url,
            label,
            captured_at: Utc::now(),
        }
    }

    /// A draft is blank until it has a non-empty URL.
    pub fn is_blank(&self) -> bool {
        self.url.trim().is_empty()
    }
}

/// Partial update for a single draft.
#[derive(Debug, Clone, Default)]
pub struct DraftPatch {
    pub url: Option<String>,
    pub label: Option<String>,
}

/// Compute labels for a batch of `count` frames appended together.
///
/// - One frame gets the caller-supplied hint verbatim.
/// - Multiple frames get the positional key-frame labels, falling back
///   to `"<hint> {i+1}"` past the end of the fixed list.
pub fn batch_labels(count: usize, hint: &str) -> Vec<String> {
    if count == 1 {
        return vec![hint.to_string()];
    }
    (0..count)
        .map(|i| match KEY_FRAME_LABELS.get(i) {
            Some(label) => (*label).to_string(),
            None => format!("{hint} {}", i + 1),
        })
        .collect()
}

/// Compute labels for a batch of still images (no drill phases).
///
/// One image gets the hint verbatim; multiple get `"<hint> {i+1}"`.
pub fn numbered_labels(count: usize, hint: &str) -> Vec<String> {
    if count == 1 {
        return vec![hint.to_string()];
    }
    (0..count).map(|i| format!("{hint} {}", i + 1)).collect()
}

/// Ordered collection of frame drafts with slot-filling semantics.
///
/// Owned exclusively by the capture session; resets to a single blank
/// slot after a successful submission.
#[derive(Debug, Clone)]
pub struct FrameDraftStore {
    drafts: Vec<FrameDraft>,
}

impl Default for FrameDraftStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDraftStore {
    /// A fresh store holding a single blank slot.
    pub fn new() -> Self {
        Self {
            drafts: vec![FrameDraft::blank()],
        }
    }

    pub fn drafts(&self) -> &[FrameDraft] {
        &self.drafts
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    /// Drafts eligible for submission (non-empty URL), cloned.
    pub fn submittable(&self) -> Vec<FrameDraft> {
        self.drafts
            .iter()
            .filter(|d| !d.is_blank())
            .cloned()
            .collect()
    }

    /// Append a batch of filled drafts.
    ///
    /// Each incoming draft fills the first existing blank slot in place
    /// (keeping that slot's position) before new slots are created, and
    /// a trailing blank slot is restored afterwards.
    pub fn append_filled(&mut self, frames: Vec<FrameDraft>) {
        for frame in frames {
            match self.drafts.iter_mut().find(|d| d.is_blank()) {
                Some(slot) => {
                    slot.url = frame.url;
                    slot.label = frame.label;
                    slot.captured_at = frame.captured_at;
                }
                None => self.drafts.push(frame),
            }
        }
        self.ensure_trailing_blank();
    }

    /// Fill the first blank slot with a pasted URL.
    ///
    /// Only appends a new slot when no blank slot exists.  Returns the
    /// id of the draft that received the URL.
    pub fn fill_first_blank(&mut self, url: String) -> DraftId {
        if let Some(slot) = self.drafts.iter_mut().find(|d| d.is_blank()) {
            slot.url = url;
            slot.captured_at = Utc::now();
            let id = slot.id;
            self.ensure_trailing_blank();
            return id;
        }
        let draft = FrameDraft::filled(url, None);
        let id = draft.id;
        self.drafts.push(draft);
        self.ensure_trailing_blank();
        id
    }

    /// Apply a partial update to the draft with the given id.
    ///
    /// Unknown ids are ignored; the UI may race a removal.
    pub fn update(&mut self, id: DraftId, patch: DraftPatch) {
        if let Some(draft) = self.drafts.iter_mut().find(|d| d.id == id) {
            if let Some(url) = patch.url {
                draft.url = url;
            }
            if let Some(label) = patch.label {
                draft.label = Some(label);
            }
        }
    }

    /// Remove the draft with the given id, keeping one blank available.
    pub fn remove(&mut self, id: DraftId) {
        self.drafts.retain(|d| d.id != id);
        if self.drafts.is_empty() || !self.drafts.iter().any(|d| d.is_blank()) {
            self.drafts.push(FrameDraft::blank());
        }
    }

    /// Explicitly add an extra blank row ("add frame" action).
    pub fn add_blank(&mut self) -> DraftId {
        let draft = FrameDraft::blank();
        let id = draft.id;
        self.drafts.push(draft);
        id
    }

    /// Discard everything and return to a single blank slot.
    pub fn reset(&mut self) {
        self.drafts = vec![FrameDraft::blank()];
    }

    /// Push a blank slot if the list does not already end in one.
    fn ensure_trailing_blank(&mut self) {
        let trailing_blank = self.drafts.last().map(|d| d.is_blank()).unwrap_or(false);
        if !trailing_blank {
            self.drafts.push(FrameDraft::blank());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
