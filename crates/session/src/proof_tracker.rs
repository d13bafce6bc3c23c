//! Per-assessment in-flight guards for proof operations.
//!
//! Proof PATCHes are optimistic: the UI flips state immediately and
//! reconciles with the server response.  A second tap of the same
//! button while a request is outstanding must not issue a second PATCH,
//! or the two responses race and the later (staler) one wins.  The
//! tracker hands out at most one guard per `(assessment, operation)`
//! pair; the guard releases its slot on drop, on success and failure
//! paths alike.  Operations on different assessments, or an assign and
//! a completion on the same assessment, proceed concurrently.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use formcheck_core::types::AssessmentId;

use crate::error::SessionError;

/// The two guarded kinds of proof update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProofOp {
    /// Quick-assign / un-assign of the recommended fix.
    Assign,
    /// Logging or clearing a micro-plan completion.
    Completion,
}

impl std::fmt::Display for ProofOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProofOp::Assign => write!(f, "fix-assign"),
            ProofOp::Completion => write!(f, "completion"),
        }
    }
}

type InFlightSet = Arc<Mutex<HashSet<(AssessmentId, ProofOp)>>>;

/// Tracks which proof operations are currently outstanding.
#[derive(Debug, Clone, Default)]
pub struct ProofTracker {
    in_flight: InFlightSet,
}

impl ProofTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the in-flight slot for `(id, op)`.
    ///
    /// Returns [`SessionError::OperationInFlight`] when the slot is
    /// already taken.  The returned guard frees the slot when dropped.
    pub fn try_begin(&self, id: AssessmentId, op: ProofOp) -> Result<InFlightGuard, SessionError> {
        let mut set = lock(&self.in_flight);
        if !set.insert((id, op)) {
            return Err(SessionError::OperationInFlight { id, op });
        }
        Ok(InFlightGuard {
            set: Arc::clone(&self.in_flight),
            key: (id, op),
        })
    }

    /// Whether an operation of this kind is outstanding for this id.
    pub fn is_in_flight(&self, id: AssessmentId, op: ProofOp) -> bool {
        lock(&self.in_flight).contains(&(id, op))
    }
}

/// Holds one `(assessment, operation)` slot until dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    set: InFlightSet,
    key: (AssessmentId, ProofOp),
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.set).remove(&self.key);
    }
}

fn lock(set: &InFlightSet) -> std::sync::MutexGuard<'_, HashSet<(AssessmentId, ProofOp)>> {
    set.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
