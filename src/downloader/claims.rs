//! In-flight reservation of output filenames.
//!
//! The on-disk existence check alone cannot see a file that ffmpeg has not
//! created yet, so two quick submissions for the same name would both pass
//! it. A claim is taken at submission and held by the task until it is
//! dropped after execution.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Set of filenames currently owned by queued or running tasks
#[derive(Clone, Debug, Default)]
pub(crate) struct ClaimRegistry {
    names: Arc<Mutex<HashSet<String>>>,
}

impl ClaimRegistry {
    /// Reserve `filename`, or return None if it is already reserved
    pub(crate) fn try_claim(&self, filename: &str) -> Option<OutputClaim> {
        if !self.lock().insert(filename.to_string()) {
            return None;
        }

        Some(OutputClaim {
            filename: filename.to_string(),
            registry: self.clone(),
        })
    }

    pub(crate) fn is_claimed(&self, filename: &str) -> bool {
        self.lock().contains(filename)
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.names.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reservation of one output filename, released on drop
#[derive(Debug)]
pub(crate) struct OutputClaim {
    filename: String,
    registry: ClaimRegistry,
}

impl Drop for OutputClaim {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.filename);
    }
}
