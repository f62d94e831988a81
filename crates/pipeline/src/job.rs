//! Export job state machine.
//!
//! ```text
//! Received → Normalizing(0) → [Overlaying(0)] → Normalizing(1) → ... → Composing → Finalized
//!     └──────────────┴──────────────┴─────────────────────────────────┴──→ Failed
//! ```

use std::fmt;

use uuid::Uuid;

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Received,
    /// Clip `clip` has been scheduled for normalization.
    Normalizing { clip: usize },
    /// Clip `clip`'s label raster is being rendered.
    Overlaying { clip: usize },
    /// Waiting on every clip, then joining or tiling.
    Composing,
    Finalized,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::Failed)
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;

        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Received, Normalizing { clip: 0 }) => true,
            (Normalizing { clip: a }, Overlaying { clip: b }) => a == b,
            (Normalizing { clip: a } | Overlaying { clip: a }, Normalizing { clip: b }) => b == a + 1,
            (Normalizing { .. } | Overlaying { .. }, Composing) => true,
            (Composing, Finalized) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => f.write_str("received"),
            Self::Normalizing { clip } => write!(f, "normalizing({clip})"),
            Self::Overlaying { clip } => write!(f, "overlaying({clip})"),
            Self::Composing => f.write_str("composing"),
            Self::Finalized => f.write_str("finalized"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Tracks one job's state and logs every transition.
#[derive(Debug)]
pub struct JobTracker {
    id: Uuid,
    state: JobState,
}

impl JobTracker {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            state: JobState::Received,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn transition(&mut self, next: JobState) -> Result<(), PipelineError> {
        if !self.state.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!(job_id = %self.id, from = %self.state, to = %next, "Export job transition");
        self.state = next;
        Ok(())
    }

    /// Move to `Failed` unless the job already finished.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            tracing::debug!(job_id = %self.id, from = %self.state, "Export job failed");
            self.state = JobState::Failed;
        }
    }
}
