//! Submission state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of a submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    /// Session created, nothing sent yet.
    Idle,
    /// Request in flight.
    Submitting,
    /// Backend accepted the work; waiting on the completion channel.
    AwaitingCompletion,
    /// Backend declined the email (e.g. not an insurance form).
    Skipped,
    /// Backend finished processing.
    Done,
    /// The attempt failed. The user may resubmit.
    Failed,
}

impl SubmissionState {
    /// Check if this state allows transitioning to another state.
    pub fn can_transition_to(&self, target: SubmissionState) -> bool {
        use SubmissionState::*;

        matches!(
            (self, target),
            (Idle, Submitting) |
            // Explicit resubmission after a failed attempt
            (Failed, Submitting) |
            (Submitting, Skipped) | (Submitting, AwaitingCompletion) |
            (Submitting, Done) | (Submitting, Failed) |
            (AwaitingCompletion, Done) | (AwaitingCompletion, Failed)
        )
    }

    /// A request is in flight or a completion channel is open.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Submitting | Self::AwaitingCompletion)
    }
}

impl std::fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::AwaitingCompletion => "awaiting_completion",
            Self::Skipped => "skipped",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A state transition event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: SubmissionState,
    pub to: SubmissionState,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}
