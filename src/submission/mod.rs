//! Submission lifecycle: session, state machine, response classification
//! and the coordinator tying them to the backend and completion channel.

mod coordinator;
mod response;
mod session;
mod state;

pub use coordinator::{CoordinatorDeps, SubmissionCoordinator, SubmissionOutcome, SubmitStep};
pub use response::{ResponseOutcome, classify_response};
pub use session::{SessionSlot, SubmissionSession};
pub use state::{StateTransition, SubmissionState};
