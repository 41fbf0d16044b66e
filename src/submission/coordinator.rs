//! Submission coordinator.
//!
//! Drives a [`SubmissionSession`] through one attempt: render the form,
//! send exactly one request, classify the answer, and when the backend
//! works asynchronously open exactly one completion channel.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::response::{ResponseOutcome, classify_response};
use super::session::SubmissionSession;
use super::state::SubmissionState;
use crate::backend::wire::{ProcessRequest, encode};
use crate::backend::{BackendResponse, IntakeBackend};
use crate::completion::{CompletionChannel, StatusSource, TerminalResult};
use crate::config::IntakeConfig;
use crate::error::SubmissionError;
use crate::intake::WorkflowKind;
use crate::notify::{COMPLETE_KEY, ERROR_KEY, Notice, NoticeBoard, Notifier, PROGRESS_KEY};
use crate::render::FormRenderer;

/// Collaborators the coordinator talks to.
#[derive(Clone)]
pub struct CoordinatorDeps {
    pub backend: Arc<dyn IntakeBackend>,
    pub status: Arc<dyn StatusSource>,
    pub renderer: Arc<dyn FormRenderer>,
    pub notifier: Arc<dyn Notifier>,
}

/// Result of [`SubmissionCoordinator::submit`].
pub enum SubmitStep {
    /// The attempt ended without a completion channel.
    Finished(SubmissionOutcome),
    /// The backend is processing; the channel delivers the result.
    Awaiting(CompletionChannel),
}

/// How a submission attempt ended, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Skipped { link: String },
    Done { workflow: WorkflowKind, link: String },
    Failed { message: String },
    /// Polling gave up; the backend may still finish.
    TimedOut { attempts: u32 },
}

impl SubmissionOutcome {
    pub fn message(&self) -> String {
        match self {
            Self::Skipped { .. } => "Email analysis complete".to_string(),
            Self::Done { workflow, .. } => {
                format!("Email saved to {} successfully", workflow.center_name())
            }
            Self::Failed { message } => message.clone(),
            Self::TimedOut { attempts } => format!(
                "No completion status after {attempts} checks; processing may still finish in the background"
            ),
        }
    }

    /// Deep link into the workflow UI, when there is one.
    pub fn link(&self) -> Option<&str> {
        match self {
            Self::Skipped { link } | Self::Done { link, .. } => Some(link),
            Self::Failed { .. } | Self::TimedOut { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Skipped { .. } | Self::Done { .. })
    }
}

pub struct SubmissionCoordinator {
    config: Arc<IntakeConfig>,
    backend: Arc<dyn IntakeBackend>,
    status: Arc<dyn StatusSource>,
    renderer: Arc<dyn FormRenderer>,
    notices: NoticeBoard,
}

impl SubmissionCoordinator {
    pub fn new(config: IntakeConfig, deps: CoordinatorDeps) -> Self {
        Self {
            config: Arc::new(config),
            backend: deps.backend,
            status: deps.status,
            renderer: deps.renderer,
            notices: NoticeBoard::new(deps.notifier),
        }
    }

    /// Start `/extract` for the session in a detached task.
    ///
    /// The task fills the session slot on success. Returns `None` when the
    /// slot is already set, an attempt is in flight, or the primary has no
    /// content.
    pub fn spawn_background_extraction(
        &self,
        session: &SubmissionSession,
    ) -> Option<JoinHandle<()>> {
        if session.session_id().is_some() {
            return None;
        }
        if session.state().is_busy() {
            debug!(session = %session.key(), state = %session.state(), "Attempt in flight, skipping background extraction");
            return None;
        }
        let Some(request) = session.extract_request() else {
            debug!(session = %session.key(), "Primary has no content, skipping background extraction");
            return None;
        };

        let backend = Arc::clone(&self.backend);
        let slot = session.slot();
        let workflow = session.workflow();
        let key = session.key();

        Some(tokio::spawn(async move {
            match backend.extract(workflow, &request).await {
                Ok(ack) => {
                    if slot.set(ack.session_id.clone()).is_ok() {
                        info!(session = %key, session_id = %ack.session_id, "Background extraction started");
                    } else {
                        debug!(session = %key, "Session id already known, ignoring extraction ack");
                    }
                }
                Err(e) => warn!(session = %key, error = %e, "Background extraction failed"),
            }
        }))
    }

    /// Run one submission attempt up to the point where a completion
    /// channel would be needed.
    ///
    /// Fails with `InvalidTransition`, sending nothing, when the session is
    /// busy or already finished. Any other failure ends the attempt as
    /// [`SubmissionOutcome::Failed`] and the session may be resubmitted.
    pub async fn submit(
        &self,
        session: &mut SubmissionSession,
    ) -> Result<SubmitStep, SubmissionError> {
        session.transition(SubmissionState::Submitting, None)?;
        self.notices
            .show(
                PROGRESS_KEY,
                Notice::progress("Analyzing email and sending to workflow..."),
            )
            .await;

        let outcome = match self.send(session).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let outcome = self.fail(session, format!("Saving failed: {e}")).await?;
                return Ok(SubmitStep::Finished(outcome));
            }
        };

        match outcome {
            ResponseOutcome::Skipped => {
                session.transition(SubmissionState::Skipped, None)?;
                self.show_saved(WorkflowKind::Underwriting).await;
                Ok(SubmitStep::Finished(SubmissionOutcome::Skipped {
                    link: format!("{}/policy-center", self.config.underwriting_base_url),
                }))
            }
            ResponseOutcome::Completed => {
                let outcome = self.complete(session).await?;
                Ok(SubmitStep::Finished(outcome))
            }
            ResponseOutcome::Rejected { message } => {
                let outcome = self.fail(session, format!("Processing failed: {message}")).await?;
                Ok(SubmitStep::Finished(outcome))
            }
            ResponseOutcome::Processing { session_id } => {
                let held = session.record_session_id(&session_id).to_string();
                if held != session_id {
                    warn!(session = %session.key(), held = %held, listening = %session_id, "Listening on the id from the response");
                }
                session.transition(
                    SubmissionState::AwaitingCompletion,
                    Some(format!("session {session_id}")),
                )?;
                self.notices
                    .show(
                        PROGRESS_KEY,
                        Notice::progress(format!(
                            "Sending email data to the {}...",
                            session.workflow().center_name()
                        )),
                    )
                    .await;

                let channel = CompletionChannel::open(
                    Arc::clone(&self.status),
                    session_id,
                    self.config.completion,
                );
                Ok(SubmitStep::Awaiting(channel))
            }
        }
    }

    /// Wait for the channel's terminal result and finish the attempt.
    pub async fn await_completion(
        &self,
        session: &mut SubmissionSession,
        mut channel: CompletionChannel,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        debug!(session = %session.key(), session_id = channel.session_id(), "Waiting for completion");
        let result = channel.recv().await;
        channel.close();

        match result {
            Some(TerminalResult::Done) => self.complete(session).await,
            Some(TerminalResult::Error { message }) => {
                self.fail(session, format!("Processing failed: {message}")).await
            }
            Some(TerminalResult::TimedOut { attempts }) => {
                session.transition(
                    SubmissionState::Failed,
                    Some(format!("no terminal status after {attempts} polls")),
                )?;
                let outcome = SubmissionOutcome::TimedOut { attempts };
                self.notices
                    .show(ERROR_KEY, Notice::error(outcome.message()))
                    .await;
                Ok(outcome)
            }
            None => {
                self.fail(session, "Completion channel closed without a result".to_string())
                    .await
            }
        }
    }

    /// `submit` followed by `await_completion` when needed.
    pub async fn run(
        &self,
        session: &mut SubmissionSession,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        match self.submit(session).await? {
            SubmitStep::Finished(outcome) => Ok(outcome),
            SubmitStep::Awaiting(channel) => self.await_completion(session, channel).await,
        }
    }

    /// Render the form and send the one request for this attempt.
    async fn send(&self, session: &SubmissionSession) -> Result<ResponseOutcome, SubmissionError> {
        let form = self.renderer.render(session.fields())?;
        let workflow = session.workflow();

        let response: BackendResponse = match session.session_id() {
            Some(session_id) => {
                debug!(session = %session.key(), session_id, "Confirming extraction session");
                let request = ProcessRequest {
                    session_id: session_id.to_string(),
                    email_fields: session.fields().clone(),
                    form_pdf: encode(&form),
                };
                self.backend.process(workflow, &request).await?
            }
            None => {
                let request = session.submit_request()?;
                debug!(session = %session.key(), filename = %request.filename, "Submitting email");
                self.backend.submit(workflow, &request).await?
            }
        };

        Ok(classify_response(&response, session.session_id())?)
    }

    async fn complete(
        &self,
        session: &mut SubmissionSession,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        session.transition(SubmissionState::Done, None)?;
        let workflow = session.workflow();
        self.show_saved(workflow).await;

        let link = match workflow {
            WorkflowKind::Claims => format!("{}/claims", self.config.claims_base_url),
            WorkflowKind::Underwriting => format!(
                "{}/policy-detail/{}",
                self.config.underwriting_base_url,
                session.fields().policy_number
            ),
        };
        Ok(SubmissionOutcome::Done { workflow, link })
    }

    async fn fail(
        &self,
        session: &mut SubmissionSession,
        message: String,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        warn!(session = %session.key(), error = %message, "Submission failed");
        session.transition(SubmissionState::Failed, Some(message.clone()))?;
        self.notices
            .show(ERROR_KEY, Notice::error(message.clone()))
            .await;
        Ok(SubmissionOutcome::Failed { message })
    }

    async fn show_saved(&self, workflow: WorkflowKind) {
        self.notices
            .show(
                COMPLETE_KEY,
                Notice::informational(format!(
                    "This email's data has been saved in {}.",
                    workflow.center_name()
                )),
            )
            .await;
    }
}
