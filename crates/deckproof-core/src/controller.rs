//! One submission cycle: encode both files, fetch a token, call the endpoint,
//! and record the outcome on the shared conversation state.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::client::InferenceClient;
use crate::config::Config;
use crate::encoder::{self, FileHandle};
use crate::error::SubmitError;
use crate::request;
use crate::session::SessionProvider;
use crate::state::{ChatMessage, SharedState};

/// Files picked by the user, not yet submitted.
#[derive(Debug, Clone, Default)]
pub struct PendingSubmission {
    pub deck: Option<FileHandle>,
    pub notes: Option<FileHandle>,
}

impl PendingSubmission {
    pub fn new(deck: FileHandle, notes: FileHandle) -> Self {
        Self {
            deck: Some(deck),
            notes: Some(notes),
        }
    }
}

#[derive(Debug)]
pub enum SubmissionOutcome {
    /// An assistant message was appended.
    Completed,
    /// `error` was set on the state; nothing was appended.
    Failed(SubmitError),
    /// Another submission was in flight; the state was not touched.
    Rejected,
}

pub struct SubmissionController {
    endpoint: String,
    client: InferenceClient,
    session: Arc<dyn SessionProvider>,
    state: SharedState,
}

impl SubmissionController {
    pub fn new(
        config: &Config,
        session: Arc<dyn SessionProvider>,
        state: SharedState,
    ) -> Result<Self, SubmitError> {
        Ok(Self {
            endpoint: config.api_endpoint.clone(),
            client: InferenceClient::new(config)?,
            session,
            state,
        })
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Runs `submit` on a background task.
    pub fn spawn(self: &Arc<Self>, pending: PendingSubmission) -> JoinHandle<SubmissionOutcome> {
        let controller = Arc::clone(self);
        tokio::spawn(async move { controller.submit(pending).await })
    }

    pub async fn submit(&self, pending: PendingSubmission) -> SubmissionOutcome {
        let (deck, notes) = {
            let mut state = self.state.lock();
            if state.is_loading() {
                tracing::debug!("submission already in flight, rejecting");
                return SubmissionOutcome::Rejected;
            }

            match (pending.deck, pending.notes) {
                (Some(deck), Some(notes)) => {
                    state.set_loading(true);
                    state.set_error(None);
                    (deck, notes)
                }
                _ => {
                    let err = SubmitError::Validation;
                    state.set_error(Some(err.user_message()));
                    return SubmissionOutcome::Failed(err);
                }
            }
        };

        tracing::debug!(deck = %deck.name(), notes = %notes.name(), "submission started");
        let result = self.run(&deck, &notes).await;

        let mut state = self.state.lock();
        let outcome = match result {
            Ok(text) => {
                state.append_message(ChatMessage::assistant(text));
                tracing::info!(messages = state.messages().len(), "submission completed");
                SubmissionOutcome::Completed
            }
            Err(err) => {
                tracing::warn!(error = %err, "submission failed");
                state.set_error(Some(err.user_message()));
                SubmissionOutcome::Failed(err)
            }
        };
        state.set_loading(false);
        outcome
    }

    async fn run(&self, deck: &FileHandle, notes: &FileHandle) -> Result<String, SubmitError> {
        let (deck, notes) = tokio::try_join!(encoder::encode(deck), encoder::encode(notes))?;
        tracing::debug!("files encoded");

        let token = self.session.get_token().await?;
        tracing::debug!("session token acquired");

        let request = request::build(&self.endpoint, deck, notes, token);
        let response = self.client.send(&request).await?;

        if !response.success {
            return Err(SubmitError::Application(response.error));
        }
        response
            .response
            .ok_or_else(|| SubmitError::Application(Some("response text missing".to_string())))
    }
}
