use std::path::PathBuf;
use std::sync::Arc;
use deckproof_core::{
    CognitoSessionProvider, FileHandle, PendingSubmission, SharedState, SubmissionController,
    SubmissionOutcome,
};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Deck,
    Notes,
}

/// A single-line path input with a cursor counted in characters.
#[derive(Debug, Clone, Default)]
pub struct PathInput {
    pub text: String,
    pub cursor: usize,
}

impl PathInput {
    /// The selected file, or None when nothing has been entered.
    pub fn file(&self) -> Option<FileHandle> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(FileHandle::from_path(PathBuf::from(trimmed)))
        }
    }
}

pub struct App {
    pub should_quit: bool,
    pub focus: FormField,

    // File selection form
    pub deck_input: PathInput,
    pub notes_input: PathInput,

    // Submission pipeline; conversation state lives in the controller
    pub controller: Arc<SubmissionController>,
    pub submit_task: Option<JoinHandle<SubmissionOutcome>>,

    // Session
    pub cognito: Option<Arc<CognitoSessionProvider>>,
    pub username: Option<String>,

    // Transcript view
    pub transcript_scroll: u16,
    pub transcript_height: u16,
    pub total_transcript_lines: u16,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(
        controller: Arc<SubmissionController>,
        cognito: Option<Arc<CognitoSessionProvider>>,
        username: Option<String>,
    ) -> Self {
        Self {
            should_quit: false,
            focus: FormField::Deck,
            deck_input: PathInput::default(),
            notes_input: PathInput::default(),
            controller,
            submit_task: None,
            cognito,
            username,
            transcript_scroll: 0,
            transcript_height: 0,
            total_transcript_lines: 0,
            animation_frame: 0,
        }
    }

    pub fn state(&self) -> &SharedState {
        self.controller.state()
    }

    pub fn focused_input(&mut self) -> &mut PathInput {
        match self.focus {
            FormField::Deck => &mut self.deck_input,
            FormField::Notes => &mut self.notes_input,
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            FormField::Deck => FormField::Notes,
            FormField::Notes => FormField::Deck,
        };
    }

    pub fn pending_submission(&self) -> PendingSubmission {
        PendingSubmission {
            deck: self.deck_input.file(),
            notes: self.notes_input.file(),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submit_task.is_some()
    }

    /// Starts a submission unless one is already running.
    pub fn submit(&mut self) {
        if self.is_submitting() {
            return;
        }
        let pending = self.pending_submission();
        self.submit_task = Some(self.controller.spawn(pending));
    }

    /// Collects a finished submission task, if any.
    pub async fn poll_submission(&mut self) {
        let finished = self
            .submit_task
            .as_ref()
            .is_some_and(|task| task.is_finished());
        if !finished {
            return;
        }

        let Some(task) = self.submit_task.take() else {
            return;
        };
        match task.await {
            Ok(SubmissionOutcome::Completed) => self.scroll_transcript_to_bottom(),
            Ok(outcome) => tracing::debug!(?outcome, "submission ended"),
            Err(err) => {
                tracing::error!(error = %err, "submission task panicked");
                let mut state = self.state().lock();
                state.set_loading(false);
                state.set_error(Some(format!("An error occurred: {err}")));
            }
        }
    }

    /// Clears the transcript; an in-flight submission keeps running.
    pub fn clear_conversation(&mut self) {
        self.state().clear();
        self.transcript_scroll = 0;
    }

    pub async fn sign_out(&mut self) {
        match &self.cognito {
            Some(cognito) => {
                cognito.sign_out().await;
                self.username = None;
            }
            None => self
                .state()
                .lock()
                .set_error(Some("Sign-out is only available for user-pool sessions.".to_string())),
        }
    }

    pub fn tick_animation(&mut self) {
        self.animation_frame = (self.animation_frame + 1) % 3;
    }

    pub fn scroll_down(&mut self) {
        let max_scroll = self.total_transcript_lines.saturating_sub(self.transcript_height);
        self.transcript_scroll = (self.transcript_scroll + 1).min(max_scroll);
    }

    pub fn scroll_up(&mut self) {
        self.transcript_scroll = self.transcript_scroll.saturating_sub(1);
    }

    pub fn scroll_half_page_down(&mut self) {
        let half = (self.transcript_height / 2).max(1);
        let max_scroll = self.total_transcript_lines.saturating_sub(self.transcript_height);
        self.transcript_scroll = (self.transcript_scroll + half).min(max_scroll);
    }

    pub fn scroll_half_page_up(&mut self) {
        let half = (self.transcript_height / 2).max(1);
        self.transcript_scroll = self.transcript_scroll.saturating_sub(half);
    }

    pub fn scroll_transcript_to_bottom(&mut self) {
        // Line count is only known after the next render; ui clamps it.
        self.transcript_scroll = u16::MAX;
    }
}
