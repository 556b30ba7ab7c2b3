//! UI-agnostic conversation state
//!
//! This module contains the transcript and the transient submission flags that
//! front ends render. The submission controller is the only writer during a
//! submission; the user may clear the transcript at any time.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

/// A chat message in the conversation transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<ChatMessage>,
    loading: bool,
    error: Option<String>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn append_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Empties the transcript. Does not touch `loading`, so an in-flight
    /// submission keeps running and appends to the emptied transcript.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }
}

/// Conversation state shared between the front end and the submission task.
#[derive(Debug, Clone, Default)]
pub struct SharedState(Arc<Mutex<ConversationState>>);

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the state, recovering from poisoning: every mutation is a single
    /// field write, so the data is never half-updated.
    pub fn lock(&self) -> MutexGuard<'_, ConversationState> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copies the current state out for rendering.
    pub fn snapshot(&self) -> ConversationState {
        self.lock().clone()
    }

    /// The user's clear action: empties the transcript and dismisses the
    /// error banner. `loading` is left alone; an in-flight submission still
    /// lands in the emptied transcript.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.clear();
        state.set_error(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut state = ConversationState::new();
        state.append_message(ChatMessage::assistant("first"));
        state.append_message(ChatMessage::assistant("second"));

        let contents: Vec<&str> = state.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[test]
    fn test_transcript_clear_touches_only_messages() {
        let mut state = ConversationState::new();
        state.append_message(ChatMessage::assistant("hello"));
        state.set_loading(true);
        state.set_error(Some("boom".to_string()));

        state.clear();

        assert!(state.messages().is_empty());
        assert!(state.is_loading());
        assert_eq!(state.error(), Some("boom"));
    }

    #[test]
    fn test_user_clear_dismisses_error_but_not_loading() {
        let shared = SharedState::new();
        {
            let mut state = shared.lock();
            state.append_message(ChatMessage::assistant("hello"));
            state.set_loading(true);
            state.set_error(Some("An error occurred: x".to_string()));
        }

        shared.clear();

        let state = shared.snapshot();
        assert!(state.messages().is_empty());
        assert!(state.error().is_none());
        assert!(state.is_loading());
    }

    #[test]
    fn test_shared_state_is_shared() {
        let shared = SharedState::new();
        let other = shared.clone();
        other.lock().append_message(ChatMessage::user("hi"));

        assert_eq!(shared.snapshot().messages().len(), 1);
        shared.clear();
        assert!(other.snapshot().messages().is_empty());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::assistant("ok")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"ok"}"#);
    }
}
