//! Submission errors

use crate::session::SessionError;

pub const VALIDATION_MESSAGE: &str = "Please select both files.";
pub const APPLICATION_MESSAGE: &str = "Failed to retrieve a response.";

/// Everything that can end a submission attempt without a response.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("both files are required")]
    Validation,

    #[error("failed to read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{name} has no content to encode")]
    Encoding { name: String },

    #[error(transparent)]
    NoSession(#[from] SessionError),

    #[error("{0}")]
    Transport(String),

    /// The endpoint answered but reported `success: false`. Carries the
    /// endpoint's own error text when it sent one.
    #[error("endpoint reported failure{}", .0.as_deref().map(|e| format!(": {e}")).unwrap_or_default())]
    Application(Option<String>),
}

impl SubmitError {
    /// Text for the error banner.
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::Validation => VALIDATION_MESSAGE.to_string(),
            SubmitError::Application(_) => APPLICATION_MESSAGE.to_string(),
            other => format!("An error occurred: {other}"),
        }
    }
}

impl From<reqwest::Error> for SubmitError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SubmitError::Transport(format!("request timed out: {err}"))
        } else {
            SubmitError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message() {
        assert_eq!(SubmitError::Validation.user_message(), VALIDATION_MESSAGE);
    }

    #[test]
    fn test_application_message_hides_endpoint_text() {
        let err = SubmitError::Application(Some("model exploded".to_string()));
        assert_eq!(err.user_message(), APPLICATION_MESSAGE);
        assert_eq!(err.to_string(), "endpoint reported failure: model exploded");
    }

    #[test]
    fn test_transport_message_includes_cause() {
        let err = SubmitError::Transport("connection refused".to_string());
        assert_eq!(err.user_message(), "An error occurred: connection refused");
    }

    #[test]
    fn test_no_session_message() {
        let err = SubmitError::from(SessionError::NoSession);
        assert_eq!(err.user_message(), "An error occurred: no active session, please sign in");
    }
}
