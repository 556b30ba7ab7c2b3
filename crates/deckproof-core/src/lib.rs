pub mod client;
pub mod config;
pub mod controller;
pub mod encoder;
pub mod error;
pub mod request;
pub mod session;
pub mod state;

mod test_util;

// Re-export main types for convenience
pub use client::InferenceClient;
pub use config::Config;
pub use controller::{PendingSubmission, SubmissionController, SubmissionOutcome};
pub use encoder::FileHandle;
pub use error::SubmitError;
pub use session::{AuthToken, CognitoSessionProvider, SessionError, SessionProvider, StaticTokenProvider};
pub use state::{ChatMessage, ChatRole, ConversationState, SharedState};
