//! Wire types for the proofreading endpoint

use serde::{Deserialize, Serialize};

use crate::session::AuthToken;

pub const CONTENT_TYPE_JSON: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitBody {
    #[serde(rename = "pptxFile")]
    pub pptx_file: String,
    #[serde(rename = "txtFile")]
    pub txt_file: String,
}

/// A fully assembled `POST` to the endpoint.
#[derive(Debug, Clone)]
pub struct ProofreadRequest {
    pub url: String,
    pub authorization: AuthToken,
    pub content_type: &'static str,
    pub body: SubmitBody,
}

/// Response envelope. Anything other than `success: true` is a failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProofreadResponse {
    #[serde(default)]
    pub success: bool,
    pub response: Option<String>,
    pub error: Option<String>,
}

/// Assembles the request from already-encoded files. The token goes into
/// `Authorization` as-is; the endpoint's authorizer expects the raw id token.
pub fn build(endpoint: &str, deck: String, notes: String, token: AuthToken) -> ProofreadRequest {
    ProofreadRequest {
        url: endpoint.to_string(),
        authorization: token,
        content_type: CONTENT_TYPE_JSON,
        body: SubmitBody {
            pptx_file: deck,
            txt_file: notes,
        },
    }
}
