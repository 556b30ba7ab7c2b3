use reqwest::Client;

use crate::config::Config;
use crate::error::SubmitError;
use crate::request::{ProofreadRequest, ProofreadResponse};

/// HTTP client for the proofreading endpoint.
#[derive(Clone)]
pub struct InferenceClient {
    client: Client,
}

impl InferenceClient {
    pub fn new(config: &Config) -> Result<Self, SubmitError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { client })
    }

    pub async fn send(&self, request: &ProofreadRequest) -> Result<ProofreadResponse, SubmitError> {
        let response = self
            .client
            .post(&request.url)
            .header("Authorization", request.authorization.as_str())
            .header("Content-Type", request.content_type)
            .json(&request.body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ProofreadResponse>(&text)
                .ok()
                .and_then(|r| r.error);
            return Err(SubmitError::Transport(match detail {
                Some(detail) => format!("request failed with status {}: {}", status, detail),
                None => format!("request failed with status {}", status),
            }));
        }

        Ok(response.json().await?)
    }
}
