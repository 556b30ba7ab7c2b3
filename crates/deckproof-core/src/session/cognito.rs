use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use super::{AuthToken, SessionError, SessionProvider};
use crate::config::Config;

const INITIATE_AUTH_TARGET: &str = "AWSCognitoIdentityProviderService.InitiateAuth";
const AMZ_JSON: &str = "application/x-amz-json-1.1";

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthRequest<'a> {
    auth_flow: &'a str,
    client_id: &'a str,
    auth_parameters: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthResponse {
    authentication_result: Option<AuthenticationResult>,
    challenge_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    id_token: String,
    refresh_token: Option<String>,
    expires_in: u64,
}

#[derive(Deserialize)]
struct CognitoError {
    #[serde(rename = "__type")]
    kind: Option<String>,
    message: Option<String>,
}

struct CachedSession {
    username: String,
    id_token: AuthToken,
    refresh_token: Option<String>,
    expires_at: Instant,
}

/// Session provider backed by a Cognito user pool (user/password sign-in).
pub struct CognitoSessionProvider {
    client: Client,
    endpoint: String,
    client_id: String,
    session: Mutex<Option<CachedSession>>,
}

impl CognitoSessionProvider {
    pub fn new(config: &Config) -> Result<Self, SessionError> {
        Self::with_endpoint(
            &format!("https://cognito-idp.{}.amazonaws.com/", config.region),
            &config.user_pool_client_id,
            config.request_timeout(),
        )
    }

    pub fn with_endpoint(endpoint: &str, client_id: &str, timeout: Duration) -> Result<Self, SessionError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            client_id: client_id.to_string(),
            session: Mutex::new(None),
        })
    }

    pub async fn sign_in(&self, username: &str, password: &str) -> Result<(), SessionError> {
        let result = self
            .initiate_auth(
                "USER_PASSWORD_AUTH",
                json!({ "USERNAME": username, "PASSWORD": password }),
            )
            .await?;

        *self.session.lock().await = Some(CachedSession {
            username: username.to_string(),
            id_token: AuthToken::new(result.id_token),
            refresh_token: result.refresh_token,
            expires_at: Instant::now() + Duration::from_secs(result.expires_in),
        });
        tracing::info!(%username, "signed in");
        Ok(())
    }

    pub async fn sign_out(&self) {
        if let Some(session) = self.session.lock().await.take() {
            tracing::info!(username = %session.username, "signed out");
        }
    }

    pub async fn username(&self) -> Option<String> {
        self.session.lock().await.as_ref().map(|s| s.username.clone())
    }

    async fn initiate_auth(
        &self,
        auth_flow: &str,
        auth_parameters: serde_json::Value,
    ) -> Result<AuthenticationResult, SessionError> {
        let request = InitiateAuthRequest {
            auth_flow,
            client_id: &self.client_id,
            auth_parameters,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Amz-Target", INITIATE_AUTH_TARGET)
            .header("Content-Type", AMZ_JSON)
            .body(serde_json::to_vec(&request).map_err(|e| SessionError::SignIn(e.to_string()))?)
            .send()
            .await
            .map_err(|e| SessionError::SignIn(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<CognitoError>(&text) {
                Ok(CognitoError { kind, message }) => format!(
                    "{}: {}",
                    kind.unwrap_or_else(|| status.to_string()),
                    message.unwrap_or_default()
                ),
                Err(_) => format!("Cognito error {}: {}", status, text),
            };
            return Err(SessionError::SignIn(detail));
        }

        let body: InitiateAuthResponse = response
            .json()
            .await
            .map_err(|e| SessionError::SignIn(e.to_string()))?;

        match (body.authentication_result, body.challenge_name) {
            (Some(result), _) => Ok(result),
            (None, Some(challenge)) => Err(SessionError::SignIn(format!(
                "unsupported challenge {challenge}"
            ))),
            (None, None) => Err(SessionError::SignIn("no authentication result".to_string())),
        }
    }
}

#[async_trait]
impl SessionProvider for CognitoSessionProvider {
    async fn get_token(&self) -> Result<AuthToken, SessionError> {
        // The session lock is never held across the refresh call
        let refresh_token = {
            let mut guard = self.session.lock().await;
            let session = guard.as_mut().ok_or(SessionError::NoSession)?;

            if Instant::now() + EXPIRY_MARGIN < session.expires_at {
                return Ok(session.id_token.clone());
            }

            match session.refresh_token.clone() {
                Some(refresh_token) => refresh_token,
                None => {
                    *guard = None;
                    return Err(SessionError::NoSession);
                }
            }
        };

        let result = self
            .initiate_auth("REFRESH_TOKEN_AUTH", json!({ "REFRESH_TOKEN": refresh_token.as_str() }))
            .await;

        let mut guard = self.session.lock().await;
        // Signed out, or signed in again, while the refresh was in flight
        let Some(session) = guard
            .as_mut()
            .filter(|s| s.refresh_token.as_deref() == Some(refresh_token.as_str()))
        else {
            return Err(SessionError::NoSession);
        };

        match result {
            Ok(result) => {
                session.id_token = AuthToken::new(result.id_token);
                session.expires_at = Instant::now() + Duration::from_secs(result.expires_in);
                if result.refresh_token.is_some() {
                    session.refresh_token = result.refresh_token;
                }
                tracing::debug!(username = %session.username, "refreshed session");
                Ok(session.id_token.clone())
            }
            Err(err) => {
                tracing::warn!(error = %err, "session refresh failed");
                *guard = None;
                Err(SessionError::NoSession)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::test_util::silent_server;
    use mockito::Matcher;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn auth_result(id_token: &str, expires_in: u64) -> String {
        json!({
            "AuthenticationResult": {
                "IdToken": id_token,
                "AccessToken": "access",
                "RefreshToken": "refresh-1",
                "ExpiresIn": expires_in,
                "TokenType": "Bearer"
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_get_token_without_sign_in() {
        let provider = CognitoSessionProvider::with_endpoint("http://127.0.0.1:9", "client", TIMEOUT).unwrap();
        let err = provider.get_token().await.unwrap_err();
        assert!(matches!(err, SessionError::NoSession));
    }

    #[tokio::test]
    async fn test_sign_in_caches_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("x-amz-target", INITIATE_AUTH_TARGET)
            .match_header("content-type", AMZ_JSON)
            .match_body(Matcher::PartialJson(json!({
                "AuthFlow": "USER_PASSWORD_AUTH",
                "ClientId": "client",
                "AuthParameters": { "USERNAME": "alice", "PASSWORD": "pw" }
            })))
            .with_status(200)
            .with_body(auth_result("id-1", 3600))
            .expect(1)
            .create_async()
            .await;

        let provider = CognitoSessionProvider::with_endpoint(&server.url(), "client", TIMEOUT).unwrap();
        provider.sign_in("alice", "pw").await.unwrap();

        assert_eq!(provider.get_token().await.unwrap().as_str(), "id-1");
        assert_eq!(provider.get_token().await.unwrap().as_str(), "id-1");
        assert_eq!(provider.username().await.as_deref(), Some("alice"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_expiring_token_is_refreshed() {
        let mut server = mockito::Server::new_async().await;
        let _sign_in = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "AuthFlow": "USER_PASSWORD_AUTH" })))
            .with_body(auth_result("id-1", 10))
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({
                "AuthFlow": "REFRESH_TOKEN_AUTH",
                "AuthParameters": { "REFRESH_TOKEN": "refresh-1" }
            })))
            .with_body(json!({ "AuthenticationResult": { "IdToken": "id-2", "ExpiresIn": 3600 } }).to_string())
            .expect(1)
            .create_async()
            .await;

        let provider = CognitoSessionProvider::with_endpoint(&server.url(), "client", TIMEOUT).unwrap();
        provider.sign_in("alice", "pw").await.unwrap();

        assert_eq!(provider.get_token().await.unwrap().as_str(), "id-2");
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_refresh_ends_session() {
        let mut server = mockito::Server::new_async().await;
        let _sign_in = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "AuthFlow": "USER_PASSWORD_AUTH" })))
            .with_body(auth_result("id-1", 0))
            .create_async()
            .await;
        let _refresh = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "AuthFlow": "REFRESH_TOKEN_AUTH" })))
            .with_status(400)
            .with_body(r#"{"__type":"NotAuthorizedException","message":"Refresh Token has expired"}"#)
            .create_async()
            .await;

        let provider = CognitoSessionProvider::with_endpoint(&server.url(), "client", TIMEOUT).unwrap();
        provider.sign_in("alice", "pw").await.unwrap();

        assert!(matches!(provider.get_token().await, Err(SessionError::NoSession)));
        assert!(provider.username().await.is_none());
    }

    #[tokio::test]
    async fn test_sign_in_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(400)
            .with_body(r#"{"__type":"NotAuthorizedException","message":"Incorrect username or password."}"#)
            .create_async()
            .await;

        let provider = CognitoSessionProvider::with_endpoint(&server.url(), "client", TIMEOUT).unwrap();
        let err = provider.sign_in("alice", "wrong").await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "sign-in failed: NotAuthorizedException: Incorrect username or password."
        );
        assert!(matches!(provider.get_token().await, Err(SessionError::NoSession)));
    }

    #[tokio::test]
    async fn test_sign_out_drops_session() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_body(auth_result("id-1", 3600))
            .create_async()
            .await;

        let provider = CognitoSessionProvider::with_endpoint(&server.url(), "client", TIMEOUT).unwrap();
        provider.sign_in("alice", "pw").await.unwrap();
        provider.sign_out().await;

        assert!(matches!(provider.get_token().await, Err(SessionError::NoSession)));
    }

    fn expired_session() -> CachedSession {
        CachedSession {
            username: "alice".to_string(),
            id_token: AuthToken::new("id-1"),
            refresh_token: Some("refresh-1".to_string()),
            expires_at: Instant::now(),
        }
    }

    #[tokio::test]
    async fn test_stalled_refresh_times_out() {
        let url = silent_server().await;
        let provider = CognitoSessionProvider::with_endpoint(&url, "client", Duration::from_secs(1)).unwrap();
        *provider.session.lock().await = Some(expired_session());

        let result = tokio::time::timeout(Duration::from_secs(10), provider.get_token())
            .await
            .expect("refresh should give up after the request timeout");
        assert!(matches!(result, Err(SessionError::NoSession)));
    }

    #[tokio::test]
    async fn test_sign_out_during_refresh_does_not_wait() {
        let url = silent_server().await;
        let provider = Arc::new(
            CognitoSessionProvider::with_endpoint(&url, "client", Duration::from_secs(30)).unwrap(),
        );
        *provider.session.lock().await = Some(expired_session());

        let refreshing = {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.get_token().await })
        };
        tokio::time::sleep(Duration::from_millis(200)).await;

        tokio::time::timeout(Duration::from_secs(1), provider.sign_out())
            .await
            .expect("sign-out should not wait for the refresh");
        assert!(provider.username().await.is_none());
        refreshing.abort();
    }
}
