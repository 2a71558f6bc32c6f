// crates/hello-action-webhook/src/lib.rs
// ============================================================================
// Module: Hello Action Webhook Library
// Description: HTTP implementation of the follow-up message API.
// Purpose: Create, edit, and delete follow-ups over the callback URL.
// Dependencies: hello-action-core, reqwest, url
// ============================================================================

//! ## Overview
//! [`HttpWebhookClient`] implements [`WebhookClient`] with `reqwest`:
//! - create: `POST {callback_url}`
//! - edit: `PATCH {callback_url}/messages/{id}`
//! - delete: `DELETE {callback_url}/messages/{id}`
//!
//! It also performs the account profile lookup made after a permission
//! approval. Calls are never retried. Response bodies are capped at
//! [`MAX_RESPONSE_BYTES`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use hello_action_core::FollowupMessage;
use hello_action_core::FollowupTarget;
use hello_action_core::WebhookClient;
use hello_action_core::WebhookError;
use hello_action_core::webhook::FollowupBody;
use reqwest::Client;
use reqwest::Response;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted response body size.
pub const MAX_RESPONSE_BYTES: usize = 1024 * 1024;
/// Path of the account profile endpoint on the callback origin.
pub const ACCOUNT_PROFILE_PATH: &str = "/account/me";
/// Connect timeout for follow-up calls.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Longest error body echoed into [`WebhookError::Status`].
const MAX_ERROR_MESSAGE_CHARS: usize = 256;

// ============================================================================
// SECTION: Client
// ============================================================================

/// `reqwest`-backed follow-up client.
#[derive(Debug, Clone)]
pub struct HttpWebhookClient {
    /// Shared HTTP client with timeouts applied.
    client: Client,
}

impl HttpWebhookClient {
    /// Builds a client whose calls time out after `request_timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::Transport`] when the HTTP client cannot be
    /// built.
    pub fn new(request_timeout: Duration) -> Result<Self, WebhookError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|err| WebhookError::Transport(err.to_string()))?;
        Ok(Self {
            client,
        })
    }

    /// Fetches the account profile for an approved permission request from
    /// `<callback origin>/account/me`.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError`] when the URL is unusable, the call fails, or
    /// the body is not JSON.
    pub async fn account_profile(
        &self,
        callback_url: &str,
        api_token: &str,
    ) -> Result<Value, WebhookError> {
        let url = profile_url(callback_url)?;
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {api_token}"))
            .send()
            .await
            .map_err(|err| WebhookError::Transport(err.to_string()))?;
        let bytes = read_success(response).await?;
        serde_json::from_slice(&bytes).map_err(|err| WebhookError::InvalidResponse(err.to_string()))
    }
}

#[async_trait]
impl WebhookClient for HttpWebhookClient {
    async fn create_followup(
        &self,
        target: &FollowupTarget,
        body: &FollowupBody,
    ) -> Result<FollowupMessage, WebhookError> {
        let url = callback_url(&target.callback_url)?;
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| WebhookError::Transport(err.to_string()))?;
        parse_message(response).await
    }

    async fn edit_followup(
        &self,
        target: &FollowupTarget,
        message_id: &str,
        body: &FollowupBody,
    ) -> Result<FollowupMessage, WebhookError> {
        let url = message_url(&target.callback_url, message_id)?;
        let response = self
            .client
            .patch(url)
            .json(body)
            .send()
            .await
            .map_err(|err| WebhookError::Transport(err.to_string()))?;
        parse_message(response).await
    }

    async fn delete_followup(
        &self,
        target: &FollowupTarget,
        message_id: &str,
    ) -> Result<(), WebhookError> {
        let url = message_url(&target.callback_url, message_id)?;
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|err| WebhookError::Transport(err.to_string()))?;
        read_success(response).await.map(|_| ())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses and checks a callback URL.
fn callback_url(raw: &str) -> Result<Url, WebhookError> {
    let url = Url::parse(raw).map_err(|err| WebhookError::InvalidUrl(err.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(WebhookError::InvalidUrl(format!("unsupported scheme {other}"))),
    }
    if url.cannot_be_a_base() {
        return Err(WebhookError::InvalidUrl("callback url cannot be a base".to_string()));
    }
    Ok(url)
}

/// Builds `{callback_url}/messages/{id}`.
fn message_url(raw: &str, message_id: &str) -> Result<Url, WebhookError> {
    if message_id.is_empty() {
        return Err(WebhookError::InvalidUrl("empty message id".to_string()));
    }
    let mut url = callback_url(raw)?;
    url.path_segments_mut()
        .map_err(|()| WebhookError::InvalidUrl("callback url cannot be a base".to_string()))?
        .pop_if_empty()
        .push("messages")
        .push(message_id);
    Ok(url)
}

/// Builds the account profile URL on the callback origin.
fn profile_url(raw: &str) -> Result<Url, WebhookError> {
    let url = callback_url(raw)?;
    let origin = url.origin().ascii_serialization();
    Url::parse(&format!("{origin}{ACCOUNT_PROFILE_PATH}"))
        .map_err(|err| WebhookError::InvalidUrl(err.to_string()))
}

/// Reads a successful response body, mapping other statuses to errors.
async fn read_success(response: Response) -> Result<Vec<u8>, WebhookError> {
    let status = response.status();
    let bytes = read_limited(response, MAX_RESPONSE_BYTES).await?;
    if !status.is_success() {
        let message: String =
            String::from_utf8_lossy(&bytes).chars().take(MAX_ERROR_MESSAGE_CHARS).collect();
        return Err(WebhookError::Status {
            status: status.as_u16(),
            message,
        });
    }
    Ok(bytes.to_vec())
}

/// Reads at most `limit` body bytes, failing as soon as the stream passes it.
async fn read_limited(mut response: Response, limit: usize) -> Result<Vec<u8>, WebhookError> {
    if response.content_length().is_some_and(|len| len > limit as u64) {
        return Err(WebhookError::InvalidResponse("response body too large".to_string()));
    }
    let mut body = Vec::new();
    while let Some(chunk) =
        response.chunk().await.map_err(|err| WebhookError::Transport(err.to_string()))?
    {
        if body.len().saturating_add(chunk.len()) > limit {
            return Err(WebhookError::InvalidResponse("response body too large".to_string()));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Parses a follow-up message from a successful response.
async fn parse_message(response: Response) -> Result<FollowupMessage, WebhookError> {
    let bytes = read_success(response).await?;
    serde_json::from_slice(&bytes).map_err(|err| WebhookError::InvalidResponse(err.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
