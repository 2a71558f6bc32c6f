// crates/hello-action-core/src/webhook.rs
// ============================================================================
// Module: Webhook Client Interface
// Description: Follow-up message operations keyed by a callback token.
// Purpose: Abstract the remote follow-up API behind an async trait.
// Dependencies: async-trait, serde, thiserror, tokio
// ============================================================================

//! ## Overview
//! A follow-up message is created once per callback context, then edited in
//! place or deleted by id. Each callback token is only valid for the life of
//! the originating interaction; [`CallbackToken`] records when it expires so
//! callers can stop before issuing a request that is bound to fail.
//!
//! Calls are fallible and never retried here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::interaction::ActionRequest;
use crate::interaction::MessageData;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Body of a follow-up create or edit.
pub type FollowupBody = MessageData;

/// Follow-up message as returned by the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowupMessage {
    /// Message identifier.
    pub id: String,
    /// Current content.
    #[serde(default)]
    pub content: String,
    /// Channel the message lives in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

/// Callback token with its expiry.
#[derive(Clone)]
pub struct CallbackToken {
    /// Token text.
    value: String,
    /// Instant after which the token is no longer accepted.
    expires_at: Instant,
}

impl CallbackToken {
    /// Creates a token that expires `ttl` from now.
    #[must_use]
    pub fn new(value: impl Into<String>, ttl: Duration) -> Self {
        Self {
            value: value.into(),
            expires_at: Instant::now() + ttl,
        }
    }

    /// Returns the token text.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns true once the expiry instant has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

impl fmt::Debug for CallbackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Where follow-up operations for one interaction are sent.
#[derive(Debug, Clone)]
pub struct FollowupTarget {
    /// Callback URL from the action context.
    pub callback_url: String,
    /// Token bounding the follow-up window.
    pub token: CallbackToken,
}

impl FollowupTarget {
    /// Builds a target from a request's action context. The interaction
    /// token is used when present, otherwise the callback URL itself is the
    /// credential.
    #[must_use]
    pub fn from_request(request: &ActionRequest, ttl: Duration) -> Option<Self> {
        let callback_url = request.callback_url()?.to_string();
        let token = request.token.clone().unwrap_or_else(|| callback_url.clone());
        Some(Self {
            callback_url,
            token: CallbackToken::new(token, ttl),
        })
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Follow-up API failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// The request could not be delivered.
    #[error("webhook transport error: {0}")]
    Transport(String),
    /// The remote API answered with a non-success status.
    #[error("webhook returned status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },
    /// The callback URL is not usable.
    #[error("invalid callback url: {0}")]
    InvalidUrl(String),
    /// The response body was not understood.
    #[error("invalid webhook response: {0}")]
    InvalidResponse(String),
}

impl WebhookError {
    /// Returns true when the remote API rejected the callback token.
    #[must_use]
    pub const fn is_token_rejected(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403 | 404, .. })
    }
}

// ============================================================================
// SECTION: Client Trait
// ============================================================================

/// Remote follow-up message API.
#[async_trait]
pub trait WebhookClient: Send + Sync {
    /// Posts a new follow-up message.
    async fn create_followup(
        &self,
        target: &FollowupTarget,
        body: &FollowupBody,
    ) -> Result<FollowupMessage, WebhookError>;

    /// Replaces the content of a follow-up message.
    async fn edit_followup(
        &self,
        target: &FollowupTarget,
        message_id: &str,
        body: &FollowupBody,
    ) -> Result<FollowupMessage, WebhookError>;

    /// Deletes a follow-up message.
    async fn delete_followup(
        &self,
        target: &FollowupTarget,
        message_id: &str,
    ) -> Result<(), WebhookError>;
}
