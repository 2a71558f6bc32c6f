// crates/hello-action-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared helpers for hello-action-core tests.
// Purpose: Recording webhook client, recording observer, request builders.
// Dependencies: hello-action-core, async-trait, serde_json, tokio
// ============================================================================

//! ## Overview
//! Provides a webhook client that records every call in order and checks
//! that no two calls overlap, plus builders for interaction payloads.

#![allow(
    dead_code,
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use hello_action_core::ActionRequest;
use hello_action_core::FollowupMessage;
use hello_action_core::FollowupTarget;
use hello_action_core::LifecycleEvent;
use hello_action_core::LifecycleObserver;
use hello_action_core::WebhookClient;
use hello_action_core::WebhookError;
use hello_action_core::webhook::FollowupBody;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Recording Webhook Client
// ============================================================================

/// One observed webhook call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookCall {
    /// Follow-up creation with its content.
    Create(Option<String>),
    /// Edit of a message id with its content.
    Edit(String, Option<String>),
    /// Deletion of a message id.
    Delete(String),
}

/// Webhook client that records calls and fails on request.
#[derive(Debug, Default)]
pub struct RecordingWebhookClient {
    calls: Mutex<Vec<WebhookCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    next_id: AtomicUsize,
    fail_at: Mutex<Option<(usize, WebhookError)>>,
    call_delay: Mutex<Duration>,
}

impl RecordingWebhookClient {
    /// Creates a client that succeeds on every call.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates a client whose `index`-th call (zero-based) fails with `error`.
    pub fn failing_at(index: usize, error: WebhookError) -> Arc<Self> {
        let client = Self::default();
        *client.fail_at.lock().unwrap() = Some((index, error));
        Arc::new(client)
    }

    /// Makes every call take `delay` before answering.
    pub fn set_call_delay(&self, delay: Duration) {
        *self.call_delay.lock().unwrap() = delay;
    }

    /// Returns the recorded calls.
    pub fn calls(&self) -> Vec<WebhookCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns the highest number of overlapping calls seen.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn perform(&self, call: WebhookCall) -> Result<String, WebhookError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let delay = *self.call_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(call);
            calls.len() - 1
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let failure = self.fail_at.lock().unwrap().clone();
        if let Some((fail_index, error)) = failure {
            if fail_index == index {
                return Err(error);
            }
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("msg-{id}"))
    }
}

#[async_trait]
impl WebhookClient for RecordingWebhookClient {
    async fn create_followup(
        &self,
        _target: &FollowupTarget,
        body: &FollowupBody,
    ) -> Result<FollowupMessage, WebhookError> {
        let content = body.content.clone();
        let id = self.perform(WebhookCall::Create(content.clone())).await?;
        Ok(FollowupMessage {
            id,
            content: content.unwrap_or_default(),
            channel_id: None,
        })
    }

    async fn edit_followup(
        &self,
        _target: &FollowupTarget,
        message_id: &str,
        body: &FollowupBody,
    ) -> Result<FollowupMessage, WebhookError> {
        let content = body.content.clone();
        let id = self.perform(WebhookCall::Edit(message_id.to_string(), content.clone())).await?;
        Ok(FollowupMessage {
            id,
            content: content.unwrap_or_default(),
            channel_id: None,
        })
    }

    async fn delete_followup(
        &self,
        _target: &FollowupTarget,
        message_id: &str,
    ) -> Result<(), WebhookError> {
        self.perform(WebhookCall::Delete(message_id.to_string())).await.map(|_| ())
    }
}

// ============================================================================
// SECTION: Recording Observer
// ============================================================================

/// Observer that keeps every event.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingObserver {
    /// Creates an empty observer.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns recorded events.
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl LifecycleObserver for RecordingObserver {
    fn record(&self, event: &LifecycleEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// SECTION: Request Builders
// ============================================================================

/// Callback URL used by test requests.
pub const CALLBACK_URL: &str = "https://api.example.test/interactions/callback/1/token";

/// Builds a command interaction JSON value.
pub fn command_json(name: &str, your_name: &str) -> Value {
    json!({
        "id": "interaction-1",
        "type": 2,
        "token": "interaction-token",
        "data": {
            "name": name,
            "options": [{"name": "your-name", "type": 3, "value": your_name}]
        },
        "user": {"id": "42", "username": "tester", "discriminator": "0001"},
        "actionContext": {"callbackUrl": CALLBACK_URL}
    })
}

/// Builds a component click JSON value.
pub fn component_json(custom_id: &str, message: Option<Value>) -> Value {
    let mut value = json!({
        "id": "interaction-2",
        "type": 3,
        "data": {"custom_id": custom_id, "component_type": 2},
        "member": {"user": {"id": "99", "username": "clicker", "discriminator": "0002"}},
        "actionContext": {"callbackUrl": CALLBACK_URL, "apiToken": "granted-token"}
    });
    if let Some(message) = message {
        value["message"] = message;
    }
    value
}

/// Parses a JSON value into a request as if it had been verified.
pub fn request(value: &Value) -> ActionRequest {
    ActionRequest::from_verified_bytes(&serde_json::to_vec(value).unwrap()).unwrap()
}

/// Builds a follow-up target with the given token lifetime.
pub fn target(ttl: Duration) -> FollowupTarget {
    FollowupTarget::from_request(&request(&command_json("hello-action", "John")), ttl).unwrap()
}
