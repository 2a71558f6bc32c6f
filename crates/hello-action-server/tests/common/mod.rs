// crates/hello-action-server/tests/common/mod.rs
// ============================================================================
// Module: Common Server Test Utilities
// Description: Running server harness with recording collaborators.
// Purpose: Drive the HTTP surface end to end over loopback.
// Dependencies: hello-action-server, hello-action-core, reqwest, tokio
// ============================================================================

//! ## Overview
//! Starts an [`ActionServer`] on an ephemeral port with a recording webhook
//! client, a canned profile lookup, and an in-memory audit sink.

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
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use hello_action_config::HelloActionConfig;
use hello_action_core::FollowupMessage;
use hello_action_core::FollowupTarget;
use hello_action_core::KeyPair;
use hello_action_core::SignatureScheme;
use hello_action_core::TrustedKeyStore;
use hello_action_core::WebhookClient;
use hello_action_core::WebhookError;
use hello_action_core::keys::generate;
use hello_action_core::signature::TIMESTAMP_HEADER;
use hello_action_core::signature::sign_request;
use hello_action_core::webhook::FollowupBody;
use hello_action_server::AccountProfiles;
use hello_action_server::ActionAuditSink;
use hello_action_server::ActionServer;
use hello_action_server::audit::AuthAuditEvent;
use hello_action_server::audit::LifecycleAuditEvent;
use serde_json::Value;
use serde_json::json;
use tokio::net::TcpListener;

// ============================================================================
// SECTION: Collaborators
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

/// Webhook client that records calls.
#[derive(Debug, Default)]
pub struct RecordingWebhookClient {
    calls: Mutex<Vec<WebhookCall>>,
    bodies: Mutex<Vec<FollowupBody>>,
    next_id: AtomicUsize,
}

impl RecordingWebhookClient {
    /// Returns the recorded calls.
    pub fn calls(&self) -> Vec<WebhookCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns the created follow-up bodies.
    pub fn created_bodies(&self) -> Vec<FollowupBody> {
        self.bodies.lock().unwrap().clone()
    }

    fn record(&self, call: WebhookCall) -> String {
        self.calls.lock().unwrap().push(call);
        format!("msg-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl WebhookClient for RecordingWebhookClient {
    async fn create_followup(
        &self,
        _target: &FollowupTarget,
        body: &FollowupBody,
    ) -> Result<FollowupMessage, WebhookError> {
        self.bodies.lock().unwrap().push(body.clone());
        let id = self.record(WebhookCall::Create(body.content.clone()));
        Ok(FollowupMessage {
            id,
            content: body.content.clone().unwrap_or_default(),
            channel_id: None,
        })
    }

    async fn edit_followup(
        &self,
        _target: &FollowupTarget,
        message_id: &str,
        body: &FollowupBody,
    ) -> Result<FollowupMessage, WebhookError> {
        let id = self.record(WebhookCall::Edit(message_id.to_string(), body.content.clone()));
        Ok(FollowupMessage {
            id,
            content: body.content.clone().unwrap_or_default(),
            channel_id: None,
        })
    }

    async fn delete_followup(
        &self,
        _target: &FollowupTarget,
        message_id: &str,
    ) -> Result<(), WebhookError> {
        self.record(WebhookCall::Delete(message_id.to_string()));
        Ok(())
    }
}

/// Profile lookup returning a fixed document and remembering the token.
#[derive(Debug, Default)]
pub struct CannedProfiles {
    tokens: Mutex<Vec<String>>,
    refuse: AtomicBool,
}

impl CannedProfiles {
    /// Returns the bearer tokens seen.
    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    /// Makes later lookups fail with a 403.
    pub fn refuse(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AccountProfiles for CannedProfiles {
    async fn account_profile(
        &self,
        _callback_url: &str,
        api_token: &str,
    ) -> Result<Value, WebhookError> {
        self.tokens.lock().unwrap().push(api_token.to_string());
        if self.refuse.load(Ordering::SeqCst) {
            return Err(WebhookError::Status {
                status: 403,
                message: "token revoked".to_string(),
            });
        }
        Ok(json!({"id": "99", "name": "clicker"}))
    }
}

/// Audit sink keeping events in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    auth: Mutex<Vec<AuthAuditEvent>>,
    lifecycle: Mutex<Vec<LifecycleAuditEvent>>,
}

impl MemoryAuditSink {
    /// Returns recorded auth events.
    pub fn auth(&self) -> Vec<AuthAuditEvent> {
        self.auth.lock().unwrap().clone()
    }

    /// Returns recorded lifecycle events.
    pub fn lifecycle(&self) -> Vec<LifecycleAuditEvent> {
        self.lifecycle.lock().unwrap().clone()
    }
}

impl ActionAuditSink for MemoryAuditSink {
    fn record_auth(&self, event: &AuthAuditEvent) {
        self.auth.lock().unwrap().push(event.clone());
    }

    fn record_lifecycle(&self, event: &LifecycleAuditEvent) {
        self.lifecycle.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Callback URL used by test requests.
pub const CALLBACK_URL: &str = "https://api.example.test/interactions/callback/1/token";

/// Running server plus its collaborators.
pub struct Harness {
    /// Base URL including the base path.
    pub base: String,
    /// Signing pair trusted by the server.
    pub pair: KeyPair,
    /// Trusted key holder.
    pub keys: Arc<TrustedKeyStore>,
    /// Webhook recorder.
    pub webhook: Arc<RecordingWebhookClient>,
    /// Profile lookup recorder.
    pub profiles: Arc<CannedProfiles>,
    /// Audit recorder.
    pub audit: Arc<MemoryAuditSink>,
    /// HTTP client.
    pub http: reqwest::Client,
}

/// Starts a server trusting a fresh key of `scheme`, with zero follow-up
/// delays.
pub async fn start(scheme: SignatureScheme) -> Harness {
    let pair = generate(scheme);
    let toml = format!(
        "[server]\nbind = \"127.0.0.1:0\"\nmax_body_bytes = 4096\n\n[auth]\npublic_key = \"{}\"\n\n[followup]\ninitial_delay_ms = 0\ninterval_ms = 0\ncountdown_start = 3\n",
        pair.public.to_key_string()
    );
    let config = HelloActionConfig::from_bytes(toml.as_bytes()).unwrap();
    let webhook = Arc::new(RecordingWebhookClient::default());
    let profiles = Arc::new(CannedProfiles::default());
    let audit = Arc::new(MemoryAuditSink::default());
    let client: Arc<dyn WebhookClient> = webhook.clone();
    let profile_lookup: Arc<dyn AccountProfiles> = profiles.clone();
    let sink: Arc<dyn ActionAuditSink> = audit.clone();
    let server = ActionServer::with_components(&config, client, profile_lookup, sink).unwrap();
    let keys = server.key_store();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.serve_listener(listener));
    Harness {
        base: format!("http://{addr}/hello-action"),
        pair,
        keys,
        webhook,
        profiles,
        audit,
        http: reqwest::Client::new(),
    }
}

impl Harness {
    /// Posts `body` signed with the trusted key.
    pub async fn post_signed(&self, body: &Value) -> reqwest::Response {
        let raw = serde_json::to_vec(body).unwrap();
        let timestamp = now_ms();
        let signature = sign_request(&self.pair.private, &timestamp, &raw);
        self.http
            .post(format!("{}/interactions", self.base))
            .header(TIMESTAMP_HEADER, timestamp)
            .header(signature.header, signature.value)
            .header("content-type", "application/json")
            .body(raw)
            .send()
            .await
            .unwrap()
    }

    /// Posts `body` with explicit headers.
    pub async fn post_with_headers(&self, body: &Value, headers: &[(&str, &str)]) -> reqwest::Response {
        let mut request = self
            .http
            .post(format!("{}/interactions", self.base))
            .body(serde_json::to_vec(body).unwrap());
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        request.send().await.unwrap()
    }

    /// Waits until the webhook has seen `count` calls.
    pub async fn wait_for_calls(&self, count: usize) -> Vec<WebhookCall> {
        for _ in 0..200 {
            let calls = self.webhook.calls();
            if calls.len() >= count {
                return calls;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {count} webhook calls, saw {:?}", self.webhook.calls());
    }
}

/// Current time in milliseconds as header text.
pub fn now_ms() -> String {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis().to_string()
}

/// `/hello-action your-name:<name>` command.
pub fn command_json(your_name: &str) -> Value {
    json!({
        "id": "interaction-1",
        "type": 2,
        "token": "interaction-token",
        "data": {
            "name": "hello-action",
            "options": [{"name": "your-name", "type": 3, "value": your_name}]
        },
        "user": {"id": "42", "username": "tester", "discriminator": "0001"}
    })
}

/// Same command carrying a callback context.
pub fn command_with_callback(your_name: &str) -> Value {
    let mut value = command_json(your_name);
    value["actionContext"] = json!({"callbackUrl": CALLBACK_URL});
    value
}

/// Component click carrying a callback and an api token.
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
