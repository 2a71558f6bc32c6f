// crates/hello-action-server/src/server.rs
// ============================================================================
// Module: Action HTTP Server
// Description: `axum` surface for metadata and signed interactions.
// Purpose: Authenticate interactions and return immediate responses.
// Dependencies: axum, hello-action-config, hello-action-core, tokio
// ============================================================================

//! ## Overview
//! Two routes under the configured base path:
//! - `GET {base}/metadata` returns the action metadata without auth.
//! - `POST {base}/interactions` verifies `timestamp || body` against the
//!   trusted key and dispatches the interaction.
//!
//! Header presence is checked before the body is read, so missing or
//! ambiguous headers are 400 whatever the body. Oversized bodies are 413,
//! failed verification is 401. Every decision is audited. Follow-up errors
//! never reach the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::body::to_bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::CONTENT_LENGTH;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use hello_action_config::HelloActionConfig;
use hello_action_core::ActionRequest;
use hello_action_core::AuthError;
use hello_action_core::LifecycleSupervisor;
use hello_action_core::PublicKey;
use hello_action_core::SignatureVerifier;
use hello_action_core::TrustedKeyStore;
use hello_action_core::WebhookClient;
use hello_action_core::signature::ECDSA_SIGNATURE_HEADER;
use hello_action_core::signature::ED25519_SIGNATURE_HEADER;
use hello_action_core::signature::SignatureHeaders;
use hello_action_core::signature::TIMESTAMP_HEADER;
use hello_action_webhook::HttpWebhookClient;
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::audit::ActionAuditSink;
use crate::audit::AuditLifecycleObserver;
use crate::audit::AuthAuditEvent;
use crate::audit::FileAuditSink;
use crate::audit::StderrAuditSink;
use crate::hello::AccountProfiles;
use crate::hello::DiscordAction;
use crate::hello::HelloAction;
use crate::hello::HelloSettings;

// ============================================================================
// SECTION: Server
// ============================================================================

/// Action HTTP server.
pub struct ActionServer {
    /// Bind address.
    bind: SocketAddr,
    /// Route prefix.
    base_path: String,
    /// Trusted key holder shared with the verifier.
    keys: Arc<TrustedKeyStore>,
    /// Shared handler state.
    state: Arc<ServerState>,
}

/// Shared state for HTTP handlers.
struct ServerState {
    /// Action implementation.
    action: Arc<dyn DiscordAction>,
    /// Request authenticator.
    verifier: SignatureVerifier,
    /// Audit sink.
    audit: Arc<dyn ActionAuditSink>,
    /// Maximum request body size.
    max_body_bytes: usize,
}

/// Error body for rejected requests.
#[derive(Debug, Serialize)]
struct ErrorBody {
    /// Failure description.
    error: String,
}

impl ActionServer {
    /// Builds the hello action server from configuration, using the HTTP
    /// webhook client and the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ActionServerError`] when the configuration lacks a public
    /// key or a component fails to initialize.
    pub fn from_config(config: &HelloActionConfig) -> Result<Self, ActionServerError> {
        let audit: Arc<dyn ActionAuditSink> = match &config.audit.path {
            Some(path) => Arc::new(
                FileAuditSink::new(std::path::Path::new(path))
                    .map_err(|err| ActionServerError::Init(format!("audit log: {err}")))?,
            ),
            None => Arc::new(StderrAuditSink),
        };
        let client = HttpWebhookClient::new(config.followup.request_timeout())
            .map_err(|err| ActionServerError::Init(err.to_string()))?;
        Self::with_components(config, Arc::new(client.clone()), Arc::new(client), audit)
    }

    /// Builds the hello action server with injected collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`ActionServerError`] when the configuration lacks a public
    /// key or the routing table is malformed.
    pub fn with_components(
        config: &HelloActionConfig,
        client: Arc<dyn WebhookClient>,
        profiles: Arc<dyn AccountProfiles>,
        audit: Arc<dyn ActionAuditSink>,
    ) -> Result<Self, ActionServerError> {
        let supervisor =
            LifecycleSupervisor::new(Arc::new(AuditLifecycleObserver::new(Arc::clone(&audit))));
        let settings = HelloSettings {
            countdown: config.followup.countdown(),
            token_ttl: config.followup.token_ttl(),
        };
        let action = HelloAction::new(client, profiles, supervisor, settings)
            .map_err(|err| ActionServerError::Init(err.to_string()))?;
        Self::new(config, Arc::new(action), audit)
    }

    /// Builds a server for any action.
    ///
    /// # Errors
    ///
    /// Returns [`ActionServerError::Config`] when no valid public key is
    /// configured.
    pub fn new(
        config: &HelloActionConfig,
        action: Arc<dyn DiscordAction>,
        audit: Arc<dyn ActionAuditSink>,
    ) -> Result<Self, ActionServerError> {
        let bind =
            config.server.bind_addr().map_err(|err| ActionServerError::Config(err.to_string()))?;
        let public_key = config
            .auth
            .public_key()
            .map_err(|err| ActionServerError::Config(err.to_string()))?
            .ok_or_else(|| ActionServerError::Config("auth.public_key is required".to_string()))?;
        let keys = Arc::new(TrustedKeyStore::new(public_key));
        let mut verifier = SignatureVerifier::new(Arc::clone(&keys));
        if let Some(max_age) = config.auth.max_timestamp_age() {
            verifier = verifier.with_max_timestamp_age(max_age);
        }
        Ok(Self {
            bind,
            base_path: config.server.base_path.clone(),
            keys,
            state: Arc::new(ServerState {
                action,
                verifier,
                audit,
                max_body_bytes: config.server.max_body_bytes,
            }),
        })
    }

    /// Replaces the trusted public key; later requests verify against it.
    pub fn rotate_public_key(&self, key: PublicKey) {
        self.keys.rotate(key);
    }

    /// Returns the trusted key holder.
    #[must_use]
    pub fn key_store(&self) -> Arc<TrustedKeyStore> {
        Arc::clone(&self.keys)
    }

    /// Returns the configured bind address.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        self.bind
    }

    /// Builds the HTTP router.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route(&format!("{}/metadata", self.base_path), get(handle_metadata))
            .route(&format!("{}/interactions", self.base_path), post(handle_interaction))
            .with_state(Arc::clone(&self.state))
    }

    /// Binds the configured address and serves until the process exits.
    ///
    /// # Errors
    ///
    /// Returns [`ActionServerError::Transport`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ActionServerError> {
        let listener = TcpListener::bind(self.bind)
            .await
            .map_err(|_| ActionServerError::Transport("http bind failed".to_string()))?;
        self.serve_listener(listener).await
    }

    /// Serves on an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`ActionServerError::Transport`] when serving fails.
    pub async fn serve_listener(self, listener: TcpListener) -> Result<(), ActionServerError> {
        let app = self.router();
        axum::serve(listener, app)
            .await
            .map_err(|_| ActionServerError::Transport("http server failed".to_string()))
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// `GET {base}/metadata`.
async fn handle_metadata(State(state): State<Arc<ServerState>>) -> Response {
    (StatusCode::OK, Json(state.action.metadata())).into_response()
}

/// `POST {base}/interactions`.
async fn handle_interaction(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let signature_headers = SignatureHeaders {
        timestamp: header_value(&headers, TIMESTAMP_HEADER),
        ecdsa: header_value(&headers, ECDSA_SIGNATURE_HEADER),
        ed25519: header_value(&headers, ED25519_SIGNATURE_HEADER),
    };
    let declared_len = declared_length(&headers);
    if let Err(err) = signature_headers.require_present() {
        return reject_auth(&state, &err, declared_len);
    }
    if declared_len > state.max_body_bytes {
        return reject_oversized(&state, declared_len);
    }
    // Read errors are limit overruns; a client that aborts mid-body never
    // sees the response.
    let Ok(bytes) = to_bytes(body, state.max_body_bytes).await else {
        return reject_oversized(&state, state.max_body_bytes.saturating_add(1));
    };
    let scheme = match state.verifier.verify_request(&bytes, &signature_headers) {
        Ok(scheme) => scheme,
        Err(err) => return reject_auth(&state, &err, bytes.len()),
    };
    let Ok(request) = ActionRequest::from_verified_bytes(&bytes) else {
        state.audit.record_auth(&AuthAuditEvent::deny("invalid_payload", 400, bytes.len()));
        return error_response(StatusCode::BAD_REQUEST, "invalid interaction payload");
    };
    state.audit.record_auth(&AuthAuditEvent::allow(scheme.as_str(), request.id.clone(), bytes.len()));
    (StatusCode::OK, Json(state.action.handle(&request))).into_response()
}

/// Audits and rejects an authentication failure.
fn reject_auth(state: &ServerState, err: &AuthError, request_bytes: usize) -> Response {
    let status = if err.is_malformed() { StatusCode::BAD_REQUEST } else { StatusCode::UNAUTHORIZED };
    state.audit.record_auth(&AuthAuditEvent::deny(err.kind(), status.as_u16(), request_bytes));
    error_response(status, &err.to_string())
}

/// Audits and rejects a body over the configured limit.
fn reject_oversized(state: &ServerState, request_bytes: usize) -> Response {
    state.audit.record_auth(&AuthAuditEvent::deny("body_too_large", 413, request_bytes));
    error_response(StatusCode::PAYLOAD_TOO_LARGE, "request body too large")
}

/// Returns the declared `Content-Length`, or zero when absent or unreadable.
fn declared_length(headers: &HeaderMap) -> usize {
    header_value(headers, CONTENT_LENGTH.as_str())
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Returns a header as UTF-8 text; unreadable values count as absent.
fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Builds a JSON error response.
fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Action server errors.
#[derive(Debug, Error)]
pub enum ActionServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}
