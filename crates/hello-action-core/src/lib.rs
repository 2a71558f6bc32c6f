// crates/hello-action-core/src/lib.rs
// ============================================================================
// Module: Hello Action Core Library
// Description: Trust boundary and response lifecycle for interaction actions.
// Purpose: Verify inbound interactions, route them, and drive follow-ups.
// Dependencies: async-trait, ed25519-dalek, hex, k256, serde, tokio
// ============================================================================

//! ## Overview
//! Hello Action Core holds everything an interaction action needs that does
//! not depend on a particular HTTP stack:
//! - [`keys`] and [`signature`] authenticate inbound requests.
//! - [`interaction`] models requests and immediate responses.
//! - [`router`] resolves a request to a handler by first match.
//! - [`permissions`] round-trips scope approvals through a message.
//! - [`lifecycle`] drives follow-up messages through a [`WebhookClient`].
//!
//! Invariants:
//! - Requests are parsed only after their bytes are verified.
//! - Exactly one immediate response is produced per request.
//! - Follow-up failures never reach the synchronous caller.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod interaction;
pub mod keys;
pub mod lifecycle;
pub mod permissions;
pub mod router;
pub mod signature;
pub mod webhook;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use interaction::ActionContext;
pub use interaction::ActionRequest;
pub use interaction::ActionResponse;
pub use interaction::InteractionType;
pub use interaction::MessageData;
pub use interaction::ResponseKind;
pub use interaction::User;
pub use keys::KeyError;
pub use keys::KeyPair;
pub use keys::PrivateKey;
pub use keys::PublicKey;
pub use keys::SignatureScheme;
pub use lifecycle::CountdownConfig;
pub use lifecycle::FollowupError;
pub use lifecycle::LifecycleEvent;
pub use lifecycle::LifecycleObserver;
pub use lifecycle::LifecyclePlan;
pub use lifecycle::LifecycleReport;
pub use lifecycle::LifecycleState;
pub use lifecycle::LifecycleSupervisor;
pub use lifecycle::NoopLifecycleObserver;
pub use lifecycle::ResponseLifecycle;
pub use lifecycle::TerminalStep;
pub use permissions::PermissionAction;
pub use permissions::PermissionRequest;
pub use permissions::PermissionResponse;
pub use router::InteractionPattern;
pub use router::InteractionRouter;
pub use router::RouteMatch;
pub use router::RouterError;
pub use signature::AuthError;
pub use signature::SignatureHeaders;
pub use signature::SignatureVerifier;
pub use signature::TrustedKeyStore;
pub use webhook::CallbackToken;
pub use webhook::FollowupMessage;
pub use webhook::FollowupTarget;
pub use webhook::WebhookClient;
pub use webhook::WebhookError;
