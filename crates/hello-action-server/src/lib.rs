// crates/hello-action-server/src/lib.rs
// ============================================================================
// Module: Hello Action Server Library
// Description: HTTP surface, audit sinks, and the example hello action.
// Purpose: Serve signed interactions for the hello action.
// Dependencies: axum, hello-action-core, hello-action-config, hello-action-webhook
// ============================================================================

//! ## Overview
//! [`ActionServer`] authenticates interactions and hands them to a
//! [`DiscordAction`]. [`HelloAction`] is the bundled action; audit events go
//! to an [`ActionAuditSink`].

pub mod audit;
pub mod hello;
pub mod metadata;
pub mod server;

pub use audit::ActionAuditSink;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use hello::AccountProfiles;
pub use hello::DiscordAction;
pub use hello::HelloAction;
pub use hello::HelloSettings;
pub use metadata::ActionMetadata;
pub use server::ActionServer;
pub use server::ActionServerError;
