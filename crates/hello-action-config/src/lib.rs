// crates/hello-action-config/src/lib.rs
// ============================================================================
// Module: Hello Action Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for hello-action.toml semantics.
// Dependencies: hello-action-core, serde, toml
// ============================================================================

//! ## Overview
//! `hello-action-config` defines the configuration model for the Hello
//! Action server: bind address and route prefix, the trusted public key,
//! follow-up cadence, and the audit sink. Validation is strict and
//! fail-closed; malformed key material is a configuration error reported
//! at load time, never at request time.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
