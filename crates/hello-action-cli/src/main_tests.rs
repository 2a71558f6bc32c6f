// crates/hello-action-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for serve key bootstrap and the mocked command.
// Purpose: Ensure key precedence and generation happen before startup.
// Dependencies: hello-action-cli main helpers
// ============================================================================

//! ## Overview
//! Validates `install_public_key` precedence and generation rules.

#![allow(
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

// ============================================================================
// SECTION: Imports
// ============================================================================

use hello_action_config::HelloActionConfig;
use hello_action_core::ActionRequest;
use hello_action_core::PublicKey;
use hello_action_core::SignatureScheme;
use hello_action_core::keys::generate;

use super::install_public_key;
use super::mock_command;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn config(toml: &str) -> HelloActionConfig {
    HelloActionConfig::from_bytes(toml.as_bytes()).unwrap()
}

fn installed_key(config: &HelloActionConfig) -> PublicKey {
    config.auth.public_key().unwrap().expect("public key installed")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn no_key_generates_with_configured_scheme() {
    let mut config = config("[auth]\ngenerate_scheme = \"ecdsa\"\n");
    let private = install_public_key(&mut config, None).unwrap().expect("generated key");
    assert_eq!(private.scheme(), SignatureScheme::Ecdsa);
    assert_eq!(installed_key(&config), private.public_key());
}

#[test]
fn bare_scheme_name_generates_that_scheme() {
    let mut config = config("");
    let private = install_public_key(&mut config, Some("ED25519".to_string())).unwrap().unwrap();
    assert_eq!(private.scheme(), SignatureScheme::Ed25519);
    assert_eq!(installed_key(&config), private.public_key());
}

#[test]
fn configured_scheme_name_generates_that_scheme() {
    let mut config = config("[auth]\npublic_key = \"ecdsa\"\ngenerate_scheme = \"ed25519\"\n");
    let private = install_public_key(&mut config, None).unwrap().expect("generated key");
    assert_eq!(private.scheme(), SignatureScheme::Ecdsa);
    assert_eq!(installed_key(&config), private.public_key());
}

#[test]
fn requested_key_overrides_config() {
    let configured = generate(SignatureScheme::Ed25519);
    let requested = generate(SignatureScheme::Ecdsa);
    let mut config =
        config(&format!("[auth]\npublic_key = \"{}\"\n", configured.public.to_key_string()));
    let generated =
        install_public_key(&mut config, Some(requested.public.to_key_string())).unwrap();
    assert!(generated.is_none());
    assert_eq!(installed_key(&config), requested.public);
}

#[test]
fn configured_key_is_kept_without_request() {
    let configured = generate(SignatureScheme::Ed25519);
    let mut config =
        config(&format!("[auth]\npublic_key = \"{}\"\n", configured.public.to_key_string()));
    assert!(install_public_key(&mut config, Some("  ".to_string())).unwrap().is_none());
    assert_eq!(installed_key(&config), configured.public);
}

#[test]
fn malformed_requested_key_is_rejected() {
    let mut config = config("");
    let err = install_public_key(&mut config, Some("rsa:abcd".to_string())).unwrap_err();
    assert!(err.to_string().contains("invalid public key"));
}

#[test]
fn mock_command_is_a_hello_action_command() {
    let body = serde_json::to_vec(&mock_command("John", 7)).unwrap();
    let request = ActionRequest::from_verified_bytes(&body).unwrap();
    assert_eq!(request.command_name(), Some("hello-action"));
    assert_eq!(request.option_str("your-name"), Some("John"));
    assert_eq!(request.id, "cli-7");
}
