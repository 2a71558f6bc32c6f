// crates/hello-action-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Integration tests for keygen, invoke, and serve failures.
// Purpose: Ensure the binary's output and exit codes are usable by scripts.
// Dependencies: hello-action-cli binary
// ============================================================================
//! ## Overview
//! Runs the `hello-action` binary as a subprocess.

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

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use hello_action_core::PrivateKey;
use hello_action_core::PublicKey;
use hello_action_core::SignatureScheme;
use serde_json::Value;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn hello_action_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_hello-action"))
}

fn keygen(scheme: &str) -> Value {
    let output = Command::new(hello_action_bin())
        .args(["keygen", "--scheme", scheme])
        .output()
        .expect("run keygen");
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).expect("keygen json")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn keygen_prints_matching_pair() {
    for (label, scheme) in [("ecdsa", SignatureScheme::Ecdsa), ("ed25519", SignatureScheme::Ed25519)] {
        let pair = keygen(label);
        assert_eq!(pair["scheme"], label);
        let public = PublicKey::parse(pair["publicKey"].as_str().unwrap()).unwrap();
        let private = PrivateKey::parse(pair["privateKey"].as_str().unwrap()).unwrap();
        assert_eq!(public.scheme(), scheme);
        assert_eq!(private.public_key(), public);
    }
}

#[test]
fn invoke_rejects_malformed_signing_key() {
    let output = Command::new(hello_action_bin())
        .args(["invoke", "--url", "http://127.0.0.1:9/hello-action", "--signing-key", "ed25519:zz"])
        .output()
        .expect("run invoke");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid signing key"));
}

#[test]
fn serve_rejects_invalid_config_before_binding() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hello-action.toml");
    fs::write(&path, "[server]\nbase_path = \"no-slash\"\n").unwrap();
    let output = Command::new(hello_action_bin())
        .arg("serve")
        .arg("--config")
        .arg(&path)
        .env_remove("HELLO_ACTION_PUBLIC_KEY")
        .output()
        .expect("run serve");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to load config"));
}
