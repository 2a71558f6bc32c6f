// crates/hello-action-core/tests/signature.rs
// ============================================================================
// Module: Signature Verification Tests
// Description: Authentication of signed interaction requests.
// Purpose: Cover header checks, both schemes, rotation, and bit flips.
// Dependencies: hello-action-core, proptest
// ============================================================================
//! ## Overview
//! Validates request signing and verification for ECDSA and Ed25519 keys.

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

use std::sync::Arc;
use std::time::Duration;

use hello_action_core::AuthError;
use hello_action_core::PublicKey;
use hello_action_core::SignatureHeaders;
use hello_action_core::SignatureScheme;
use hello_action_core::SignatureVerifier;
use hello_action_core::TrustedKeyStore;
use hello_action_core::keys::generate;
use hello_action_core::signature::DeclaredSignature;
use hello_action_core::signature::ED25519_SIGNATURE_HEADER;
use hello_action_core::signature::sign_request;
use hello_action_core::signature::verify_signature;
use proptest::prelude::*;

const BODY: &[u8] = br#"{"name":"your-name","value":"John"}"#;
const TIMESTAMP: &str = "1700000000000";

fn headers<'a>(timestamp: Option<&'a str>, scheme: SignatureScheme, value: &'a str) -> SignatureHeaders<'a> {
    match scheme {
        SignatureScheme::Ecdsa => SignatureHeaders {
            timestamp,
            ecdsa: Some(value),
            ed25519: None,
        },
        SignatureScheme::Ed25519 => SignatureHeaders {
            timestamp,
            ecdsa: None,
            ed25519: Some(value),
        },
    }
}

fn verifier(key: PublicKey) -> SignatureVerifier {
    SignatureVerifier::new(Arc::new(TrustedKeyStore::new(key)))
}

#[test]
fn valid_signatures_verify_for_both_schemes() {
    for scheme in [SignatureScheme::Ecdsa, SignatureScheme::Ed25519] {
        let pair = generate(scheme);
        let signature = sign_request(&pair.private, TIMESTAMP, BODY);
        let verifier = verifier(pair.public.clone());
        let verified = verifier
            .verify_request(BODY, &headers(Some(TIMESTAMP), scheme, &signature.value))
            .unwrap();
        assert_eq!(verified, scheme);
    }
}

#[test]
fn ed25519_signature_uses_ed25519_header() {
    let pair = generate(SignatureScheme::Ed25519);
    let signature = sign_request(&pair.private, TIMESTAMP, BODY);
    assert_eq!(signature.header, ED25519_SIGNATURE_HEADER);
    assert_eq!(signature.value.len(), 128);
}

#[test]
fn missing_headers_fail_before_crypto() {
    let pair = generate(SignatureScheme::Ecdsa);
    let key = pair.public;
    let err = verify_signature(BODY, Some(TIMESTAMP), None, &key).unwrap_err();
    assert!(matches!(err, AuthError::MissingHeader(_)));
    let declared = DeclaredSignature {
        scheme: SignatureScheme::Ecdsa,
        value: "not even hex",
    };
    let err = verify_signature(BODY, None, Some(declared), &key).unwrap_err();
    assert_eq!(err, AuthError::MissingHeader("x-signature-timestamp"));
    assert!(err.is_malformed());
}

#[test]
fn presence_check_matches_verification_order() {
    let present = headers(Some(TIMESTAMP), SignatureScheme::Ecdsa, "dummy-signature");
    assert!(present.require_present().is_ok());
    let no_timestamp = headers(None, SignatureScheme::Ed25519, "dummy-signature");
    assert_eq!(
        no_timestamp.require_present().unwrap_err(),
        AuthError::MissingHeader("x-signature-timestamp")
    );
    let no_signature = SignatureHeaders {
        timestamp: None,
        ecdsa: None,
        ed25519: None,
    };
    assert_eq!(no_signature.require_present().unwrap_err(), AuthError::MissingHeader("signature"));
    let both = SignatureHeaders {
        timestamp: Some(TIMESTAMP),
        ecdsa: Some("aa"),
        ed25519: Some("bb"),
    };
    assert_eq!(both.require_present().unwrap_err(), AuthError::AmbiguousSignature);
}

#[test]
fn dummy_signature_is_invalid() {
    let pair = generate(SignatureScheme::Ecdsa);
    let err = verifier(pair.public)
        .verify_request(BODY, &headers(Some(TIMESTAMP), SignatureScheme::Ecdsa, "dummy-signature"))
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidSignature(_)));
    assert!(!err.is_malformed());
}

#[test]
fn scheme_mismatch_is_invalid_signature() {
    let ecdsa = generate(SignatureScheme::Ecdsa);
    let ed25519 = generate(SignatureScheme::Ed25519);
    let signature = sign_request(&ed25519.private, TIMESTAMP, BODY);
    let err = verifier(ecdsa.public)
        .verify_request(BODY, &headers(Some(TIMESTAMP), SignatureScheme::Ed25519, &signature.value))
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidSignature(_)));
}

#[test]
fn both_signature_headers_are_ambiguous() {
    let pair = generate(SignatureScheme::Ed25519);
    let signature = sign_request(&pair.private, TIMESTAMP, BODY);
    let headers = SignatureHeaders {
        timestamp: Some(TIMESTAMP),
        ecdsa: Some(&signature.value),
        ed25519: Some(&signature.value),
    };
    let err = verifier(pair.public).verify_request(BODY, &headers).unwrap_err();
    assert_eq!(err, AuthError::AmbiguousSignature);
}

#[test]
fn timestamp_is_part_of_the_signed_message() {
    let pair = generate(SignatureScheme::Ed25519);
    let signature = sign_request(&pair.private, TIMESTAMP, BODY);
    let err = verifier(pair.public)
        .verify_request(BODY, &headers(Some("1700000000001"), SignatureScheme::Ed25519, &signature.value))
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidSignature(_)));
}

#[test]
fn rotation_applies_to_the_next_request() {
    let old = generate(SignatureScheme::Ecdsa);
    let new = generate(SignatureScheme::Ed25519);
    let store = Arc::new(TrustedKeyStore::new(old.public.clone()));
    let verifier = SignatureVerifier::new(Arc::clone(&store));
    let old_signature = sign_request(&old.private, TIMESTAMP, BODY);
    verifier
        .verify_request(BODY, &headers(Some(TIMESTAMP), SignatureScheme::Ecdsa, &old_signature.value))
        .unwrap();

    store.rotate(new.public.clone());
    assert!(
        verifier
            .verify_request(BODY, &headers(Some(TIMESTAMP), SignatureScheme::Ecdsa, &old_signature.value))
            .is_err()
    );
    let new_signature = sign_request(&new.private, TIMESTAMP, BODY);
    verifier
        .verify_request(BODY, &headers(Some(TIMESTAMP), SignatureScheme::Ed25519, &new_signature.value))
        .unwrap();
}

#[test]
fn freshness_window_rejects_old_timestamps() {
    let pair = generate(SignatureScheme::Ed25519);
    let signature = sign_request(&pair.private, "1000", BODY);
    let verifier = verifier(pair.public).with_max_timestamp_age(Duration::from_secs(300));
    let err = verifier
        .verify_request(BODY, &headers(Some("1000"), SignatureScheme::Ed25519, &signature.value))
        .unwrap_err();
    assert_eq!(err, AuthError::StaleTimestamp);
}

#[test]
fn ecdsa_signature_with_recovery_byte_is_accepted() {
    let pair = generate(SignatureScheme::Ecdsa);
    let signature = sign_request(&pair.private, TIMESTAMP, BODY);
    let with_recovery = format!("{}1b", signature.value);
    verifier(pair.public)
        .verify_request(BODY, &headers(Some(TIMESTAMP), SignatureScheme::Ecdsa, &with_recovery))
        .unwrap();
}

fn flip_bit(bytes: &mut [u8], bit: usize) {
    let index = (bit / 8) % bytes.len();
    bytes[index] ^= 1 << (bit % 8);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn flipping_any_body_bit_breaks_verification(bit in 0usize..(BODY.len() * 8), ed in any::<bool>()) {
        let scheme = if ed { SignatureScheme::Ed25519 } else { SignatureScheme::Ecdsa };
        let pair = generate(scheme);
        let signature = sign_request(&pair.private, TIMESTAMP, BODY);
        let mut body = BODY.to_vec();
        flip_bit(&mut body, bit);
        let result = verifier(pair.public).verify_request(&body, &headers(Some(TIMESTAMP), scheme, &signature.value));
        prop_assert!(matches!(result, Err(AuthError::InvalidSignature(_))));
    }

    #[test]
    fn flipping_any_signature_bit_breaks_verification(bit in 0usize..512, ed in any::<bool>()) {
        let scheme = if ed { SignatureScheme::Ed25519 } else { SignatureScheme::Ecdsa };
        let pair = generate(scheme);
        let signature = sign_request(&pair.private, TIMESTAMP, BODY);
        let mut bytes = hex::decode(&signature.value).unwrap();
        flip_bit(&mut bytes, bit);
        let tampered = hex::encode(bytes);
        let result = verifier(pair.public).verify_request(BODY, &headers(Some(TIMESTAMP), scheme, &tampered));
        prop_assert!(matches!(result, Err(AuthError::InvalidSignature(_))));
    }
}
