// crates/hello-action-core/src/signature.rs
// ============================================================================
// Module: Action Request Authentication
// Description: Signature and timestamp checks for inbound action requests.
// Purpose: Prove a request body was produced by the holder of the trusted key.
// Dependencies: crate::keys, hex, thiserror
// ============================================================================

//! ## Overview
//! Every inbound request carries a timestamp header and exactly one
//! scheme-specific signature header. The signed message is the byte-exact
//! concatenation `timestamp || body`. Header presence is checked before any
//! cryptographic work; a failed check or a scheme that differs from the
//! trusted key is reported as [`AuthError::InvalidSignature`].
//!
//! The trusted key lives in a [`TrustedKeyStore`] that is read once per
//! request, so rotation takes effect between requests without restarting.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use thiserror::Error;

use crate::keys::PrivateKey;
use crate::keys::PublicKey;
use crate::keys::SignatureScheme;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header carrying the signing timestamp.
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";
/// Header carrying a hex ECDSA signature.
pub const ECDSA_SIGNATURE_HEADER: &str = "x-signature-ecdsa";
/// Header carrying a hex Ed25519 signature.
pub const ED25519_SIGNATURE_HEADER: &str = "x-signature-ed25519";
/// Upper bound on signature header length.
const MAX_SIGNATURE_HEADER_BYTES: usize = 1024;
/// Upper bound on timestamp header length.
const MAX_TIMESTAMP_HEADER_BYTES: usize = 64;

/// Returns the signature header used by `scheme`.
#[must_use]
pub const fn signature_header(scheme: SignatureScheme) -> &'static str {
    match scheme {
        SignatureScheme::Ecdsa => ECDSA_SIGNATURE_HEADER,
        SignatureScheme::Ed25519 => ED25519_SIGNATURE_HEADER,
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Authentication failures for inbound requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// A required header is absent.
    #[error("missing header: {0}")]
    MissingHeader(&'static str),
    /// Both signature headers were supplied.
    #[error("request carries more than one signature header")]
    AmbiguousSignature,
    /// Signature failed verification or does not match the trusted scheme.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    /// Timestamp falls outside the configured freshness window.
    #[error("timestamp outside the accepted window")]
    StaleTimestamp,
}

impl AuthError {
    /// Returns a stable label for audit events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MissingHeader(_) => "missing_header",
            Self::AmbiguousSignature => "ambiguous_signature",
            Self::InvalidSignature(_) => "invalid_signature",
            Self::StaleTimestamp => "stale_timestamp",
        }
    }

    /// Returns true when the request itself was malformed (HTTP 400) rather
    /// than unauthenticated (HTTP 401).
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(self, Self::MissingHeader(_) | Self::AmbiguousSignature)
    }
}

// ============================================================================
// SECTION: Request Headers
// ============================================================================

/// Signature as declared by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclaredSignature<'a> {
    /// Scheme implied by the header the signature arrived in.
    pub scheme: SignatureScheme,
    /// Hex signature text.
    pub value: &'a str,
}

/// Raw authentication headers extracted from a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureHeaders<'a> {
    /// Timestamp header value.
    pub timestamp: Option<&'a str>,
    /// ECDSA signature header value.
    pub ecdsa: Option<&'a str>,
    /// Ed25519 signature header value.
    pub ed25519: Option<&'a str>,
}

impl<'a> SignatureHeaders<'a> {
    /// Resolves the single declared signature.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AmbiguousSignature`] when both headers are set.
    pub fn declared_signature(&self) -> Result<Option<DeclaredSignature<'a>>, AuthError> {
        match (self.ecdsa, self.ed25519) {
            (Some(_), Some(_)) => Err(AuthError::AmbiguousSignature),
            (Some(value), None) => Ok(Some(DeclaredSignature {
                scheme: SignatureScheme::Ecdsa,
                value,
            })),
            (None, Some(value)) => Ok(Some(DeclaredSignature {
                scheme: SignatureScheme::Ed25519,
                value,
            })),
            (None, None) => Ok(None),
        }
    }

    /// Checks that the timestamp and exactly one signature are present.
    ///
    /// Runs the same header checks as [`verify_signature`], in the same
    /// order, without touching the body.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingHeader`] or [`AuthError::AmbiguousSignature`].
    pub fn require_present(&self) -> Result<(), AuthError> {
        self.declared_signature()?.ok_or(AuthError::MissingHeader("signature"))?;
        self.timestamp.ok_or(AuthError::MissingHeader(TIMESTAMP_HEADER))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Verification
// ============================================================================

/// Builds the signed message: the timestamp bytes followed by the body bytes.
#[must_use]
pub fn signed_message(timestamp: &str, body: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(timestamp.len() + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(body);
    message
}

/// Verifies a request signature against `public_key`.
///
/// Header presence is checked first; no cryptographic work happens when
/// either value is absent. Timestamp freshness is not checked here.
///
/// # Errors
///
/// Returns [`AuthError::MissingHeader`] when the signature or timestamp is
/// absent, and [`AuthError::InvalidSignature`] when the declared scheme does
/// not match the key or the signature does not verify.
pub fn verify_signature(
    raw_body: &[u8],
    timestamp: Option<&str>,
    signature: Option<DeclaredSignature<'_>>,
    public_key: &PublicKey,
) -> Result<(), AuthError> {
    let signature = signature.ok_or(AuthError::MissingHeader("signature"))?;
    let timestamp = timestamp.ok_or(AuthError::MissingHeader(TIMESTAMP_HEADER))?;
    if signature.scheme != public_key.scheme() {
        return Err(AuthError::InvalidSignature(format!(
            "{} signature does not match {} key",
            signature.scheme,
            public_key.scheme()
        )));
    }
    if signature.value.len() > MAX_SIGNATURE_HEADER_BYTES
        || timestamp.len() > MAX_TIMESTAMP_HEADER_BYTES
    {
        return Err(AuthError::InvalidSignature("header too large".to_string()));
    }
    let value = signature.value.trim();
    let value = value.strip_prefix("0x").unwrap_or(value);
    let bytes = hex::decode(value)
        .map_err(|_| AuthError::InvalidSignature("signature is not hex".to_string()))?;
    if public_key.verify(&signed_message(timestamp, raw_body), &bytes) {
        Ok(())
    } else {
        Err(AuthError::InvalidSignature("signature verification failed".to_string()))
    }
}

// ============================================================================
// SECTION: Trusted Key Store
// ============================================================================

/// Holder of the currently trusted public key.
///
/// # Invariants
/// - Readers always observe a complete key; rotation swaps the whole value.
#[derive(Debug)]
pub struct TrustedKeyStore {
    /// Current key.
    current: RwLock<Arc<PublicKey>>,
}

impl TrustedKeyStore {
    /// Creates a store trusting `key`.
    #[must_use]
    pub fn new(key: PublicKey) -> Self {
        Self {
            current: RwLock::new(Arc::new(key)),
        }
    }

    /// Returns the key trusted right now.
    #[must_use]
    pub fn current(&self) -> Arc<PublicKey> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replaces the trusted key. In-flight verifications keep the key they
    /// already read.
    pub fn rotate(&self, key: PublicKey) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(key);
    }
}

/// Request verifier bound to a trusted key store.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    /// Source of the trusted key.
    keys: Arc<TrustedKeyStore>,
    /// Optional freshness window for the timestamp header.
    max_timestamp_age: Option<Duration>,
}

impl SignatureVerifier {
    /// Creates a verifier that does not check timestamp freshness.
    #[must_use]
    pub const fn new(keys: Arc<TrustedKeyStore>) -> Self {
        Self {
            keys,
            max_timestamp_age: None,
        }
    }

    /// Enables a freshness window: timestamps (milliseconds since the epoch)
    /// older or further in the future than `max_age` are rejected.
    #[must_use]
    pub const fn with_max_timestamp_age(mut self, max_age: Duration) -> Self {
        self.max_timestamp_age = Some(max_age);
        self
    }

    /// Returns the key store backing this verifier.
    #[must_use]
    pub const fn keys(&self) -> &Arc<TrustedKeyStore> {
        &self.keys
    }

    /// Verifies a request given its raw headers and body.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when the request is not authentic.
    pub fn verify_request(
        &self,
        raw_body: &[u8],
        headers: &SignatureHeaders<'_>,
    ) -> Result<SignatureScheme, AuthError> {
        let declared = headers.declared_signature()?;
        let key = self.keys.current();
        verify_signature(raw_body, headers.timestamp, declared, &key)?;
        if let (Some(max_age), Some(timestamp)) = (self.max_timestamp_age, headers.timestamp) {
            check_freshness(timestamp, max_age, SystemTime::now())?;
        }
        Ok(key.scheme())
    }
}

/// Rejects timestamps outside `max_age` of `now`.
fn check_freshness(timestamp: &str, max_age: Duration, now: SystemTime) -> Result<(), AuthError> {
    let signed_ms: u128 = timestamp.trim().parse().map_err(|_| AuthError::StaleTimestamp)?;
    let now_ms = now.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
    if signed_ms.abs_diff(now_ms) > max_age.as_millis() {
        return Err(AuthError::StaleTimestamp);
    }
    Ok(())
}

// ============================================================================
// SECTION: Signing
// ============================================================================

/// Signature produced for an outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSignature {
    /// Scheme of the signing key.
    pub scheme: SignatureScheme,
    /// Header that carries the signature.
    pub header: &'static str,
    /// Hex signature value.
    pub value: String,
}

/// Signs `timestamp || body` with `key`.
#[must_use]
pub fn sign_request(key: &PrivateKey, timestamp: &str, body: &[u8]) -> RequestSignature {
    let signature = key.sign(&signed_message(timestamp, body));
    RequestSignature {
        scheme: key.scheme(),
        header: signature_header(key.scheme()),
        value: hex::encode(signature),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
