// crates/hello-action-core/src/keys.rs
// ============================================================================
// Module: Action Signing Keys
// Description: ECDSA (secp256k1) and Ed25519 key pairs for action requests.
// Purpose: Generate, parse, and serialize `scheme:hex` key strings.
// Dependencies: ed25519-dalek, hex, k256, rand, sha2
// ============================================================================

//! ## Overview
//! Action requests are signed by the calling platform with one of two schemes.
//! Keys travel through configuration as `"<scheme>:<hex>"` strings. A string
//! without a recognized scheme prefix is parsed as ECDSA; this keeps older
//! configuration values working and is not extended to other schemes.
//!
//! Public and private keys are always produced together by [`generate`]; a
//! public key is never derived on its own from configuration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::Signer as _;
use k256::ecdsa::signature::DigestSigner as _;
use k256::ecdsa::signature::DigestVerifier as _;
use rand::rngs::OsRng;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest as _;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Length of a compressed SEC1 secp256k1 public key.
const ECDSA_COMPRESSED_PUBLIC_LEN: usize = 33;
/// Length of an uncompressed SEC1 secp256k1 public key.
const ECDSA_UNCOMPRESSED_PUBLIC_LEN: usize = 65;
/// Length of a secp256k1 private scalar.
const ECDSA_PRIVATE_LEN: usize = 32;
/// Length of a compact `r || s` ECDSA signature.
const ECDSA_SIGNATURE_LEN: usize = 64;
/// Length of an Ed25519 public key.
const ED25519_PUBLIC_LEN: usize = 32;
/// Length of an Ed25519 seed.
const ED25519_SEED_LEN: usize = 32;
/// Length of an Ed25519 `seed || public` keypair encoding.
const ED25519_KEYPAIR_LEN: usize = 64;

// ============================================================================
// SECTION: Signature Scheme
// ============================================================================

/// Signature schemes accepted on action requests.
///
/// # Invariants
/// - Labels are stable; they appear in key strings and audit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureScheme {
    /// ECDSA over secp256k1 with a SHA-256 message digest.
    Ecdsa,
    /// Ed25519.
    Ed25519,
}

impl SignatureScheme {
    /// Returns the stable label used in key strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ecdsa => "ecdsa",
            Self::Ed25519 => "ed25519",
        }
    }

    /// Parses a scheme label, ignoring ASCII case.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        if label.eq_ignore_ascii_case("ecdsa") {
            Some(Self::Ecdsa)
        } else if label.eq_ignore_ascii_case("ed25519") {
            Some(Self::Ed25519)
        } else {
            None
        }
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureScheme {
    type Err = KeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_label(value.trim()).ok_or_else(|| KeyError::UnsupportedScheme(value.to_string()))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Key material errors.
///
/// These are configuration errors: they surface when keys are loaded, never
/// as a per-request verification outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// Scheme label is not `ecdsa` or `ed25519`.
    #[error("unsupported signature scheme: {0}")]
    UnsupportedScheme(String),
    /// Key string carried no material.
    #[error("key material is empty")]
    Empty,
    /// Key material is not hex.
    #[error("{scheme} key material is not valid hex")]
    InvalidHex {
        /// Scheme the material was parsed for.
        scheme: SignatureScheme,
    },
    /// Key material length does not fit the declared scheme.
    #[error("{scheme} {role} key has {actual} bytes, expected {expected}")]
    Length {
        /// Scheme the material was parsed for.
        scheme: SignatureScheme,
        /// Key role (`public` or `private`).
        role: &'static str,
        /// Accepted lengths.
        expected: &'static str,
        /// Decoded length.
        actual: usize,
    },
    /// Key material has the right length but is not a valid key.
    #[error("invalid {scheme} {role} key")]
    Invalid {
        /// Scheme the material was parsed for.
        scheme: SignatureScheme,
        /// Key role (`public` or `private`).
        role: &'static str,
    },
}

// ============================================================================
// SECTION: Public Keys
// ============================================================================

/// Trusted public key used to verify action requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    /// secp256k1 verifying key.
    Ecdsa(k256::ecdsa::VerifyingKey),
    /// Ed25519 verifying key.
    Ed25519(ed25519_dalek::VerifyingKey),
}

impl PublicKey {
    /// Parses a `scheme:hex` public key string.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] when the material is malformed or its length does
    /// not match the scheme.
    pub fn parse(serialized: &str) -> Result<Self, KeyError> {
        let (scheme, material) = split_scheme(serialized);
        let bytes = decode_material(scheme, material)?;
        match scheme {
            SignatureScheme::Ecdsa => {
                if bytes.len() != ECDSA_COMPRESSED_PUBLIC_LEN
                    && bytes.len() != ECDSA_UNCOMPRESSED_PUBLIC_LEN
                {
                    return Err(KeyError::Length {
                        scheme,
                        role: "public",
                        expected: "33 or 65",
                        actual: bytes.len(),
                    });
                }
                k256::ecdsa::VerifyingKey::from_sec1_bytes(&bytes).map(Self::Ecdsa).map_err(|_| {
                    KeyError::Invalid {
                        scheme,
                        role: "public",
                    }
                })
            }
            SignatureScheme::Ed25519 => {
                let key: [u8; ED25519_PUBLIC_LEN] =
                    bytes.as_slice().try_into().map_err(|_| KeyError::Length {
                        scheme,
                        role: "public",
                        expected: "32",
                        actual: bytes.len(),
                    })?;
                ed25519_dalek::VerifyingKey::from_bytes(&key).map(Self::Ed25519).map_err(|_| {
                    KeyError::Invalid {
                        scheme,
                        role: "public",
                    }
                })
            }
        }
    }

    /// Returns the scheme of this key.
    #[must_use]
    pub const fn scheme(&self) -> SignatureScheme {
        match self {
            Self::Ecdsa(_) => SignatureScheme::Ecdsa,
            Self::Ed25519(_) => SignatureScheme::Ed25519,
        }
    }

    /// Returns the hex-encoded key material without the scheme prefix.
    #[must_use]
    pub fn to_hex(&self) -> String {
        match self {
            Self::Ecdsa(key) => hex::encode(key.to_encoded_point(true).as_bytes()),
            Self::Ed25519(key) => hex::encode(key.as_bytes()),
        }
    }

    /// Returns the `scheme:hex` serialized form.
    #[must_use]
    pub fn to_key_string(&self) -> String {
        format!("{}:{}", self.scheme(), self.to_hex())
    }

    /// Checks `signature` over `message`.
    ///
    /// ECDSA verification hashes `message` with SHA-256 and checks the
    /// compact signature against this key; the key is never recovered from
    /// the signature. Ed25519 uses strict verification.
    #[must_use]
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match self {
            Self::Ecdsa(key) => {
                let compact = match signature.len() {
                    ECDSA_SIGNATURE_LEN => signature,
                    // Trailing recovery byte from wallet-style signers.
                    65 => &signature[..ECDSA_SIGNATURE_LEN],
                    _ => return false,
                };
                let Ok(signature) = k256::ecdsa::Signature::from_slice(compact) else {
                    return false;
                };
                key.verify_digest(Sha256::new_with_prefix(message), &signature).is_ok()
            }
            Self::Ed25519(key) => {
                let Ok(signature) = ed25519_dalek::Signature::try_from(signature) else {
                    return false;
                };
                key.verify_strict(message, &signature).is_ok()
            }
        }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_key_string())
    }
}

// ============================================================================
// SECTION: Private Keys
// ============================================================================

/// Private signing key held by the caller of an action.
#[derive(Clone)]
pub enum PrivateKey {
    /// secp256k1 signing key.
    Ecdsa(k256::ecdsa::SigningKey),
    /// Ed25519 signing key.
    Ed25519(ed25519_dalek::SigningKey),
}

impl PrivateKey {
    /// Parses a `scheme:hex` private key string.
    ///
    /// Ed25519 accepts either the 32-byte seed or the 64-byte `seed || public`
    /// encoding; in the latter case the public half must match the seed.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] when the material is malformed.
    pub fn parse(serialized: &str) -> Result<Self, KeyError> {
        let (scheme, material) = split_scheme(serialized);
        let bytes = decode_material(scheme, material)?;
        match scheme {
            SignatureScheme::Ecdsa => {
                if bytes.len() != ECDSA_PRIVATE_LEN {
                    return Err(KeyError::Length {
                        scheme,
                        role: "private",
                        expected: "32",
                        actual: bytes.len(),
                    });
                }
                k256::ecdsa::SigningKey::from_slice(&bytes).map(Self::Ecdsa).map_err(|_| {
                    KeyError::Invalid {
                        scheme,
                        role: "private",
                    }
                })
            }
            SignatureScheme::Ed25519 => parse_ed25519_private(&bytes).map(Self::Ed25519),
        }
    }

    /// Returns the scheme of this key.
    #[must_use]
    pub const fn scheme(&self) -> SignatureScheme {
        match self {
            Self::Ecdsa(_) => SignatureScheme::Ecdsa,
            Self::Ed25519(_) => SignatureScheme::Ed25519,
        }
    }

    /// Returns the public key paired with this private key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        match self {
            Self::Ecdsa(key) => PublicKey::Ecdsa(*key.verifying_key()),
            Self::Ed25519(key) => PublicKey::Ed25519(key.verifying_key()),
        }
    }

    /// Returns the `scheme:hex` serialized form.
    #[must_use]
    pub fn to_key_string(&self) -> String {
        let material = match self {
            Self::Ecdsa(key) => hex::encode(key.to_bytes()),
            Self::Ed25519(key) => hex::encode(key.to_bytes()),
        };
        format!("{}:{material}", self.scheme())
    }

    /// Signs `message`, returning raw signature bytes.
    ///
    /// ECDSA signatures are compact `r || s` over the SHA-256 digest.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        match self {
            Self::Ecdsa(key) => {
                let signature: k256::ecdsa::Signature =
                    key.sign_digest(Sha256::new_with_prefix(message));
                signature.to_bytes().to_vec()
            }
            Self::Ed25519(key) => key.sign(message).to_bytes().to_vec(),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey").field("scheme", &self.scheme()).finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Key Pairs
// ============================================================================

/// Freshly generated key pair.
///
/// # Invariants
/// - `public` is always the key paired with `private`.
#[derive(Debug, Clone)]
pub struct KeyPair {
    /// Public verification key.
    pub public: PublicKey,
    /// Private signing key.
    pub private: PrivateKey,
}

/// Generates a random key pair for `scheme` from the OS RNG.
#[must_use]
pub fn generate(scheme: SignatureScheme) -> KeyPair {
    let private = match scheme {
        SignatureScheme::Ecdsa => PrivateKey::Ecdsa(k256::ecdsa::SigningKey::random(&mut OsRng)),
        SignatureScheme::Ed25519 => {
            let mut seed = [0u8; ED25519_SEED_LEN];
            rand::RngCore::fill_bytes(&mut OsRng, &mut seed);
            PrivateKey::Ed25519(ed25519_dalek::SigningKey::from_bytes(&seed))
        }
    };
    KeyPair {
        public: private.public_key(),
        private,
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Splits a key string into its scheme and material.
///
/// Unprefixed values default to ECDSA.
fn split_scheme(serialized: &str) -> (SignatureScheme, &str) {
    let trimmed = serialized.trim();
    if let Some((label, material)) = trimmed.split_once(':') {
        if let Some(scheme) = SignatureScheme::from_label(label) {
            return (scheme, material.trim());
        }
    }
    (SignatureScheme::Ecdsa, trimmed)
}

/// Decodes hex key material, accepting an optional `0x` prefix.
fn decode_material(scheme: SignatureScheme, material: &str) -> Result<Vec<u8>, KeyError> {
    let hex_text = material
        .strip_prefix("0x")
        .or_else(|| material.strip_prefix("0X"))
        .unwrap_or(material);
    if hex_text.is_empty() {
        return Err(KeyError::Empty);
    }
    hex::decode(hex_text).map_err(|_| KeyError::InvalidHex {
        scheme,
    })
}

/// Parses Ed25519 private material in seed or keypair form.
fn parse_ed25519_private(bytes: &[u8]) -> Result<ed25519_dalek::SigningKey, KeyError> {
    let scheme = SignatureScheme::Ed25519;
    match bytes.len() {
        ED25519_SEED_LEN => {
            let mut seed = [0u8; ED25519_SEED_LEN];
            seed.copy_from_slice(bytes);
            Ok(ed25519_dalek::SigningKey::from_bytes(&seed))
        }
        ED25519_KEYPAIR_LEN => {
            let mut seed = [0u8; ED25519_SEED_LEN];
            seed.copy_from_slice(&bytes[..ED25519_SEED_LEN]);
            let key = ed25519_dalek::SigningKey::from_bytes(&seed);
            if key.verifying_key().as_bytes() != &bytes[ED25519_SEED_LEN..] {
                return Err(KeyError::Invalid {
                    scheme,
                    role: "private",
                });
            }
            Ok(key)
        }
        actual => Err(KeyError::Length {
            scheme,
            role: "private",
            expected: "32 or 64",
            actual,
        }),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
