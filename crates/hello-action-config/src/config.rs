// crates/hello-action-config/src/config.rs
// ============================================================================
// Module: Hello Action Configuration
// Description: Configuration loading and validation for Hello Action.
// Purpose: Strict, fail-closed config parsing with hard limits.
// Dependencies: hello-action-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Unknown keys are rejected. When no path is given, the environment variable
//! [`CONFIG_ENV_VAR`] is consulted, then `hello-action.toml` in the working
//! directory; only that implicit default may be absent, in which case the
//! built-in defaults apply.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use hello_action_core::CountdownConfig;
use hello_action_core::PublicKey;
use hello_action_core::SignatureScheme;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "hello-action.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "HELLO_ACTION_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Smallest accepted request body limit.
const MIN_BODY_BYTES: usize = 1024;
/// Largest accepted request body limit.
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;
/// Largest accepted countdown.
const MAX_COUNTDOWN_START: u32 = 60;
/// Largest accepted edit interval or initial delay.
const MAX_STEP_DELAY_MS: u64 = 60_000;
/// Longest callback token lifetime the platform grants.
const MAX_TOKEN_TTL_MS: u64 = 15 * 60 * 1000;
/// Largest accepted webhook request timeout.
const MAX_REQUEST_TIMEOUT_MS: u64 = 60_000;

// ============================================================================
// SECTION: Configuration Model
// ============================================================================

/// Top-level Hello Action configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HelloActionConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Request authentication settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Follow-up lifecycle settings.
    #[serde(default)]
    pub followup: FollowupConfig,
    /// Audit sink settings.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl HelloActionConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, implicit) = resolve_path(path)?;
        validate_path(&resolved)?;
        if implicit && !resolved.exists() {
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Parses and validates configuration bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bytes are oversized, not UTF-8, not
    /// TOML, or fail validation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.auth.validate()?;
        self.followup.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Path prefix for the action routes.
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            base_path: default_base_path(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bind address is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("server.bind is invalid: {}", self.bind)))
    }

    /// Validates server settings.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        let base = self.base_path.as_str();
        if !base.is_empty() {
            if !base.starts_with('/') {
                return Err(ConfigError::Invalid("server.base_path must start with /".to_string()));
            }
            if base.ends_with('/') {
                return Err(ConfigError::Invalid(
                    "server.base_path must not end with /".to_string(),
                ));
            }
            if base.contains(['{', '}', '*', ' ']) {
                return Err(ConfigError::Invalid(
                    "server.base_path contains reserved characters".to_string(),
                ));
            }
        }
        if !(MIN_BODY_BYTES..=MAX_BODY_BYTES).contains(&self.max_body_bytes) {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be between {MIN_BODY_BYTES} and {MAX_BODY_BYTES}"
            )));
        }
        Ok(())
    }
}

/// Request authentication configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Trusted public key as `scheme:hex`; generated at startup when absent
    /// or set to a bare scheme name.
    #[serde(default)]
    pub public_key: Option<String>,
    /// Scheme used when a key pair is generated at startup.
    #[serde(default = "default_generate_scheme")]
    pub generate_scheme: String,
    /// Optional freshness window for the signature timestamp.
    #[serde(default)]
    pub max_timestamp_age_ms: Option<u64>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            public_key: None,
            generate_scheme: default_generate_scheme(),
            max_timestamp_age_ms: None,
        }
    }
}

impl AuthConfig {
    /// Returns the parsed trusted public key, if configured.
    ///
    /// A bare scheme name is a generation request, not key material, and
    /// yields `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the key material is malformed.
    pub fn public_key(&self) -> Result<Option<PublicKey>, ConfigError> {
        match self.public_key.as_deref() {
            None => Ok(None),
            Some(value) if SignatureScheme::from_label(value).is_some() => Ok(None),
            Some(value) => PublicKey::parse(value)
                .map(Some)
                .map_err(|err| ConfigError::Invalid(format!("auth.public_key: {err}"))),
        }
    }

    /// Returns the scheme to generate a key pair for at startup.
    ///
    /// `None` means key material is configured. A missing key falls back to
    /// `generate_scheme`; a bare scheme name selects that scheme.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `generate_scheme` is needed and unknown.
    pub fn scheme_to_generate(&self) -> Result<Option<SignatureScheme>, ConfigError> {
        match self.public_key.as_deref() {
            None => self.generate_scheme().map(Some),
            Some(value) => Ok(SignatureScheme::from_label(value)),
        }
    }

    /// Returns the scheme used for startup key generation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the scheme is unknown.
    pub fn generate_scheme(&self) -> Result<SignatureScheme, ConfigError> {
        SignatureScheme::from_label(&self.generate_scheme).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "auth.generate_scheme must be ecdsa or ed25519: {}",
                self.generate_scheme
            ))
        })
    }

    /// Returns the timestamp freshness window, if enabled.
    #[must_use]
    pub fn max_timestamp_age(&self) -> Option<Duration> {
        self.max_timestamp_age_ms.map(Duration::from_millis)
    }

    /// Validates auth settings.
    fn validate(&self) -> Result<(), ConfigError> {
        self.public_key()?;
        self.generate_scheme()?;
        if self.max_timestamp_age_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "auth.max_timestamp_age_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Follow-up lifecycle configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FollowupConfig {
    /// Delay before the first follow-up.
    #[serde(default = "default_step_ms")]
    pub initial_delay_ms: u64,
    /// Delay between countdown edits.
    #[serde(default = "default_step_ms")]
    pub interval_ms: u64,
    /// First countdown value.
    #[serde(default = "default_countdown_start")]
    pub countdown_start: u32,
    /// Lifetime of a callback token.
    #[serde(default = "default_token_ttl_ms")]
    pub token_ttl_ms: u64,
    /// Timeout for each webhook call.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for FollowupConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_step_ms(),
            interval_ms: default_step_ms(),
            countdown_start: default_countdown_start(),
            token_ttl_ms: default_token_ttl_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl FollowupConfig {
    /// Returns the countdown cadence.
    #[must_use]
    pub const fn countdown(&self) -> CountdownConfig {
        CountdownConfig {
            start: self.countdown_start,
            interval: Duration::from_millis(self.interval_ms),
            initial_delay: Duration::from_millis(self.initial_delay_ms),
        }
    }

    /// Returns the callback token lifetime.
    #[must_use]
    pub const fn token_ttl(&self) -> Duration {
        Duration::from_millis(self.token_ttl_ms)
    }

    /// Returns the per-call webhook timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Validates follow-up settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_COUNTDOWN_START).contains(&self.countdown_start) {
            return Err(ConfigError::Invalid(format!(
                "followup.countdown_start must be between 1 and {MAX_COUNTDOWN_START}"
            )));
        }
        if self.interval_ms > MAX_STEP_DELAY_MS || self.initial_delay_ms > MAX_STEP_DELAY_MS {
            return Err(ConfigError::Invalid(format!(
                "followup delays must not exceed {MAX_STEP_DELAY_MS} ms"
            )));
        }
        if self.token_ttl_ms == 0 || self.token_ttl_ms > MAX_TOKEN_TTL_MS {
            return Err(ConfigError::Invalid(format!(
                "followup.token_ttl_ms must be between 1 and {MAX_TOKEN_TTL_MS}"
            )));
        }
        if self.request_timeout_ms == 0 || self.request_timeout_ms > MAX_REQUEST_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "followup.request_timeout_ms must be between 1 and {MAX_REQUEST_TIMEOUT_MS}"
            )));
        }
        let steps = u64::from(self.countdown_start) + 1;
        let total = self.interval_ms.saturating_mul(steps).saturating_add(self.initial_delay_ms);
        if total > self.token_ttl_ms {
            return Err(ConfigError::Invalid(
                "followup countdown outlives followup.token_ttl_ms".to_string(),
            ));
        }
        Ok(())
    }
}

/// Audit sink configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// JSON-lines file; stderr when absent.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default bind address.
fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

/// Default route prefix.
fn default_base_path() -> String {
    "/hello-action".to_string()
}

/// Default request body limit.
const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default generation scheme.
fn default_generate_scheme() -> String {
    SignatureScheme::Ed25519.as_str().to_string()
}

/// Default step delay.
const fn default_step_ms() -> u64 {
    1000
}

/// Default countdown start.
const fn default_countdown_start() -> u32 {
    5
}

/// Default callback token lifetime.
const fn default_token_ttl_ms() -> u64 {
    MAX_TOKEN_TTL_MS
}

/// Default webhook call timeout.
const fn default_request_timeout_ms() -> u64 {
    10_000
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults. The flag is
/// true when the built-in default name was used.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), false));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), false));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), true))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}
