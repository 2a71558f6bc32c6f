// crates/hello-action-server/src/metadata.rs
// ============================================================================
// Module: Action Metadata
// Description: Manifest and command declarations served at `/metadata`.
// Purpose: Describe the action so the routing platform can install it.
// Dependencies: hello-action-core, serde
// ============================================================================

//! ## Overview
//! Metadata is static apart from the release timestamp. The supported
//! interaction list is taken from the action's router so the published
//! patterns and the dispatch table cannot drift.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use hello_action_core::InteractionPattern;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Chat-input application command type.
pub const CHAT_INPUT_COMMAND: u8 = 1;
/// String command option type.
pub const STRING_OPTION: u8 = 3;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Action metadata document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionMetadata {
    /// Mini-app manifest.
    pub manifest: Manifest,
    /// Interactions the platform should route to this action.
    pub supported_interactions: Vec<InteractionPattern>,
    /// Commands registered on installation.
    pub application_commands: Vec<ApplicationCommand>,
    /// Context fields the action expects in requests.
    pub required_context: Vec<String>,
}

/// Mini-app manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Application identifier.
    pub app_id: String,
    /// OAuth client identifier.
    pub client_id: String,
    /// Developer name.
    pub developer: String,
    /// Environments the action may be installed in.
    pub supported_envs: Vec<String>,
    /// Display name.
    pub name: String,
    /// Chat platforms.
    pub platforms: Vec<String>,
    /// Short name.
    pub short_name: String,
    /// Version.
    pub version: ManifestVersion,
    /// Developer website.
    pub website: String,
    /// Long description.
    pub description: String,
    /// Release time in seconds since the epoch.
    pub released_date: u64,
    /// Short description.
    pub short_description: String,
    /// Thumbnail URLs.
    pub thumbnails: Vec<String>,
    /// Price.
    pub price: u32,
}

/// Manifest version block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestVersion {
    /// Version name.
    pub name: String,
}

/// Application command declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationCommand {
    /// Listing metadata.
    pub metadata: CommandMetadata,
    /// Command name.
    pub name: String,
    /// Command type code.
    #[serde(rename = "type")]
    pub kind: u8,
    /// Command description.
    pub description: String,
    /// Options.
    pub options: Vec<CommandOptionSpec>,
}

/// Listing metadata for a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandMetadata {
    /// Display name.
    pub name: String,
    /// Short name.
    pub short_name: String,
    /// Environments the command is registered in.
    pub supported_envs: Vec<String>,
}

/// Command option declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOptionSpec {
    /// Option name.
    pub name: String,
    /// Option description.
    pub description: String,
    /// Option type code.
    #[serde(rename = "type")]
    pub kind: u8,
    /// Whether the option must be supplied.
    pub required: bool,
    /// Whether the option offers autocomplete.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub autocomplete: bool,
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Builds the hello action metadata around `supported_interactions`.
#[must_use]
pub fn hello_metadata(supported_interactions: Vec<InteractionPattern>) -> ActionMetadata {
    ActionMetadata {
        manifest: Manifest {
            app_id: "hello-action".to_string(),
            client_id: crate::hello::CLIENT_ID.to_string(),
            developer: "collab.land".to_string(),
            supported_envs: strings(&["qa", "test", "prod", "dev", "staging"]),
            name: "HelloAction".to_string(),
            platforms: strings(&["discord"]),
            short_name: "hello-action".to_string(),
            version: ManifestVersion {
                name: env!("CARGO_PKG_VERSION").to_string(),
            },
            website: "https://collab.land".to_string(),
            description: "An example Collab.Land action".to_string(),
            released_date: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or_default(),
            short_description: "An example Collab.Land action".to_string(),
            thumbnails: Vec::new(),
            price: 0,
        },
        supported_interactions,
        application_commands: vec![ApplicationCommand {
            metadata: CommandMetadata {
                name: "HelloAction".to_string(),
                short_name: "hello-action".to_string(),
                supported_envs: strings(&["dev", "qa", "staging"]),
            },
            name: crate::hello::COMMAND_NAME.to_string(),
            kind: CHAT_INPUT_COMMAND,
            description: "/hello-action".to_string(),
            options: vec![CommandOptionSpec {
                name: crate::hello::NAME_OPTION.to_string(),
                description: "Name of person we're greeting".to_string(),
                kind: STRING_OPTION,
                required: true,
                autocomplete: true,
            }],
        }],
        required_context: strings(&["isCommunityAdmin", "gmPassAddress", "guildName"]),
    }
}

/// Converts string slices to owned strings.
fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}
