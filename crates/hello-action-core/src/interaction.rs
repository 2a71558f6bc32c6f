// crates/hello-action-core/src/interaction.rs
// ============================================================================
// Module: Interaction Model
// Description: Inbound action requests and immediate action responses.
// Purpose: Typed wire model for interactions routed to an action.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! An [`ActionRequest`] is the verified inbound event; it is built from the
//! exact bytes that passed signature verification and is never mutated
//! afterwards. An [`ActionResponse`] is the single immediate reply.
//!
//! Type codes follow the platform's numeric encoding and are serialized as
//! integers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::Error as _;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Message flag marking a response visible only to the invoking user.
pub const EPHEMERAL: u64 = 64;
/// Component type code for an action row.
pub const ACTION_ROW: u8 = 1;
/// Component type code for a button.
pub const BUTTON: u8 = 2;
/// Maximum number of autocomplete choices accepted by the platform.
pub const MAX_AUTOCOMPLETE_CHOICES: usize = 25;

/// Button styles.
pub mod button_style {
    /// Blurple call-to-action button.
    pub const PRIMARY: u8 = 1;
    /// Grey button.
    pub const SECONDARY: u8 = 2;
    /// Green button.
    pub const SUCCESS: u8 = 3;
    /// Red button.
    pub const DANGER: u8 = 4;
    /// Button that opens a URL.
    pub const LINK: u8 = 5;
}

// ============================================================================
// SECTION: Interaction Types
// ============================================================================

/// Inbound interaction kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionType {
    /// Liveness check from the platform.
    Ping,
    /// Slash command invocation.
    ApplicationCommand,
    /// Button or select-menu click.
    MessageComponent,
    /// Autocomplete request for a command option.
    ApplicationCommandAutocomplete,
    /// Modal form submission.
    ModalSubmit,
}

impl InteractionType {
    /// Returns the numeric wire code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Ping => 1,
            Self::ApplicationCommand => 2,
            Self::MessageComponent => 3,
            Self::ApplicationCommandAutocomplete => 4,
            Self::ModalSubmit => 5,
        }
    }

    /// Parses a numeric wire code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Ping),
            2 => Some(Self::ApplicationCommand),
            3 => Some(Self::MessageComponent),
            4 => Some(Self::ApplicationCommandAutocomplete),
            5 => Some(Self::ModalSubmit),
            _ => None,
        }
    }

    /// Returns true when patterns for this type match on command names.
    #[must_use]
    pub const fn matches_by_name(self) -> bool {
        matches!(self, Self::ApplicationCommand | Self::ApplicationCommandAutocomplete)
    }

    /// Returns true when patterns for this type match on custom ids.
    #[must_use]
    pub const fn matches_by_id(self) -> bool {
        matches!(self, Self::MessageComponent | Self::ModalSubmit)
    }
}

impl Serialize for InteractionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for InteractionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u8::deserialize(deserializer)?;
        Self::from_code(code)
            .ok_or_else(|| D::Error::custom(format!("unknown interaction type {code}")))
    }
}

// ============================================================================
// SECTION: Request Model
// ============================================================================

/// Platform user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier.
    pub id: String,
    /// Account username.
    #[serde(default)]
    pub username: String,
    /// Legacy discriminator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,
}

impl User {
    /// Returns `username#discriminator`, or the bare username when the
    /// discriminator is absent.
    #[must_use]
    pub fn tag(&self) -> String {
        match &self.discriminator {
            Some(discriminator) => format!("{}#{discriminator}", self.username),
            None => self.username.clone(),
        }
    }
}

/// Guild member wrapper around a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Underlying user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// Guild nickname.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
}

/// Action context attached by the routing platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionContext {
    /// Webhook URL for follow-up messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    /// Bearer token granted after a permission approval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

/// Command option, possibly nested for subcommands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandOption {
    /// Option name.
    pub name: String,
    /// Option type code.
    #[serde(rename = "type", default)]
    pub kind: u8,
    /// Option value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Nested options (subcommands and groups).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Self>,
    /// Set on the option being typed during autocomplete.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub focused: bool,
}

/// Interaction payload data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionData {
    /// Command identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Command name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Command type code.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<u8>,
    /// Command options.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
    /// Component or modal custom id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    /// Component type code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<u8>,
    /// Select-menu values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

/// Message a component belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionMessage {
    /// Message identifier.
    pub id: String,
    /// Message text.
    #[serde(default)]
    pub content: String,
    /// Message embeds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

/// Verified inbound interaction.
///
/// # Invariants
/// - Built only from bytes that passed signature verification.
/// - `raw` holds those exact bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Interaction identifier.
    pub id: String,
    /// Interaction type.
    #[serde(rename = "type")]
    pub kind: InteractionType,
    /// Application identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    /// Interaction token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Interaction data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<InteractionData>,
    /// Invoking member (guild context).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<Member>,
    /// Invoking user (direct-message context).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// Guild identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
    /// Channel identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// Message the clicked component belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<InteractionMessage>,
    /// User locale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Action context attached by the routing platform.
    #[serde(rename = "actionContext", default, skip_serializing_if = "Option::is_none")]
    pub action_context: Option<ActionContext>,
    /// Verified request bytes.
    #[serde(skip)]
    pub raw: Vec<u8>,
}

impl ActionRequest {
    /// Parses a request from verified bytes, retaining them as the raw
    /// payload.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when the bytes are not a valid
    /// interaction.
    pub fn from_verified_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let mut request: Self = serde_json::from_slice(bytes)?;
        request.raw = bytes.to_vec();
        Ok(request)
    }

    /// Returns the invoking user: the member's user in a guild, otherwise the
    /// top-level user.
    #[must_use]
    pub fn invoking_user(&self) -> Option<&User> {
        self.member.as_ref().and_then(|member| member.user.as_ref()).or(self.user.as_ref())
    }

    /// Returns the command name for command and autocomplete interactions.
    #[must_use]
    pub fn command_name(&self) -> Option<&str> {
        self.data.as_ref().and_then(|data| data.name.as_deref())
    }

    /// Returns the custom id for component and modal interactions.
    #[must_use]
    pub fn custom_id(&self) -> Option<&str> {
        self.data.as_ref().and_then(|data| data.custom_id.as_deref())
    }

    /// Returns the callback URL from the action context.
    #[must_use]
    pub fn callback_url(&self) -> Option<&str> {
        self.action_context.as_ref().and_then(|context| context.callback_url.as_deref())
    }

    /// Returns the flattened command options keyed by name. Options nested
    /// under subcommands are included; the first occurrence of a name wins.
    #[must_use]
    pub fn options(&self) -> BTreeMap<&str, &Value> {
        let mut flattened = BTreeMap::new();
        if let Some(data) = &self.data {
            flatten_options(&data.options, &mut flattened);
        }
        flattened
    }

    /// Returns a string option value by name.
    #[must_use]
    pub fn option_str(&self, name: &str) -> Option<&str> {
        self.options().get(name).and_then(|value| value.as_str())
    }

    /// Returns the option currently focused by autocomplete.
    #[must_use]
    pub fn focused_option(&self) -> Option<&CommandOption> {
        self.data.as_ref().and_then(|data| find_focused(&data.options))
    }
}

/// Collects leaf option values into `out`.
fn flatten_options<'a>(options: &'a [CommandOption], out: &mut BTreeMap<&'a str, &'a Value>) {
    for option in options {
        if let Some(value) = &option.value {
            out.entry(option.name.as_str()).or_insert(value);
        }
        flatten_options(&option.options, out);
    }
}

/// Finds the focused option at any depth.
fn find_focused(options: &[CommandOption]) -> Option<&CommandOption> {
    options
        .iter()
        .find_map(|option| if option.focused { Some(option) } else { find_focused(&option.options) })
}

// ============================================================================
// SECTION: Response Model
// ============================================================================

/// Immediate response kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    /// Reply to a ping.
    Pong,
    /// Message shown in reply to the interaction.
    ChannelMessageWithSource,
    /// Loading state; the message arrives later as a follow-up edit.
    DeferredChannelMessageWithSource,
    /// Component acknowledgment without changing the message yet.
    DeferredUpdateMessage,
    /// Replace the message the component belongs to.
    UpdateMessage,
    /// Autocomplete choices.
    ApplicationCommandAutocompleteResult,
}

impl ResponseKind {
    /// Returns the numeric wire code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Pong => 1,
            Self::ChannelMessageWithSource => 4,
            Self::DeferredChannelMessageWithSource => 5,
            Self::DeferredUpdateMessage => 6,
            Self::UpdateMessage => 7,
            Self::ApplicationCommandAutocompleteResult => 8,
        }
    }

    /// Parses a numeric wire code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Pong),
            4 => Some(Self::ChannelMessageWithSource),
            5 => Some(Self::DeferredChannelMessageWithSource),
            6 => Some(Self::DeferredUpdateMessage),
            7 => Some(Self::UpdateMessage),
            8 => Some(Self::ApplicationCommandAutocompleteResult),
            _ => None,
        }
    }
}

impl Serialize for ResponseKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for ResponseKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u8::deserialize(deserializer)?;
        Self::from_code(code)
            .ok_or_else(|| D::Error::custom(format!("unknown response type {code}")))
    }
}

/// Embed author block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedAuthor {
    /// Author name.
    pub name: String,
    /// Author link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Author icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// Embed key/value field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    /// Field name.
    pub name: String,
    /// Field value.
    pub value: String,
    /// Render inline with neighbouring fields.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub inline: bool,
}

impl EmbedField {
    /// Builds a field.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline,
        }
    }
}

/// Rich embed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    /// Title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Body text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Title link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Sidebar color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    /// Author block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    /// Fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

impl Embed {
    /// Returns the value of the first field named `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|field| field.name == name).map(|field| field.value.as_str())
    }
}

/// Button component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    /// Component type code (always [`BUTTON`]).
    #[serde(rename = "type")]
    pub kind: u8,
    /// Label text.
    pub label: String,
    /// Style code from [`button_style`].
    pub style: u8,
    /// Opaque identifier echoed back on click.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    /// Link target for link buttons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Disabled state.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
}

impl Button {
    /// Builds an interactive button.
    #[must_use]
    pub fn new(label: impl Into<String>, style: u8, custom_id: impl Into<String>) -> Self {
        Self {
            kind: BUTTON,
            label: label.into(),
            style,
            custom_id: Some(custom_id.into()),
            url: None,
            disabled: false,
        }
    }
}

/// Row of buttons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRow {
    /// Component type code (always [`ACTION_ROW`]).
    #[serde(rename = "type")]
    pub kind: u8,
    /// Buttons in the row.
    pub components: Vec<Button>,
}

impl ActionRow {
    /// Builds a row from buttons.
    #[must_use]
    pub const fn new(components: Vec<Button>) -> Self {
        Self {
            kind: ACTION_ROW,
            components,
        }
    }
}

/// Message body used by immediate responses and follow-ups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageData {
    /// Message text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Embeds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    /// Component rows.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ActionRow>,
    /// Message flags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
}

impl MessageData {
    /// Builds a plain text message.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Marks the message as visible only to the invoking user.
    #[must_use]
    pub fn ephemeral(mut self) -> Self {
        self.flags = Some(self.flags.unwrap_or(0) | EPHEMERAL);
        self
    }

    /// Returns true when the ephemeral flag is set.
    #[must_use]
    pub fn is_ephemeral(&self) -> bool {
        self.flags.is_some_and(|flags| flags & EPHEMERAL != 0)
    }
}

/// Autocomplete choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutocompleteChoice {
    /// Label shown to the user.
    pub name: String,
    /// Value submitted when chosen.
    pub value: String,
}

/// Autocomplete result body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutocompleteData {
    /// Offered choices.
    pub choices: Vec<AutocompleteChoice>,
}

/// Response body variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    /// Autocomplete choices.
    Autocomplete(AutocompleteData),
    /// Message body.
    Message(MessageData),
}

/// Immediate reply to an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    /// Response kind.
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    /// Response body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl ActionResponse {
    /// Reply to a ping.
    #[must_use]
    pub const fn pong() -> Self {
        Self {
            kind: ResponseKind::Pong,
            data: None,
        }
    }

    /// Message shown in reply to the interaction.
    #[must_use]
    pub const fn message(data: MessageData) -> Self {
        Self {
            kind: ResponseKind::ChannelMessageWithSource,
            data: Some(ResponseData::Message(data)),
        }
    }

    /// Ephemeral text reply.
    #[must_use]
    pub fn ephemeral_text(content: impl Into<String>) -> Self {
        Self::message(MessageData::text(content).ephemeral())
    }

    /// Component acknowledgment; the message is updated later.
    #[must_use]
    pub const fn deferred_update() -> Self {
        Self {
            kind: ResponseKind::DeferredUpdateMessage,
            data: None,
        }
    }

    /// Autocomplete result.
    #[must_use]
    pub const fn autocomplete(choices: Vec<AutocompleteChoice>) -> Self {
        Self {
            kind: ResponseKind::ApplicationCommandAutocompleteResult,
            data: Some(ResponseData::Autocomplete(AutocompleteData { choices })),
        }
    }

    /// Returns the message body when the response carries one.
    #[must_use]
    pub const fn message_data(&self) -> Option<&MessageData> {
        match &self.data {
            Some(ResponseData::Message(data)) => Some(data),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
