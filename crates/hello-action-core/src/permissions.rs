// crates/hello-action-core/src/permissions.rs
// ============================================================================
// Module: Permission Request Codec
// Description: Scope approval requests embedded in messages and their clicks.
// Purpose: Round-trip a permission request through a message and a button.
// Dependencies: crate::interaction
// ============================================================================

//! ## Overview
//! A permission request is carried entirely inside the message shown to the
//! user: an embed holds the interaction id, client id, and space-delimited
//! scopes as named fields, and two buttons carry `<verb>:<interactionId>`
//! custom ids. When a button is clicked, the platform echoes the message
//! back with the click event and [`decode`] recovers the request from it.
//! Nothing is stored between the two steps.
//!
//! The acting user is always taken from the click event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::interaction::ActionRequest;
use crate::interaction::ActionRow;
use crate::interaction::Button;
use crate::interaction::Embed;
use crate::interaction::EmbedField;
use crate::interaction::InteractionType;
use crate::interaction::MessageData;
use crate::interaction::User;
use crate::interaction::button_style;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Custom id verb for approval.
pub const APPROVE_PREFIX: &str = "$approve-user-permissions";
/// Custom id verb for denial.
pub const DENY_PREFIX: &str = "$deny-user-permissions";
/// Embed title of a permission request.
pub const REQUEST_TITLE: &str = "Permission request";
/// Embed field holding the interaction id.
const FIELD_INTERACTION_ID: &str = "interactionId";
/// Embed field holding the client id.
const FIELD_CLIENT_ID: &str = "clientId";
/// Embed field holding the scopes.
const FIELD_SCOPES: &str = "scopes";
/// Separator between verb and interaction id.
const ID_SEPARATOR: char = ':';

// ============================================================================
// SECTION: Types
// ============================================================================

/// Scope approval request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    /// Interaction the request belongs to.
    pub interaction_id: String,
    /// Client requesting the scopes.
    pub client_id: String,
    /// Requested scopes, in order.
    pub scopes: Vec<String>,
}

/// User decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionAction {
    /// Scopes granted.
    Approve,
    /// Scopes refused.
    Deny,
}

impl PermissionAction {
    /// Returns the custom id verb.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Approve => APPROVE_PREFIX,
            Self::Deny => DENY_PREFIX,
        }
    }

    /// Returns the display label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Deny => "deny",
        }
    }

    /// Builds the custom id for a button.
    #[must_use]
    pub fn custom_id(self, interaction_id: &str) -> String {
        format!("{}{ID_SEPARATOR}{interaction_id}", self.verb())
    }
}

/// Decision recovered from a button click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionResponse {
    /// Approve or deny.
    pub action: PermissionAction,
    /// Interaction the original request belonged to.
    pub interaction_id: String,
    /// Client id from the request embed; empty when absent.
    pub client_id: String,
    /// Scopes from the request embed; empty when absent.
    pub scopes: Vec<String>,
    /// User who clicked.
    pub user: Option<User>,
    /// Token granted by the platform on approval.
    pub api_token: Option<String>,
}

impl PermissionResponse {
    /// Returns the embedded request.
    #[must_use]
    pub fn request(&self) -> PermissionRequest {
        PermissionRequest {
            interaction_id: self.interaction_id.clone(),
            client_id: self.client_id.clone(),
            scopes: self.scopes.clone(),
        }
    }
}

// ============================================================================
// SECTION: Codec
// ============================================================================

/// Encodes a permission request as an ephemeral message with an embed and
/// approve/deny buttons.
#[must_use]
pub fn encode(request: &PermissionRequest) -> MessageData {
    let embed = Embed {
        title: Some(REQUEST_TITLE.to_string()),
        description: Some(format!(
            "`{}` is requesting the following permissions.",
            request.client_id
        )),
        fields: vec![
            EmbedField::new(FIELD_INTERACTION_ID, &request.interaction_id, true),
            EmbedField::new(FIELD_CLIENT_ID, &request.client_id, true),
            EmbedField::new(FIELD_SCOPES, request.scopes.join(" "), false),
        ],
        ..Embed::default()
    };
    let buttons = vec![
        Button::new(
            "Approve",
            button_style::SUCCESS,
            PermissionAction::Approve.custom_id(&request.interaction_id),
        ),
        Button::new(
            "Deny",
            button_style::DANGER,
            PermissionAction::Deny.custom_id(&request.interaction_id),
        ),
    ];
    MessageData {
        embeds: vec![embed],
        components: vec![ActionRow::new(buttons)],
        ..MessageData::default()
    }
    .ephemeral()
}

/// Decodes a permission decision from a component click.
///
/// Returns `None` unless the event is a component click whose custom id
/// starts with one of the two verbs. The interaction id in the custom id is
/// authoritative; an embed describing a different interaction is ignored.
#[must_use]
pub fn decode(request: &ActionRequest) -> Option<PermissionResponse> {
    if request.kind != InteractionType::MessageComponent {
        return None;
    }
    let custom_id = request.custom_id()?;
    let (action, rest) = if let Some(rest) = custom_id.strip_prefix(APPROVE_PREFIX) {
        (PermissionAction::Approve, rest)
    } else if let Some(rest) = custom_id.strip_prefix(DENY_PREFIX) {
        (PermissionAction::Deny, rest)
    } else {
        return None;
    };
    let button_id = rest.strip_prefix(ID_SEPARATOR).filter(|id| !id.is_empty());
    let embed = request
        .message
        .as_ref()
        .and_then(|message| {
            message
                .embeds
                .iter()
                .find(|embed| embed.field(FIELD_INTERACTION_ID).is_some())
                .or_else(|| message.embeds.first())
        })
        .filter(|embed| match (button_id, embed.field(FIELD_INTERACTION_ID)) {
            (Some(id), Some(described)) => id == described,
            _ => true,
        });
    let field = |name: &str| embed.and_then(|embed| embed.field(name)).unwrap_or_default();
    let interaction_id = button_id.unwrap_or_else(|| field(FIELD_INTERACTION_ID)).to_string();
    Some(PermissionResponse {
        action,
        interaction_id,
        client_id: field(FIELD_CLIENT_ID).to_string(),
        scopes: split_scopes(field(FIELD_SCOPES)),
        user: request.invoking_user().cloned(),
        api_token: request.action_context.as_ref().and_then(|context| context.api_token.clone()),
    })
}

/// Splits a scope list on single spaces, dropping empty tokens.
#[must_use]
pub fn split_scopes(scopes: &str) -> Vec<String> {
    scopes.split(' ').filter(|scope| !scope.is_empty()).map(ToString::to_string).collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
