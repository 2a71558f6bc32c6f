// crates/hello-action-server/src/hello.rs
// ============================================================================
// Module: Hello Action
// Description: Example action greeting users and driving follow-ups.
// Purpose: Route verified interactions to handlers and schedule follow-ups.
// Dependencies: hello-action-core, async-trait, serde_json
// ============================================================================

//! ## Overview
//! [`HelloAction`] answers the `/hello-action` command, its autocomplete,
//! the count-down button, and permission approve/deny clicks. Each handler
//! returns the immediate response synchronously; follow-up work is handed to
//! a [`LifecycleSupervisor`] and never awaited by the request path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hello_action_core::ActionRequest;
use hello_action_core::ActionResponse;
use hello_action_core::CountdownConfig;
use hello_action_core::FollowupError;
use hello_action_core::FollowupTarget;
use hello_action_core::InteractionPattern;
use hello_action_core::InteractionRouter;
use hello_action_core::InteractionType;
use hello_action_core::LifecyclePlan;
use hello_action_core::LifecycleSupervisor;
use hello_action_core::MessageData;
use hello_action_core::PermissionAction;
use hello_action_core::PermissionRequest;
use hello_action_core::PermissionResponse;
use hello_action_core::ResponseLifecycle;
use hello_action_core::RouterError;
use hello_action_core::WebhookClient;
use hello_action_core::WebhookError;
use hello_action_core::interaction::ActionRow;
use hello_action_core::interaction::AutocompleteChoice;
use hello_action_core::interaction::Button;
use hello_action_core::interaction::Embed;
use hello_action_core::interaction::EmbedAuthor;
use hello_action_core::interaction::EmbedField;
use hello_action_core::interaction::MAX_AUTOCOMPLETE_CHOICES;
use hello_action_core::interaction::button_style;
use hello_action_core::permissions;
use hello_action_core::permissions::APPROVE_PREFIX;
use hello_action_core::permissions::DENY_PREFIX;
use hello_action_webhook::HttpWebhookClient;
use serde_json::Value;

use crate::metadata::ActionMetadata;
use crate::metadata::hello_metadata;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Command handled by this action.
pub const COMMAND_NAME: &str = "hello-action";
/// Command option carrying the name to greet.
pub const NAME_OPTION: &str = "your-name";
/// Client id used for permission requests.
pub const CLIENT_ID: &str = "collabland_demo";
/// Custom id of the count-down button.
pub const COUNT_BUTTON_ID: &str = "hello-action:count-button";
/// Scopes requested after a greeting.
pub const REQUESTED_SCOPES: [&str; 2] = ["user:read", "user:write"];
/// Reply for interactions no route accepts.
pub const NOT_IMPLEMENTED: &str = "This interaction is not implemented.";
/// Title of the permission decision embed.
pub const PERMISSION_RESPONSE_TITLE: &str = "User response for permissions";
/// Longest profile text posted in a follow-up.
const MAX_PROFILE_CHARS: usize = 1900;

// ============================================================================
// SECTION: Seams
// ============================================================================

/// Action surface served by the HTTP layer.
pub trait DiscordAction: Send + Sync {
    /// Returns the metadata document.
    fn metadata(&self) -> ActionMetadata;

    /// Produces the immediate response for a verified interaction. Follow-up
    /// work is scheduled in the background.
    fn handle(&self, request: &ActionRequest) -> ActionResponse;
}

/// Account profile lookup performed after a permission approval.
#[async_trait]
pub trait AccountProfiles: Send + Sync {
    /// Fetches the profile granted by `api_token`.
    async fn account_profile(
        &self,
        callback_url: &str,
        api_token: &str,
    ) -> Result<Value, WebhookError>;
}

#[async_trait]
impl AccountProfiles for HttpWebhookClient {
    async fn account_profile(
        &self,
        callback_url: &str,
        api_token: &str,
    ) -> Result<Value, WebhookError> {
        Self::account_profile(self, callback_url, api_token).await
    }
}

// ============================================================================
// SECTION: Routing
// ============================================================================

/// Handlers of the hello action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelloRoute {
    /// `/hello-action` command.
    Greet,
    /// `your-name` autocomplete.
    Autocomplete,
    /// Permission approve/deny buttons.
    PermissionResponse,
    /// Count-down button.
    CountDown,
}

/// Builds the routing table. Permission buttons come before the
/// `hello-action:*` wildcard.
///
/// # Errors
///
/// Returns [`RouterError`] when a pattern is malformed.
pub fn hello_router() -> Result<InteractionRouter<HelloRoute>, RouterError> {
    let approve = format!("{APPROVE_PREFIX}:*");
    let deny = format!("{DENY_PREFIX}:*");
    InteractionRouter::new()
        .with_route(
            InteractionPattern::names(InteractionType::ApplicationCommand, &[COMMAND_NAME]),
            HelloRoute::Greet,
        )?
        .with_route(
            InteractionPattern::names(
                InteractionType::ApplicationCommandAutocomplete,
                &[COMMAND_NAME],
            ),
            HelloRoute::Autocomplete,
        )?
        .with_route(
            InteractionPattern::ids(InteractionType::MessageComponent, &[approve.as_str(), deny.as_str()]),
            HelloRoute::PermissionResponse,
        )?
        .with_route(
            InteractionPattern::ids(InteractionType::MessageComponent, &["hello-action:*"]),
            HelloRoute::CountDown,
        )
}

// ============================================================================
// SECTION: Action
// ============================================================================

/// Follow-up pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelloSettings {
    /// Count-down cadence.
    pub countdown: CountdownConfig,
    /// Lifetime of a callback token.
    pub token_ttl: Duration,
}

/// The example action.
pub struct HelloAction {
    /// Dispatch table.
    router: InteractionRouter<HelloRoute>,
    /// Follow-up API.
    client: Arc<dyn WebhookClient>,
    /// Profile lookup.
    profiles: Arc<dyn AccountProfiles>,
    /// Background task owner.
    supervisor: LifecycleSupervisor,
    /// Pacing.
    settings: HelloSettings,
}

impl HelloAction {
    /// Builds the action.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError`] when the routing table is malformed.
    pub fn new(
        client: Arc<dyn WebhookClient>,
        profiles: Arc<dyn AccountProfiles>,
        supervisor: LifecycleSupervisor,
        settings: HelloSettings,
    ) -> Result<Self, RouterError> {
        Ok(Self {
            router: hello_router()?,
            client,
            profiles,
            supervisor,
            settings,
        })
    }

    /// Follow-up target for `request`, if it carries a callback.
    fn target(&self, request: &ActionRequest) -> Option<FollowupTarget> {
        FollowupTarget::from_request(request, self.settings.token_ttl)
    }

    /// Starts a lifecycle for `request` in the background.
    fn spawn_followup(&self, request: &ActionRequest, plan: LifecyclePlan) {
        let lifecycle = ResponseLifecycle::acknowledged(
            request.id.clone(),
            self.target(request),
            Arc::clone(&self.client),
            self.supervisor.observer(),
        );
        drop(self.supervisor.spawn(lifecycle, plan));
    }

    /// `/hello-action`: greets and asks for permissions.
    fn greet(&self, request: &ActionRequest) -> ActionResponse {
        let message = greeting(request);
        if request.callback_url().is_some() {
            let permission = PermissionRequest {
                interaction_id: request.id.clone(),
                client_id: CLIENT_ID.to_string(),
                scopes: REQUESTED_SCOPES.iter().map(ToString::to_string).collect(),
            };
            let plan = LifecyclePlan::single(permissions::encode(&permission))
                .with_initial_delay(self.settings.countdown.initial_delay);
            self.spawn_followup(request, plan);
        }
        ActionResponse::message(greeting_message(message))
    }

    /// Count-down button: acknowledges and runs the countdown.
    fn count_down(&self, request: &ActionRequest) -> ActionResponse {
        let plan = LifecyclePlan::countdown(&countdown_greeting(request), &self.settings.countdown);
        self.spawn_followup(request, plan);
        ActionResponse::deferred_update()
    }

    /// Permission click: describes the decision and, on approval, posts the
    /// granted profile.
    fn permission_response(&self, request: &ActionRequest) -> ActionResponse {
        let Some(decision) = permissions::decode(request) else {
            return ActionResponse::ephemeral_text(NOT_IMPLEMENTED);
        };
        if decision.action == PermissionAction::Approve {
            self.spawn_profile_followup(request, &decision);
        }
        ActionResponse::message(permission_message(&decision))
    }

    /// Fetches and posts the account profile for an approval.
    fn spawn_profile_followup(&self, request: &ActionRequest, decision: &PermissionResponse) {
        let (Some(api_token), Some(callback_url)) =
            (decision.api_token.clone(), request.callback_url().map(ToString::to_string))
        else {
            return;
        };
        let lifecycle = ResponseLifecycle::acknowledged(
            request.id.clone(),
            self.target(request),
            Arc::clone(&self.client),
            self.supervisor.observer(),
        );
        let profiles = Arc::clone(&self.profiles);
        let delay = self.settings.countdown.initial_delay;
        drop(self.supervisor.spawn_task(request.id.clone(), async move {
            let prepare = async move {
                let profile = profiles.account_profile(&callback_url, &api_token).await?;
                let text = serde_json::to_string_pretty(&profile)
                    .map_err(|err| FollowupError::Prepare(err.to_string()))?;
                let content: String = text.chars().take(MAX_PROFILE_CHARS).collect();
                let message = MessageData::text(format!("```json\n{content}\n```"));
                Ok::<_, FollowupError>(LifecyclePlan::single(message).with_initial_delay(delay))
            };
            lifecycle.run_prepared(prepare).await;
            Ok(())
        }));
    }
}

impl DiscordAction for HelloAction {
    fn metadata(&self) -> ActionMetadata {
        hello_metadata(self.router.patterns().cloned().collect())
    }

    fn handle(&self, request: &ActionRequest) -> ActionResponse {
        if request.kind == InteractionType::Ping {
            return ActionResponse::pong();
        }
        match self.router.route(request).map(|matched| *matched.handler) {
            Some(HelloRoute::Greet) => self.greet(request),
            Some(HelloRoute::Autocomplete) => ActionResponse::autocomplete(name_choices(request)),
            Some(HelloRoute::PermissionResponse) => self.permission_response(request),
            Some(HelloRoute::CountDown) => self.count_down(request),
            None => ActionResponse::ephemeral_text(NOT_IMPLEMENTED),
        }
    }
}

// ============================================================================
// SECTION: Messages
// ============================================================================

/// Returns `Hello, <name>!`, falling back to the invoking username, then
/// `World`.
#[must_use]
pub fn greeting(request: &ActionRequest) -> String {
    let name = request
        .option_str(NAME_OPTION)
        .filter(|name| !name.is_empty())
        .or_else(|| request.invoking_user().map(|user| user.username.as_str()))
        .unwrap_or("World");
    format!("Hello, {name}!")
}

/// Greeting counted down by the button: the one on the clicked message, so
/// the name from the original command survives the click.
fn countdown_greeting(request: &ActionRequest) -> String {
    request
        .message
        .as_ref()
        .map(|message| message.content.trim())
        .filter(|content| content.starts_with("Hello, ") && content.ends_with('!'))
        .map_or_else(|| greeting(request), ToString::to_string)
}

/// Builds the ephemeral greeting with the action embed and count-down button.
fn greeting_message(message: String) -> MessageData {
    let embed = Embed {
        title: Some("Hello Action".to_string()),
        description: Some(
            "This is a demo Collab Action. Press the button below to start a count down."
                .to_string(),
        ),
        url: Some("https://github.com/abridged/collabland-hello-action/".to_string()),
        color: Some(0x00F5_C248),
        author: Some(EmbedAuthor {
            name: "Collab.Land".to_string(),
            url: Some("https://collab.land".to_string()),
            icon_url: Some(
                "https://cdn.discordapp.com/app-icons/715138531994894397/8a814f663844a69d22344dc8f4983de6.png"
                    .to_string(),
            ),
        }),
        fields: Vec::new(),
    };
    MessageData {
        embeds: vec![embed],
        components: vec![ActionRow::new(vec![Button::new(
            "Count down",
            button_style::PRIMARY,
            COUNT_BUTTON_ID,
        )])],
        ..MessageData::text(message)
    }
    .ephemeral()
}

/// Builds the ephemeral permission decision embed.
fn permission_message(decision: &PermissionResponse) -> MessageData {
    let user = decision.user.as_ref().map(|user| user.tag()).unwrap_or_default();
    let embed = Embed {
        title: Some(PERMISSION_RESPONSE_TITLE.to_string()),
        fields: vec![
            EmbedField::new("user", user, false),
            EmbedField::new("action", decision.action.as_str(), true),
            EmbedField::new("interactionId", &decision.interaction_id, true),
            EmbedField::new("scopes", decision.scopes.join(" "), true),
        ],
        ..Embed::default()
    };
    MessageData {
        embeds: vec![embed],
        ..MessageData::default()
    }
    .ephemeral()
}

/// Autocomplete choices: the typed value and the invoking username.
fn name_choices(request: &ActionRequest) -> Vec<AutocompleteChoice> {
    let typed = request
        .focused_option()
        .and_then(|option| option.value.as_ref())
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let username = request.invoking_user().map(|user| user.username.as_str());
    let mut choices: Vec<AutocompleteChoice> = Vec::new();
    for candidate in typed.into_iter().chain(username) {
        if choices.iter().any(|choice| choice.value == candidate) {
            continue;
        }
        choices.push(AutocompleteChoice {
            name: candidate.to_string(),
            value: candidate.to_string(),
        });
    }
    choices.truncate(MAX_AUTOCOMPLETE_CHOICES);
    choices
}

// ============================================================================
// SECTION: Tests
// ============================================================================
