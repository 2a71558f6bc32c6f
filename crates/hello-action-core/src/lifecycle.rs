// crates/hello-action-core/src/lifecycle.rs
// ============================================================================
// Module: Response Lifecycle
// Description: Acknowledgment, follow-up, edit, and terminal steps.
// Purpose: Drive the asynchronous part of an interaction response.
// Dependencies: crate::webhook, serde, thiserror, tokio
// ============================================================================

//! ## Overview
//! Every interaction is answered immediately; anything after that runs in a
//! background task that owns the follow-up message for its interaction.
//!
//! ```text
//! Created -> Acknowledged -> FollowupSent -> Editing* -> Deleted | Completed
//! ```
//!
//! Edits are issued one at a time, each against the message id returned by
//! the previous call. Any failure after acknowledgment moves the lifecycle
//! to `Failed`, is reported to the [`LifecycleObserver`], and ends the task.
//! Nothing is retried and nothing reaches the original caller.
//!
//! ## Invariants
//! - At most one webhook call is in flight per lifecycle.
//! - No call is issued once the callback token has expired.
//! - Terminal states accept no further transitions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::interaction::MessageData;
use crate::webhook::FollowupBody;
use crate::webhook::FollowupTarget;
use crate::webhook::WebhookClient;
use crate::webhook::WebhookError;

// ============================================================================
// SECTION: States
// ============================================================================

/// Lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Request received, nothing sent yet.
    Created,
    /// Immediate response delivered.
    Acknowledged,
    /// Follow-up message posted.
    FollowupSent,
    /// At least one edit applied.
    Editing,
    /// Follow-up message deleted.
    Deleted,
    /// Sequence ended without deletion.
    Completed,
    /// Sequence aborted by an error.
    Failed,
}

impl LifecycleState {
    /// Returns the lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Acknowledged => "acknowledged",
            Self::FollowupSent => "followup_sent",
            Self::Editing => "editing",
            Self::Deleted => "deleted",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns true for states that end the lifecycle.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Deleted | Self::Completed | Self::Failed)
    }

    /// Returns true when `next` is a legal successor.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Created, Self::Acknowledged)
            | (Self::Acknowledged, Self::FollowupSent | Self::Completed)
            | (
                Self::FollowupSent | Self::Editing,
                Self::Editing | Self::Deleted | Self::Completed,
            )
            | (Self::Acknowledged | Self::FollowupSent | Self::Editing, Self::Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures after the immediate response was delivered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FollowupError {
    /// The callback token expired before the next call.
    #[error("callback token expired")]
    TokenExpired,
    /// The webhook call failed.
    #[error(transparent)]
    Webhook(#[from] WebhookError),
    /// The lifecycle was asked to make an illegal transition.
    #[error("invalid lifecycle transition {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: LifecycleState,
        /// Requested state.
        to: LifecycleState,
    },
    /// Background work failed before reaching the webhook.
    #[error("follow-up preparation failed: {0}")]
    Prepare(String),
}

impl FollowupError {
    /// Returns a stable label for audit events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TokenExpired => "token_expired",
            Self::Webhook(_) => "webhook",
            Self::InvalidTransition {
                ..
            } => "invalid_transition",
            Self::Prepare(_) => "prepare",
        }
    }
}

// ============================================================================
// SECTION: Observer
// ============================================================================

/// Recorded transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleEvent {
    /// Interaction the lifecycle belongs to.
    pub interaction_id: String,
    /// State before the transition.
    pub from: LifecycleState,
    /// State after the transition.
    pub to: LifecycleState,
    /// Follow-up message id when known.
    pub message_id: Option<String>,
    /// One-based edit number for edit transitions.
    pub edit: Option<usize>,
    /// Error text for failures.
    pub error: Option<String>,
}

/// Sink for lifecycle transitions and background task failures.
pub trait LifecycleObserver: Send + Sync {
    /// Records a transition.
    fn record(&self, event: &LifecycleEvent);

    /// Records a background task that ended without a lifecycle report
    /// (panic, cancellation, or a failure outside the state machine).
    fn record_abort(&self, interaction_id: &str, reason: &str) {
        self.record(&LifecycleEvent {
            interaction_id: interaction_id.to_string(),
            from: LifecycleState::Failed,
            to: LifecycleState::Failed,
            message_id: None,
            edit: None,
            error: Some(reason.to_string()),
        });
    }
}

/// Observer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLifecycleObserver;

impl LifecycleObserver for NoopLifecycleObserver {
    fn record(&self, _event: &LifecycleEvent) {}
}

// ============================================================================
// SECTION: Plans
// ============================================================================

/// How the lifecycle ends after the last edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStep {
    /// Delete the follow-up message.
    Delete,
    /// Leave the message in place.
    Complete,
}

/// Countdown cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownConfig {
    /// First counter value; edits descend from here to 1.
    pub start: u32,
    /// Delay before each edit and before deletion.
    pub interval: Duration,
    /// Delay before the follow-up is posted.
    pub initial_delay: Duration,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            start: 5,
            interval: Duration::from_secs(1),
            initial_delay: Duration::from_secs(1),
        }
    }
}

/// Steps a lifecycle will perform after acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecyclePlan {
    /// Delay before the follow-up is posted.
    pub initial_delay: Duration,
    /// Follow-up body.
    pub followup: FollowupBody,
    /// Edit bodies, applied in order.
    pub edits: Vec<FollowupBody>,
    /// Delay before each edit and before deletion.
    pub edit_interval: Duration,
    /// Final step.
    pub terminal: TerminalStep,
}

impl LifecyclePlan {
    /// Posts one follow-up and completes.
    #[must_use]
    pub const fn single(followup: FollowupBody) -> Self {
        Self {
            initial_delay: Duration::ZERO,
            followup,
            edits: Vec::new(),
            edit_interval: Duration::ZERO,
            terminal: TerminalStep::Complete,
        }
    }

    /// Posts `message` as a follow-up, counts down from `config.start` to 1
    /// with one edit per interval, then deletes the follow-up.
    #[must_use]
    pub fn countdown(message: &str, config: &CountdownConfig) -> Self {
        let edits = (1..=config.start)
            .rev()
            .map(|remaining| MessageData::text(format!("[{remaining}s]: **{message}**")))
            .collect();
        Self {
            initial_delay: config.initial_delay,
            followup: MessageData::text(format!("Follow-up: **{message}**")).ephemeral(),
            edits,
            edit_interval: config.interval,
            terminal: TerminalStep::Delete,
        }
    }

    /// Overrides the delay before the follow-up.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

/// Outcome of a finished lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleReport {
    /// Interaction the lifecycle belonged to.
    pub interaction_id: String,
    /// Terminal state reached.
    pub final_state: LifecycleState,
    /// Last known follow-up message id.
    pub message_id: Option<String>,
    /// Number of edits applied.
    pub edits_applied: usize,
    /// Error that ended the lifecycle, if any.
    pub error: Option<FollowupError>,
}

/// Follow-up state machine for one interaction.
pub struct ResponseLifecycle {
    /// Interaction identifier.
    interaction_id: String,
    /// Callback target; `None` when the request carried no callback context.
    target: Option<FollowupTarget>,
    /// Remote follow-up API.
    client: Arc<dyn WebhookClient>,
    /// Transition sink.
    observer: Arc<dyn LifecycleObserver>,
    /// Current state.
    state: LifecycleState,
    /// Follow-up message id once created.
    message_id: Option<String>,
    /// Edits applied so far.
    edits_applied: usize,
}

impl fmt::Debug for ResponseLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseLifecycle")
            .field("interaction_id", &self.interaction_id)
            .field("state", &self.state)
            .field("message_id", &self.message_id)
            .field("edits_applied", &self.edits_applied)
            .finish_non_exhaustive()
    }
}

impl ResponseLifecycle {
    /// Creates a lifecycle in the `Created` state.
    #[must_use]
    pub fn new(
        interaction_id: impl Into<String>,
        target: Option<FollowupTarget>,
        client: Arc<dyn WebhookClient>,
        observer: Arc<dyn LifecycleObserver>,
    ) -> Self {
        Self {
            interaction_id: interaction_id.into(),
            target,
            client,
            observer,
            state: LifecycleState::Created,
            message_id: None,
            edits_applied: 0,
        }
    }

    /// Creates a lifecycle for an interaction whose immediate response has
    /// been produced.
    #[must_use]
    pub fn acknowledged(
        interaction_id: impl Into<String>,
        target: Option<FollowupTarget>,
        client: Arc<dyn WebhookClient>,
        observer: Arc<dyn LifecycleObserver>,
    ) -> Self {
        let mut lifecycle = Self::new(interaction_id, target, client, observer);
        lifecycle.record(LifecycleState::Acknowledged, None, None);
        lifecycle
    }

    /// Marks the immediate response as delivered.
    ///
    /// # Errors
    ///
    /// Returns [`FollowupError::InvalidTransition`] unless the lifecycle is
    /// still `Created`.
    pub fn acknowledge(&mut self) -> Result<(), FollowupError> {
        self.transition(LifecycleState::Acknowledged, None)
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Returns the interaction identifier.
    #[must_use]
    pub fn interaction_id(&self) -> &str {
        &self.interaction_id
    }

    /// Runs `plan` to a terminal state.
    pub async fn run(mut self, plan: LifecyclePlan) -> LifecycleReport {
        let outcome = self.drive(plan).await;
        self.finish(outcome)
    }

    /// Runs the plan produced by `prepare`. A preparation error fails the
    /// lifecycle before any webhook call.
    pub async fn run_prepared<F>(self, prepare: F) -> LifecycleReport
    where
        F: Future<Output = Result<LifecyclePlan, FollowupError>>,
    {
        match prepare.await {
            Ok(plan) => self.run(plan).await,
            Err(error) => self.finish(Err(error)),
        }
    }

    /// Records a failure unless already terminal and builds the report.
    fn finish(mut self, outcome: Result<(), FollowupError>) -> LifecycleReport {
        let error = match outcome {
            Ok(()) => None,
            Err(error) => {
                if !self.state.is_terminal() {
                    let text = error.to_string();
                    self.record(LifecycleState::Failed, None, Some(text));
                }
                Some(error)
            }
        };
        LifecycleReport {
            interaction_id: self.interaction_id,
            final_state: self.state,
            message_id: self.message_id,
            edits_applied: self.edits_applied,
            error,
        }
    }

    /// Performs each step in order.
    async fn drive(&mut self, plan: LifecyclePlan) -> Result<(), FollowupError> {
        if self.state != LifecycleState::Acknowledged {
            return Err(FollowupError::InvalidTransition {
                from: self.state,
                to: LifecycleState::FollowupSent,
            });
        }
        let Some(target) = self.target.clone() else {
            return self.transition(LifecycleState::Completed, None);
        };
        let client = Arc::clone(&self.client);

        pause(plan.initial_delay).await;
        ensure_live(&target)?;
        let created = client.create_followup(&target, &plan.followup).await?;
        self.message_id = Some(created.id);
        self.transition(LifecycleState::FollowupSent, None)?;

        for (index, body) in plan.edits.iter().enumerate() {
            pause(plan.edit_interval).await;
            ensure_live(&target)?;
            let message_id = self.current_message_id()?;
            let edited = client.edit_followup(&target, &message_id, body).await?;
            self.message_id = Some(edited.id);
            self.edits_applied += 1;
            self.transition(LifecycleState::Editing, Some(index + 1))?;
        }

        match plan.terminal {
            TerminalStep::Delete => {
                pause(plan.edit_interval).await;
                ensure_live(&target)?;
                let message_id = self.current_message_id()?;
                client.delete_followup(&target, &message_id).await?;
                self.transition(LifecycleState::Deleted, None)
            }
            TerminalStep::Complete => self.transition(LifecycleState::Completed, None),
        }
    }

    /// Returns the id the next call must target.
    fn current_message_id(&self) -> Result<String, FollowupError> {
        self.message_id.clone().ok_or(FollowupError::InvalidTransition {
            from: self.state,
            to: LifecycleState::Editing,
        })
    }

    /// Applies a checked transition and records it.
    fn transition(&mut self, to: LifecycleState, edit: Option<usize>) -> Result<(), FollowupError> {
        if !self.state.can_transition_to(to) {
            return Err(FollowupError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.record(to, edit, None);
        Ok(())
    }

    /// Records a transition and updates the state.
    fn record(&mut self, to: LifecycleState, edit: Option<usize>, error: Option<String>) {
        self.observer.record(&LifecycleEvent {
            interaction_id: self.interaction_id.clone(),
            from: self.state,
            to,
            message_id: self.message_id.clone(),
            edit,
            error,
        });
        self.state = to;
    }
}

/// Fails when the callback token has expired.
fn ensure_live(target: &FollowupTarget) -> Result<(), FollowupError> {
    if target.token.is_expired() {
        return Err(FollowupError::TokenExpired);
    }
    Ok(())
}

/// Sleeps unless `delay` is zero.
async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

// ============================================================================
// SECTION: Supervisor
// ============================================================================

/// Spawns detached follow-up work and reports anything that ends abnormally.
#[derive(Clone)]
pub struct LifecycleSupervisor {
    /// Sink for aborted tasks.
    observer: Arc<dyn LifecycleObserver>,
}

impl fmt::Debug for LifecycleSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleSupervisor").finish_non_exhaustive()
    }
}

impl LifecycleSupervisor {
    /// Creates a supervisor reporting to `observer`.
    #[must_use]
    pub fn new(observer: Arc<dyn LifecycleObserver>) -> Self {
        Self {
            observer,
        }
    }

    /// Returns the observer shared with supervised lifecycles.
    #[must_use]
    pub fn observer(&self) -> Arc<dyn LifecycleObserver> {
        Arc::clone(&self.observer)
    }

    /// Runs `lifecycle` in the background. The returned handle yields the
    /// report, or `None` when the task panicked or was cancelled.
    pub fn spawn(
        &self,
        lifecycle: ResponseLifecycle,
        plan: LifecyclePlan,
    ) -> JoinHandle<Option<LifecycleReport>> {
        let interaction_id = lifecycle.interaction_id().to_string();
        let observer = Arc::clone(&self.observer);
        let inner = tokio::spawn(lifecycle.run(plan));
        tokio::spawn(async move {
            match inner.await {
                Ok(report) => Some(report),
                Err(err) => {
                    observer.record_abort(&interaction_id, &err.to_string());
                    None
                }
            }
        })
    }

    /// Runs arbitrary follow-up work in the background, reporting its error
    /// or abnormal end.
    pub fn spawn_task<F>(&self, interaction_id: impl Into<String>, task: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), FollowupError>> + Send + 'static,
    {
        let interaction_id = interaction_id.into();
        let observer = Arc::clone(&self.observer);
        let inner = tokio::spawn(task);
        tokio::spawn(async move {
            match inner.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => observer.record_abort(&interaction_id, &err.to_string()),
                Err(err) => observer.record_abort(&interaction_id, &err.to_string()),
            }
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
