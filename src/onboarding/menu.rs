//! Button-press boundary for the two selection prompts.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::manager::{OnboardingManager, SelectionOutcome};
use super::model::Selection;
use super::prompts;
use crate::error::PlatformError;
use crate::platform::{Interaction, MessageId, Platform};

/// What became of a button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PressOutcome {
    /// Prompt idle for longer than the timeout. Not acknowledged.
    Expired,
    /// Not one of our buttons.
    Unrecognized,
    /// Handled; carries the state machine's verdict.
    Handled(SelectionOutcome),
    /// The handler faulted and the participant got the generic apology.
    Failed,
}

/// Single parameterized handler for both prompts; the pressed button's
/// `custom_id` carries the selection.
///
/// A prompt expires after `timeout` without an accepted press. Each accepted
/// press restarts the clock for that prompt message.
pub struct SelectionMenus {
    manager: Arc<OnboardingManager>,
    platform: Arc<dyn Platform>,
    timeout: Duration,
    last_activity: RwLock<HashMap<MessageId, DateTime<Utc>>>,
}

impl SelectionMenus {
    pub fn new(manager: Arc<OnboardingManager>, platform: Arc<dyn Platform>, timeout: Duration) -> Self {
        Self {
            manager,
            platform,
            timeout,
            last_activity: RwLock::new(HashMap::new()),
        }
    }

    pub async fn handle(&self, interaction: &Interaction) -> PressOutcome {
        self.handle_at(interaction, Utc::now()).await
    }

    /// Handle a press as if the current time were `now`.
    pub async fn handle_at(&self, interaction: &Interaction, now: DateTime<Utc>) -> PressOutcome {
        let Some(selection) = Selection::from_custom_id(&interaction.custom_id) else {
            tracing::debug!(custom_id = %interaction.custom_id, "Ignoring unknown component");
            return PressOutcome::Unrecognized;
        };

        if !self.touch(interaction, now).await {
            tracing::debug!(
                user_id = %interaction.user_id,
                custom_id = %interaction.custom_id,
                "Ignoring press on expired prompt"
            );
            return PressOutcome::Expired;
        }

        match self.run(interaction, selection).await {
            Ok(outcome) => PressOutcome::Handled(outcome),
            Err(e) => {
                tracing::error!(
                    user_id = %interaction.user_id,
                    selection = selection.label(),
                    "Selection handler failed: {e}"
                );
                if let Err(e) = self.platform.followup(interaction, prompts::SELECTION_FAILED).await {
                    tracing::warn!(user_id = %interaction.user_id, "Failed to send apology: {e}");
                }
                PressOutcome::Failed
            }
        }
    }

    /// Record a press on the carrying prompt. Returns false, and forgets the
    /// prompt, when it has been idle past the timeout.
    async fn touch(&self, interaction: &Interaction, now: DateTime<Utc>) -> bool {
        // Without the carrying message there is nothing to time; accept.
        let Some(message) = interaction.message_id else {
            return true;
        };

        let mut activity = self.last_activity.write().await;
        let last = activity
            .get(&message)
            .copied()
            .unwrap_or_else(|| message.created_at());
        if self.idle_past_timeout(last, now) {
            activity.remove(&message);
            return false;
        }

        activity.retain(|_, seen| !self.idle_past_timeout(*seen, now));
        activity.insert(message, now);
        true
    }

    fn idle_past_timeout(&self, last: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(last)
            .to_std()
            .is_ok_and(|idle| idle > self.timeout)
    }

    async fn run(
        &self,
        interaction: &Interaction,
        selection: Selection,
    ) -> Result<SelectionOutcome, PlatformError> {
        self.platform.defer_interaction(interaction).await?;

        let outcome = self
            .manager
            .apply_selection(interaction.user_id, selection)
            .await?;
        self.platform.followup(interaction, &outcome.reply()).await?;
        self.manager.advance(interaction.user_id, &outcome).await?;

        Ok(outcome)
    }
}
