//! OnboardingManager — drives the three-step flow: reaction, domain,
//! researcher type.
//!
//! Every guard reads the member's live roles. The progress record is
//! bookkeeping and never decides whether a choice was already made.

use std::sync::{Arc, OnceLock};

use super::model::{Choice, Selection};
use super::prompts;
use super::state::ProgressRecord;
use super::tracker::ProgressStore;
use crate::config::{OnboardingConfig, held};
use crate::error::PlatformError;
use crate::platform::{Delivery, OutgoingMessage, Platform, ReactionEvent, UserId};

/// Result of handling an entry reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Wrong channel/emoji, the bot itself, or an unresolvable member.
    Ignored,
    /// Already holds a domain or researcher role; nothing changed.
    AlreadyVerified,
    /// Step 1 done. `dm_delivered` is false when the fallback notice was posted.
    Started { dm_delivered: bool },
}

/// Result of applying a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// Role granted and tracked; the next prompt (or completion) follows.
    Granted {
        selection: Selection,
        record: Option<ProgressRecord>,
    },
    /// A role from this set is already held. Nothing changed.
    AlreadySelected(Selection),
    /// The participant is no longer in the community.
    NotInCommunity,
}

impl SelectionOutcome {
    /// Ephemeral reply shown to the participant.
    pub fn reply(&self) -> String {
        match self {
            Self::Granted { selection, .. } => prompts::selection_confirmed(*selection),
            Self::AlreadySelected(selection) => prompts::already_selected(selection.kind()),
            Self::NotInCommunity => prompts::NOT_IN_SERVER.to_string(),
        }
    }
}

/// Coordinates the onboarding flow: guards, role grants, progress tracking,
/// and the private prompts between steps.
pub struct OnboardingManager {
    config: Arc<OnboardingConfig>,
    platform: Arc<dyn Platform>,
    progress: Arc<dyn ProgressStore>,
    bot_user: OnceLock<UserId>,
}

impl OnboardingManager {
    pub fn new(
        config: Arc<OnboardingConfig>,
        platform: Arc<dyn Platform>,
        progress: Arc<dyn ProgressStore>,
    ) -> Self {
        Self {
            config,
            platform,
            progress,
            bot_user: OnceLock::new(),
        }
    }

    /// Remember the bot's own user id so its reactions are ignored.
    pub fn set_bot_user(&self, user: UserId) {
        let _ = self.bot_user.set(user);
    }

    pub fn progress(&self) -> &Arc<dyn ProgressStore> {
        &self.progress
    }

    fn is_entry_reaction(&self, reaction: &ReactionEvent) -> bool {
        reaction.guild_id == Some(self.config.guild_id)
            && reaction.channel_id == self.config.entry_channel_id
            && self
                .config
                .entry_message_id
                .is_none_or(|m| m == reaction.message_id)
            && reaction.emoji == self.config.entry_emoji
    }

    /// Step 1: an acknowledgment reaction on the entry message.
    pub async fn handle_reaction(
        &self,
        reaction: &ReactionEvent,
    ) -> Result<EntryOutcome, PlatformError> {
        if !self.is_entry_reaction(reaction) {
            return Ok(EntryOutcome::Ignored);
        }
        if self.bot_user.get() == Some(&reaction.user_id) {
            return Ok(EntryOutcome::Ignored);
        }

        let Some(member) = self.platform.member(reaction.user_id).await? else {
            tracing::debug!(user_id = %reaction.user_id, "Reactor not in guild; ignoring");
            return Ok(EntryOutcome::Ignored);
        };
        if member.is_bot {
            return Ok(EntryOutcome::Ignored);
        }

        if self.config.is_verified(&member) {
            tracing::info!(user_id = %member.id, "Already verified; refusing restart");
            self.send_quietly(member.id, prompts::already_verified()).await?;
            return Ok(EntryOutcome::AlreadyVerified);
        }

        if !member.has_role(self.config.base_role) {
            self.platform.add_role(member.id, self.config.base_role).await?;
        }
        self.progress.begin(member.id).await;
        tracing::info!(user_id = %member.id, "Onboarding started");

        match self.platform.send_dm(member.id, prompts::member_granted()).await? {
            Delivery::Delivered(_) => {
                self.send_quietly(member.id, prompts::domain_prompt()).await?;
                Ok(EntryOutcome::Started { dm_delivered: true })
            }
            Delivery::Blocked => {
                tracing::warn!(user_id = %member.id, "DMs blocked; posting fallback notice");
                self.post_fallback_notice(member.id).await;
                Ok(EntryOutcome::Started { dm_delivered: false })
            }
        }
    }

    /// Steps 2 and 3: a button press from either prompt.
    ///
    /// Guards and role grant only; the caller sends [`SelectionOutcome::reply`]
    /// and then [`OnboardingManager::advance`].
    pub async fn apply_selection(
        &self,
        user: UserId,
        selection: Selection,
    ) -> Result<SelectionOutcome, PlatformError> {
        // Re-fetch: the press may arrive long after the prompt was sent.
        let Some(member) = self.platform.member(user).await? else {
            return Ok(SelectionOutcome::NotInCommunity);
        };

        let already_held = match selection {
            Selection::Domain(_) => !self.config.held_domains(&member).is_empty(),
            Selection::Researcher(_) => !self.config.held_researcher_types(&member).is_empty(),
        };
        if already_held {
            tracing::info!(
                user_id = %user,
                kind = ?selection.kind(),
                "Selection refused; role from this set already held"
            );
            return Ok(SelectionOutcome::AlreadySelected(selection));
        }

        let role = self.config.role_for(selection);
        if !member.has_role(role) {
            self.platform.add_role(user, role).await?;
        }
        let record = self.progress.update(user, selection).await;
        tracing::info!(
            user_id = %user,
            selection = selection.label(),
            tracked = record.is_some(),
            "Selection granted"
        );

        Ok(SelectionOutcome::Granted { selection, record })
    }

    /// Send whatever follows a granted selection: the researcher prompt after
    /// a domain, or completion after a researcher type.
    pub async fn advance(&self, user: UserId, outcome: &SelectionOutcome) -> Result<(), PlatformError> {
        let SelectionOutcome::Granted { selection, .. } = outcome else {
            return Ok(());
        };
        match selection {
            Selection::Domain(_) => self.send_quietly(user, prompts::researcher_prompt()).await,
            Selection::Researcher(_) => self.complete(user).await,
        }
    }

    /// Terminal step: drop the record and congratulate.
    async fn complete(&self, user: UserId) -> Result<(), PlatformError> {
        self.progress.remove(user).await;
        tracing::info!(user_id = %user, "Onboarding complete");
        self.send_quietly(user, prompts::completion()).await
    }

    /// Swap every held role of set `C` for `choice`'s role. Used by admin
    /// overrides; bypasses the one-time guard and leaves progress untouched.
    pub async fn reassign<C: Choice>(
        &self,
        user: UserId,
        choice: C,
        roles: &impl crate::config::RoleLookup<C>,
    ) -> Result<bool, PlatformError> {
        let Some(member) = self.platform.member(user).await? else {
            return Ok(false);
        };

        let target = roles.role(choice);
        for current in held::<C>(roles, &member) {
            let role = roles.role(current);
            if role != target {
                self.platform.remove_role(user, role).await?;
            }
        }
        if !member.has_role(target) {
            self.platform.add_role(user, target).await?;
        }

        tracing::info!(user_id = %user, kind = ?C::KIND, choice = choice.label(), "Role reassigned");
        Ok(true)
    }

    /// DM that is dropped silently if the participant blocks DMs.
    async fn send_quietly(&self, user: UserId, message: OutgoingMessage) -> Result<(), PlatformError> {
        if !self.platform.send_dm(user, message).await?.is_delivered() {
            tracing::debug!(user_id = %user, "DM blocked; suppressed");
        }
        Ok(())
    }

    /// Public, self-deleting notice in the entry channel. Failures are logged only.
    async fn post_fallback_notice(&self, user: UserId) {
        let channel = self.config.entry_channel_id;
        let notice = match self
            .platform
            .send_channel(channel, prompts::dm_fallback_notice(user))
            .await
        {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(user_id = %user, "Failed to post DM fallback notice: {e}");
                return;
            }
        };

        let platform = Arc::clone(&self.platform);
        let ttl = self.config.fallback_notice_ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Err(e) = platform.delete_message(channel, notice).await {
                tracing::warn!(message_id = %notice, "Failed to delete fallback notice: {e}");
            }
        });
    }
}
