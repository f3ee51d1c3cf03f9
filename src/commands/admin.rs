//! Administrative override commands.

use std::sync::Arc;

use super::{Command, CommandName, split_invocation};
use crate::config::{OnboardingConfig, RoleLookup};
use crate::error::CommandError;
use crate::onboarding::{Choice, Domain, OnboardingManager, ResearcherType};
use crate::platform::{ChatMessage, Embed, Member, OutgoingMessage, Platform, UserId};

const ROLES_EMBED_COLOR: u32 = 0x00ff00;

/// Runs prefix commands posted in the community.
pub struct CommandHandler {
    config: Arc<OnboardingConfig>,
    platform: Arc<dyn Platform>,
    manager: Arc<OnboardingManager>,
}

impl CommandHandler {
    pub fn new(
        config: Arc<OnboardingConfig>,
        platform: Arc<dyn Platform>,
        manager: Arc<OnboardingManager>,
    ) -> Self {
        Self {
            config,
            platform,
            manager,
        }
    }

    /// Handle a chat message. Sends the command's reply, or `Error: ...` on
    /// failure, to the message's channel. Returns whether a command ran.
    pub async fn handle_message(&self, message: &ChatMessage) -> bool {
        if message.author_is_bot || message.guild_id != Some(self.config.guild_id) {
            return false;
        }
        let Some((name, args)) = split_invocation(&message.content, &self.config.command_prefix)
        else {
            return false;
        };

        let reply = match self.run(message.author_id, name, args).await {
            Ok(reply) => reply,
            Err(CommandError::UnknownCommand(name)) => {
                tracing::debug!(command = %name, "Ignoring unknown command");
                return false;
            }
            Err(e) => {
                tracing::warn!(user_id = %message.author_id, command = name, "Command failed: {e}");
                OutgoingMessage::text(format!("Error: {e}"))
            }
        };

        if let Err(e) = self.platform.send_channel(message.channel_id, reply).await {
            tracing::warn!(channel_id = %message.channel_id, command = name, "Failed to send reply: {e}");
        }
        true
    }

    /// Resolve, authorize, parse, execute. Permission is checked before the
    /// arguments are looked at.
    pub async fn run(
        &self,
        invoker: UserId,
        name: &str,
        args: &str,
    ) -> Result<OutgoingMessage, CommandError> {
        let name =
            CommandName::parse(name).ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;

        if name.is_privileged() && !self.platform.is_administrator(invoker).await? {
            tracing::info!(user_id = %invoker, command = name.as_str(), "Refused non-admin");
            return Err(CommandError::MissingPermissions);
        }

        let command = Command::parse(name, args)?;
        tracing::info!(user_id = %invoker, command = name.as_str(), "Running command");
        self.execute(invoker, command).await
    }

    async fn execute(
        &self,
        invoker: UserId,
        command: Command,
    ) -> Result<OutgoingMessage, CommandError> {
        match command {
            Command::ChangeDomain { member, label } => {
                self.change::<Domain>(member, &label, &self.config.domain_roles)
                    .await
            }
            Command::ChangeResearcher { member, label } => {
                self.change::<ResearcherType>(member, &label, &self.config.researcher_roles)
                    .await
            }
            Command::ViewRoles { member } => {
                let member = self.resolve(member).await?;
                Ok(self.roles_embed(&member))
            }
            Command::CheckProgress { member } => {
                let member = self.resolve(member.unwrap_or(invoker)).await?;
                Ok(self.progress_report(&member).await)
            }
            Command::ResetProgress { member } => {
                let member = self.resolve(member).await?;
                let text = match self.manager.progress().remove(member.id).await {
                    Some(_) => {
                        tracing::info!(user_id = %member.id, "Progress reset");
                        format!("Reset progress for {}", member.display_name)
                    }
                    None => format!("No progress found for {}", member.display_name),
                };
                Ok(OutgoingMessage::text(text))
            }
            Command::Test => Ok(OutgoingMessage::text("✅ Bot is working!")),
        }
    }

    /// Shared body of `change_domain` and `change_researcher`.
    async fn change<C: Choice>(
        &self,
        user: UserId,
        label: &str,
        roles: &impl RoleLookup<C>,
    ) -> Result<OutgoingMessage, CommandError> {
        let member = self.resolve(user).await?;

        let Some(choice) = C::from_label(label) else {
            return Ok(OutgoingMessage::text(format!(
                "❌ Invalid {}. Choose from: {}",
                C::KIND.noun(),
                C::label_list()
            )));
        };

        if !self.manager.reassign(member.id, choice, roles).await? {
            return Err(CommandError::MemberNotFound(user.to_string()));
        }
        Ok(OutgoingMessage::text(format!(
            "✅ Changed {}'s {} to **{}**",
            member.id.mention(),
            C::KIND.noun(),
            choice.label()
        )))
    }

    async fn resolve(&self, user: UserId) -> Result<Member, CommandError> {
        self.platform
            .member(user)
            .await?
            .ok_or_else(|| CommandError::MemberNotFound(user.to_string()))
    }

    fn roles_embed(&self, member: &Member) -> OutgoingMessage {
        let domains = self.config.held_domains(member);
        let researchers = self.config.held_researcher_types(member);
        let embed = Embed::new(format!("Roles for {}", member.display_name), ROLES_EMBED_COLOR)
            .with_field("Domain", first_label(&domains), true)
            .with_field("Researcher Type", first_label(&researchers), true);
        OutgoingMessage::embed(embed)
    }

    async fn progress_report(&self, member: &Member) -> OutgoingMessage {
        let text = match self.manager.progress().get(member.id).await {
            Some(record) => format!(
                "**{}'s Progress:**\nStep: {}/{}\nDomain: {}\nResearcher: {}",
                member.display_name,
                record.step.number(),
                crate::onboarding::OnboardingStep::TOTAL,
                record.domain_label(),
                record.researcher_label()
            ),
            None => format!("{} hasn't started the verification process.", member.display_name),
        };
        OutgoingMessage::text(text)
    }
}

fn first_label<C: Choice>(held: &[C]) -> &'static str {
    held.first().map_or("None", |c| c.label())
}
