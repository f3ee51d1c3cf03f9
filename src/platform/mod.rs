//! Platform abstraction: the chat platform's member, role, and messaging
//! capabilities the onboarding flow consumes.

pub mod discord;
pub mod gateway;
pub mod model;

use async_trait::async_trait;

use crate::error::PlatformError;

pub use discord::DiscordClient;
pub use gateway::{Gateway, GatewayEvent};
pub use model::*;

/// Operations the bot performs against the community.
///
/// Scoped to the single configured guild; implementations carry the guild id.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Fetch a live member snapshot. `Ok(None)` if the user is not in the guild.
    async fn member(&self, user: UserId) -> Result<Option<Member>, PlatformError>;

    /// Whether the user owns the guild or holds a role with ADMINISTRATOR.
    async fn is_administrator(&self, user: UserId) -> Result<bool, PlatformError>;

    async fn add_role(&self, user: UserId, role: RoleId) -> Result<(), PlatformError>;

    async fn remove_role(&self, user: UserId, role: RoleId) -> Result<(), PlatformError>;

    /// Send a direct message. A recipient who blocks DMs yields `Delivery::Blocked`.
    async fn send_dm(&self, user: UserId, message: OutgoingMessage)
    -> Result<Delivery, PlatformError>;

    async fn send_channel(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> Result<MessageId, PlatformError>;

    async fn delete_message(&self, channel: ChannelId, message: MessageId)
    -> Result<(), PlatformError>;

    /// Acknowledge a button press; the reply will follow as an ephemeral message.
    async fn defer_interaction(&self, interaction: &Interaction) -> Result<(), PlatformError>;

    /// Ephemeral follow-up to a deferred interaction.
    async fn followup(&self, interaction: &Interaction, content: &str)
    -> Result<(), PlatformError>;
}
