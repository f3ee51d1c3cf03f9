//! Recording in-memory `Platform` for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use onboard_bot::config::OnboardingConfig;
use onboard_bot::error::PlatformError;
use onboard_bot::platform::{
    ChannelId, ChatMessage, Delivery, GuildId, Interaction, InteractionId, Member, MessageId,
    OutgoingMessage, Platform, ReactionEvent, RoleId, UserId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleOp {
    Add(UserId, RoleId),
    Remove(UserId, RoleId),
}

/// Fake community: members with mutable role sets, and a log of every
/// outbound call.
#[derive(Default)]
pub struct FakePlatform {
    members: Mutex<HashMap<UserId, Member>>,
    admins: Mutex<HashSet<UserId>>,
    blocked_dms: Mutex<HashSet<UserId>>,
    next_message: AtomicU64,
    fail_lookups: AtomicBool,

    pub role_ops: Mutex<Vec<RoleOp>>,
    pub dms: Mutex<Vec<(UserId, OutgoingMessage)>>,
    pub channel_messages: Mutex<Vec<(ChannelId, MessageId, OutgoingMessage)>>,
    pub deleted: Mutex<Vec<(ChannelId, MessageId)>>,
    pub deferred: Mutex<Vec<InteractionId>>,
    pub followups: Mutex<Vec<(UserId, String)>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            next_message: AtomicU64::new(1000),
            ..Default::default()
        }
    }

    pub fn add_member(&self, id: u64, name: &str, roles: &[RoleId]) -> UserId {
        let user = UserId(id);
        self.members.lock().unwrap().insert(
            user,
            Member {
                id: user,
                display_name: name.to_string(),
                is_bot: false,
                roles: roles.to_vec(),
            },
        );
        user
    }

    pub fn add_bot_member(&self, id: u64) -> UserId {
        let user = self.add_member(id, "some-bot", &[]);
        if let Some(m) = self.members.lock().unwrap().get_mut(&user) {
            m.is_bot = true;
        }
        user
    }

    pub fn make_admin(&self, user: UserId) {
        self.admins.lock().unwrap().insert(user);
    }

    pub fn block_dms(&self, user: UserId) {
        self.blocked_dms.lock().unwrap().insert(user);
    }

    /// Make every member lookup fail with an API error.
    pub fn fail_lookups(&self) {
        self.fail_lookups.store(true, Ordering::SeqCst);
    }

    pub fn roles_of(&self, user: UserId) -> Vec<RoleId> {
        self.members
            .lock()
            .unwrap()
            .get(&user)
            .map(|m| m.roles.clone())
            .unwrap_or_default()
    }

    pub fn dms_to(&self, user: UserId) -> Vec<OutgoingMessage> {
        self.dms
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| *u == user)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn followups_to(&self, user: UserId) -> Vec<String> {
        self.followups
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| *u == user)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn channel_texts(&self) -> Vec<String> {
        self.channel_messages
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, m)| m.content.clone())
            .collect()
    }

    fn new_message_id(&self) -> MessageId {
        MessageId(self.next_message.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn member(&self, user: UserId) -> Result<Option<Member>, PlatformError> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(PlatformError::Api {
                status: 500,
                code: None,
                message: "internal".into(),
            });
        }
        Ok(self.members.lock().unwrap().get(&user).cloned())
    }

    async fn is_administrator(&self, user: UserId) -> Result<bool, PlatformError> {
        Ok(self.admins.lock().unwrap().contains(&user))
    }

    async fn add_role(&self, user: UserId, role: RoleId) -> Result<(), PlatformError> {
        if let Some(m) = self.members.lock().unwrap().get_mut(&user)
            && !m.roles.contains(&role)
        {
            m.roles.push(role);
        }
        self.role_ops.lock().unwrap().push(RoleOp::Add(user, role));
        Ok(())
    }

    async fn remove_role(&self, user: UserId, role: RoleId) -> Result<(), PlatformError> {
        if let Some(m) = self.members.lock().unwrap().get_mut(&user) {
            m.roles.retain(|r| *r != role);
        }
        self.role_ops.lock().unwrap().push(RoleOp::Remove(user, role));
        Ok(())
    }

    async fn send_dm(
        &self,
        user: UserId,
        message: OutgoingMessage,
    ) -> Result<Delivery, PlatformError> {
        if self.blocked_dms.lock().unwrap().contains(&user) {
            return Ok(Delivery::Blocked);
        }
        self.dms.lock().unwrap().push((user, message));
        Ok(Delivery::Delivered(self.new_message_id()))
    }

    async fn send_channel(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> Result<MessageId, PlatformError> {
        let id = self.new_message_id();
        self.channel_messages
            .lock()
            .unwrap()
            .push((channel, id, message));
        Ok(id)
    }

    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), PlatformError> {
        self.deleted.lock().unwrap().push((channel, message));
        Ok(())
    }

    async fn defer_interaction(&self, interaction: &Interaction) -> Result<(), PlatformError> {
        self.deferred.lock().unwrap().push(interaction.id);
        Ok(())
    }

    async fn followup(
        &self,
        interaction: &Interaction,
        content: &str,
    ) -> Result<(), PlatformError> {
        self.followups
            .lock()
            .unwrap()
            .push((interaction.user_id, content.to_string()));
        Ok(())
    }
}

/// ✅ on the configured entry channel.
pub fn entry_reaction(config: &OnboardingConfig, user: UserId) -> ReactionEvent {
    ReactionEvent {
        user_id: user,
        channel_id: config.entry_channel_id,
        message_id: MessageId(42),
        guild_id: Some(config.guild_id),
        emoji: config.entry_emoji.clone(),
    }
}

/// A button press on a prompt sent just now.
pub fn press(user: UserId, custom_id: &str) -> Interaction {
    Interaction {
        id: InteractionId(user.get() ^ 0xABCD),
        application_id: 1,
        token: "tok".into(),
        user_id: user,
        custom_id: custom_id.to_string(),
        message_id: Some(MessageId::from_timestamp(Utc::now(), 1)),
    }
}

/// A guild text message from `author`.
pub fn chat(config: &OnboardingConfig, author: UserId, content: &str) -> ChatMessage {
    ChatMessage {
        id: MessageId(7),
        channel_id: ChannelId(555),
        guild_id: Some(config.guild_id),
        author_id: author,
        author_is_bot: false,
        content: content.to_string(),
    }
}

pub fn other_guild() -> GuildId {
    GuildId(1)
}
