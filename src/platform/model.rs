//! Platform data types: ids, member snapshots, and message payloads.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Discord epoch (2015-01-01T00:00:00Z) in Unix milliseconds.
const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }

            /// Creation time encoded in the upper 42 bits of the snowflake.
            pub fn created_at(self) -> DateTime<Utc> {
                let ms = (self.0 >> 22) + DISCORD_EPOCH_MS;
                Utc.timestamp_millis_opt(ms as i64)
                    .single()
                    .unwrap_or_default()
            }

            /// Build a snowflake whose timestamp is `at`. Worker/sequence bits
            /// are taken from `seq`.
            pub fn from_timestamp(at: DateTime<Utc>, seq: u64) -> Self {
                let ms = (at.timestamp_millis() as u64).saturating_sub(DISCORD_EPOCH_MS);
                Self((ms << 22) | (seq & 0x3F_FFFF))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }
    };
}

snowflake_id!(
    /// A participant (Discord user).
    UserId
);
snowflake_id!(
    /// A guild role; the "attribute" unit of the onboarding flow.
    RoleId
);
snowflake_id!(ChannelId);
snowflake_id!(MessageId);
snowflake_id!(GuildId);
snowflake_id!(InteractionId);

impl UserId {
    /// Mention markup, e.g. `<@123>`.
    pub fn mention(self) -> String {
        format!("<@{}>", self.0)
    }
}

/// Live snapshot of a guild member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: UserId,
    pub display_name: String,
    pub is_bot: bool,
    pub roles: Vec<RoleId>,
}

impl Member {
    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }
}

/// Outcome of a direct-message attempt.
///
/// A blocked DM (recipient disabled DMs from server members) is an expected
/// outcome, not an error; each caller picks its own policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered(MessageId),
    Blocked,
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}

/// Button colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Success,
}

impl ButtonStyle {
    /// Discord component style code.
    pub fn code(self) -> u8 {
        match self {
            Self::Primary => 1,
            Self::Success => 3,
        }
    }
}

/// An interactive button attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub custom_id: String,
    pub style: ButtonStyle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Embed {
    pub title: String,
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<EmbedField>,
}

impl Embed {
    pub fn new(title: impl Into<String>, color: u32) -> Self {
        Self {
            title: title.into(),
            color,
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }
}

/// A message to send: text, an optional embed, and buttons.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutgoingMessage {
    pub content: String,
    pub embed: Option<Embed>,
    pub buttons: Vec<Button>,
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            embed: Some(embed),
            ..Default::default()
        }
    }

    pub fn with_buttons(mut self, buttons: Vec<Button>) -> Self {
        self.buttons = buttons;
        self
    }

    /// Discord `POST /channels/{id}/messages` body.
    pub fn to_json(&self) -> serde_json::Value {
        let mut body = serde_json::json!({ "content": self.content });

        if let Some(ref embed) = self.embed {
            let fields: Vec<serde_json::Value> = embed
                .fields
                .iter()
                .map(|f| serde_json::json!({"name": f.name, "value": f.value, "inline": f.inline}))
                .collect();
            let mut e = serde_json::json!({
                "title": embed.title,
                "color": embed.color,
                "fields": fields,
            });
            if let Some(ref description) = embed.description {
                e["description"] = serde_json::Value::String(description.clone());
            }
            body["embeds"] = serde_json::json!([e]);
        }

        if !self.buttons.is_empty() {
            // Discord allows at most 5 buttons per action row.
            let rows: Vec<serde_json::Value> = self
                .buttons
                .chunks(5)
                .map(|chunk| {
                    let components: Vec<serde_json::Value> = chunk
                        .iter()
                        .map(|b| {
                            serde_json::json!({
                                "type": 2,
                                "style": b.style.code(),
                                "label": b.label,
                                "custom_id": b.custom_id,
                            })
                        })
                        .collect();
                    serde_json::json!({"type": 1, "components": components})
                })
                .collect();
            body["components"] = serde_json::Value::Array(rows);
        }

        body
    }
}

/// A reaction added to a guild message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub user_id: UserId,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub guild_id: Option<GuildId>,
    /// Unicode emoji, or the custom emoji name.
    pub emoji: String,
}

/// A button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    pub id: InteractionId,
    pub application_id: u64,
    pub token: String,
    pub user_id: UserId,
    pub custom_id: String,
    /// The message carrying the pressed button.
    pub message_id: Option<MessageId>,
}

/// A text message posted in a channel the bot can see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub guild_id: Option<GuildId>,
    pub author_id: UserId,
    pub author_is_bot: bool,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snowflake_created_at_known_value() {
        // Example from the Discord developer docs.
        let id = MessageId(175928847299117063);
        assert_eq!(id.created_at().timestamp_millis(), 1_462_015_105_796);
    }

    #[test]
    fn snowflake_from_timestamp_preserves_time() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let id = MessageId::from_timestamp(at, 7);
        assert_eq!(id.created_at(), at);
        assert_eq!(id.get() & 0x3F_FFFF, 7);
    }

    #[test]
    fn user_mention_format() {
        assert_eq!(UserId(42).mention(), "<@42>");
    }

    #[test]
    fn id_parses_from_str() {
        let id: RoleId = "1425066557582872599".parse().unwrap();
        assert_eq!(id, RoleId(1425066557582872599));
        assert!("abc".parse::<RoleId>().is_err());
    }

    #[test]
    fn outgoing_text_has_no_embeds_or_components() {
        let json = OutgoingMessage::text("hi").to_json();
        assert_eq!(json["content"], "hi");
        assert!(json.get("embeds").is_none());
        assert!(json.get("components").is_none());
    }

    #[test]
    fn outgoing_buttons_split_into_rows_of_five() {
        let buttons = (0..7)
            .map(|i| Button {
                label: format!("b{i}"),
                custom_id: format!("id{i}"),
                style: ButtonStyle::Success,
            })
            .collect();
        let json = OutgoingMessage::text("pick").with_buttons(buttons).to_json();
        let rows = json["components"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["components"].as_array().unwrap().len(), 5);
        assert_eq!(rows[1]["components"][1]["custom_id"], "id6");
        assert_eq!(rows[1]["components"][1]["style"], 3);
    }

    #[test]
    fn outgoing_embed_fields_serialized() {
        let embed = Embed::new("Roles for Ada", 0x00ff00)
            .with_field("Domain", "CS/Math", true)
            .with_field("Researcher Type", "None", true);
        let json = OutgoingMessage::embed(embed).to_json();
        let e = &json["embeds"][0];
        assert_eq!(e["title"], "Roles for Ada");
        assert_eq!(e["color"], 0x00ff00);
        assert_eq!(e["fields"][0]["value"], "CS/Math");
        assert!(e.get("description").is_none());
    }
}
