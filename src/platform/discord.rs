//! Discord REST client — implements [`Platform`] over the HTTP API.
//!
//! Plain `reqwest` calls against `https://discord.com/api/v10`; every call is
//! scoped to the single configured guild.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;

use crate::error::PlatformError;
use crate::platform::{
    ChannelId, Delivery, GuildId, Interaction, Member, MessageId, OutgoingMessage, Platform, RoleId,
    UserId,
};

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// JSON error code: "Cannot send messages to this user".
const ERROR_CANNOT_DM_USER: u64 = 50007;

/// JSON error code: "Unknown Member".
const ERROR_UNKNOWN_MEMBER: u64 = 10007;

/// ADMINISTRATOR permission bit.
const PERMISSION_ADMINISTRATOR: u64 = 1 << 3;

/// Interaction callback: deferred channel message with source.
const CALLBACK_DEFERRED_MESSAGE: u8 = 5;

/// Message flag: only the invoking user sees it.
const FLAG_EPHEMERAL: u64 = 1 << 6;

const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Discord REST client bound to one guild.
pub struct DiscordClient {
    token: SecretString,
    guild_id: GuildId,
    base_url: String,
    client: reqwest::Client,
    /// DM channel ids already opened, by recipient.
    dm_channels: RwLock<HashMap<UserId, ChannelId>>,
}

impl DiscordClient {
    pub fn new(token: SecretString, guild_id: GuildId) -> Self {
        Self {
            token,
            guild_id,
            base_url: DISCORD_API_BASE.to_string(),
            client: reqwest::Client::new(),
            dm_channels: RwLock::new(HashMap::new()),
        }
    }

    /// Point the client at a different API root (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Issue a request, retrying on 429. Returns `None` for empty (204) bodies.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Option<serde_json::Value>, PlatformError> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let mut req = self
                .client
                .request(method.clone(), self.api_url(path))
                .header(
                    reqwest::header::AUTHORIZATION,
                    format!("Bot {}", self.token.expose_secret()),
                )
                .header(
                    reqwest::header::USER_AGENT,
                    format!("DiscordBot (onboard-bot, {})", env!("CARGO_PKG_VERSION")),
                );
            if let Some(body) = body {
                req = req.json(body);
            }

            let resp = req.send().await?;
            let status = resp.status();

            if status == reqwest::StatusCode::NO_CONTENT {
                return Ok(None);
            }

            let text = resp.text().await.unwrap_or_default();

            if status.is_success() {
                if text.is_empty() {
                    return Ok(None);
                }
                return serde_json::from_str(&text)
                    .map(Some)
                    .map_err(|e| PlatformError::InvalidResponse(e.to_string()));
            }

            let err = api_error(status.as_u16(), &text);
            if let PlatformError::RateLimited { retry_after } = err
                && attempt < MAX_RATE_LIMIT_RETRIES
            {
                let wait = retry_after.unwrap_or(Duration::from_secs(1));
                tracing::warn!(path, ?wait, attempt, "Discord rate limit hit; retrying");
                tokio::time::sleep(wait).await;
                continue;
            }
            return Err(err);
        }
    }

    async fn dm_channel(&self, user: UserId) -> Result<ChannelId, PlatformError> {
        if let Some(id) = self.dm_channels.read().await.get(&user) {
            return Ok(*id);
        }

        let body = serde_json::json!({ "recipient_id": user.to_string() });
        let channel = self
            .request(Method::POST, "/users/@me/channels", Some(&body))
            .await?
            .ok_or_else(|| PlatformError::InvalidResponse("empty DM channel response".into()))?;
        let id = snowflake(&channel, "id")
            .map(ChannelId)
            .ok_or_else(|| PlatformError::InvalidResponse("DM channel without id".into()))?;

        self.dm_channels.write().await.insert(user, id);
        Ok(id)
    }

    async fn post_message(
        &self,
        channel: ChannelId,
        message: &OutgoingMessage,
    ) -> Result<MessageId, PlatformError> {
        let created = self
            .request(
                Method::POST,
                &format!("/channels/{channel}/messages"),
                Some(&message.to_json()),
            )
            .await?
            .ok_or_else(|| PlatformError::InvalidResponse("empty message response".into()))?;
        snowflake(&created, "id")
            .map(MessageId)
            .ok_or_else(|| PlatformError::InvalidResponse("message without id".into()))
    }
}

#[async_trait]
impl Platform for DiscordClient {
    async fn member(&self, user: UserId) -> Result<Option<Member>, PlatformError> {
        let path = format!("/guilds/{}/members/{user}", self.guild_id);
        match self.request(Method::GET, &path, None).await {
            Ok(Some(value)) => parse_member(&value)
                .map(Some)
                .ok_or_else(|| PlatformError::InvalidResponse("malformed guild member".into())),
            Ok(None) => Ok(None),
            Err(PlatformError::Api { status: 404, .. }) => Ok(None),
            Err(PlatformError::Api {
                code: Some(ERROR_UNKNOWN_MEMBER),
                ..
            }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn is_administrator(&self, user: UserId) -> Result<bool, PlatformError> {
        let Some(member) = self.member(user).await? else {
            return Ok(false);
        };
        let guild = self
            .request(Method::GET, &format!("/guilds/{}", self.guild_id), None)
            .await?
            .ok_or_else(|| PlatformError::InvalidResponse("empty guild response".into()))?;
        Ok(member_is_administrator(&guild, self.guild_id, &member))
    }

    async fn add_role(&self, user: UserId, role: RoleId) -> Result<(), PlatformError> {
        let path = format!("/guilds/{}/members/{user}/roles/{role}", self.guild_id);
        self.request(Method::PUT, &path, None).await?;
        tracing::debug!(user_id = %user, role_id = %role, "Role added");
        Ok(())
    }

    async fn remove_role(&self, user: UserId, role: RoleId) -> Result<(), PlatformError> {
        let path = format!("/guilds/{}/members/{user}/roles/{role}", self.guild_id);
        self.request(Method::DELETE, &path, None).await?;
        tracing::debug!(user_id = %user, role_id = %role, "Role removed");
        Ok(())
    }

    async fn send_dm(
        &self,
        user: UserId,
        message: OutgoingMessage,
    ) -> Result<Delivery, PlatformError> {
        let channel = match self.dm_channel(user).await {
            Ok(c) => c,
            Err(e) if is_dm_blocked(&e) => return Ok(Delivery::Blocked),
            Err(e) => return Err(e),
        };
        match self.post_message(channel, &message).await {
            Ok(id) => Ok(Delivery::Delivered(id)),
            Err(e) if is_dm_blocked(&e) => Ok(Delivery::Blocked),
            Err(e) => Err(e),
        }
    }

    async fn send_channel(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> Result<MessageId, PlatformError> {
        self.post_message(channel, &message).await
    }

    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), PlatformError> {
        self.request(
            Method::DELETE,
            &format!("/channels/{channel}/messages/{message}"),
            None,
        )
        .await?;
        Ok(())
    }

    async fn defer_interaction(&self, interaction: &Interaction) -> Result<(), PlatformError> {
        let body = serde_json::json!({
            "type": CALLBACK_DEFERRED_MESSAGE,
            "data": { "flags": FLAG_EPHEMERAL }
        });
        self.request(
            Method::POST,
            &format!("/interactions/{}/{}/callback", interaction.id, interaction.token),
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn followup(
        &self,
        interaction: &Interaction,
        content: &str,
    ) -> Result<(), PlatformError> {
        let body = serde_json::json!({
            "content": content,
            "flags": FLAG_EPHEMERAL
        });
        self.request(
            Method::POST,
            &format!("/webhooks/{}/{}", interaction.application_id, interaction.token),
            Some(&body),
        )
        .await?;
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Read a snowflake field; Discord sends ids as decimal strings.
pub(crate) fn snowflake(value: &serde_json::Value, key: &str) -> Option<u64> {
    match value.get(key)? {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

/// Classify a non-success response.
fn api_error(status: u16, body: &str) -> PlatformError {
    let json: serde_json::Value = serde_json::from_str(body).unwrap_or_default();

    match status {
        401 => PlatformError::AuthFailed,
        429 => PlatformError::RateLimited {
            retry_after: json
                .get("retry_after")
                .and_then(serde_json::Value::as_f64)
                .map(Duration::from_secs_f64),
        },
        _ => PlatformError::Api {
            status,
            code: json.get("code").and_then(serde_json::Value::as_u64),
            message: json
                .get("message")
                .and_then(serde_json::Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| body.chars().take(200).collect()),
        },
    }
}

fn is_dm_blocked(err: &PlatformError) -> bool {
    matches!(
        err,
        PlatformError::Api {
            code: Some(ERROR_CANNOT_DM_USER),
            ..
        }
    )
}

/// Parse a guild member object.
fn parse_member(value: &serde_json::Value) -> Option<Member> {
    let user = value.get("user")?;
    let id = snowflake(user, "id")?;

    let display_name = value
        .get("nick")
        .and_then(|v| v.as_str())
        .or_else(|| user.get("global_name").and_then(|v| v.as_str()))
        .or_else(|| user.get("username").and_then(|v| v.as_str()))
        .unwrap_or("unknown")
        .to_string();

    let roles = value
        .get("roles")
        .and_then(serde_json::Value::as_array)
        .map(|roles| {
            roles
                .iter()
                .filter_map(|r| r.as_str().and_then(|s| s.parse().ok()))
                .map(RoleId)
                .collect()
        })
        .unwrap_or_default();

    Some(Member {
        id: UserId(id),
        display_name,
        is_bot: user.get("bot").and_then(|v| v.as_bool()).unwrap_or(false),
        roles,
    })
}

/// Owner, or any held role (including @everyone) carrying ADMINISTRATOR.
fn member_is_administrator(guild: &serde_json::Value, guild_id: GuildId, member: &Member) -> bool {
    if snowflake(guild, "owner_id") == Some(member.id.get()) {
        return true;
    }

    let Some(roles) = guild.get("roles").and_then(serde_json::Value::as_array) else {
        return false;
    };

    roles.iter().any(|role| {
        let Some(id) = snowflake(role, "id") else {
            return false;
        };
        let held = id == guild_id.get() || member.has_role(RoleId(id));
        let permissions = role
            .get("permissions")
            .and_then(|p| p.as_str())
            .and_then(|p| p.parse::<u64>().ok())
            .unwrap_or(0);
        held && permissions & PERMISSION_ADMINISTRATOR != 0
    })
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> DiscordClient {
        DiscordClient::new(SecretString::from("fake-token"), GuildId(1))
    }

    #[test]
    fn discord_api_url() {
        assert_eq!(
            client().api_url("/guilds/1"),
            "https://discord.com/api/v10/guilds/1"
        );
    }

    #[test]
    fn api_error_blocked_dm() {
        let err = api_error(403, r#"{"message": "Cannot send messages to this user", "code": 50007}"#);
        assert!(is_dm_blocked(&err));
    }

    #[test]
    fn api_error_other_forbidden_is_not_blocked_dm() {
        let err = api_error(403, r#"{"message": "Missing Permissions", "code": 50013}"#);
        assert!(!is_dm_blocked(&err));
        match err {
            PlatformError::Api { status, code, message } => {
                assert_eq!(status, 403);
                assert_eq!(code, Some(50013));
                assert_eq!(message, "Missing Permissions");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn api_error_rate_limited_reads_retry_after() {
        let err = api_error(429, r#"{"message": "You are being rate limited.", "retry_after": 0.5, "global": false}"#);
        match err {
            PlatformError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Some(Duration::from_millis(500)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn api_error_unauthorized() {
        assert!(matches!(api_error(401, "{}"), PlatformError::AuthFailed));
    }

    #[test]
    fn api_error_non_json_body_kept_as_message() {
        match api_error(502, "Bad Gateway") {
            PlatformError::Api { code, message, .. } => {
                assert_eq!(code, None);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parse_member_prefers_nick() {
        let value = serde_json::json!({
            "user": {"id": "42", "username": "ada", "global_name": "Ada L"},
            "nick": "Countess",
            "roles": ["100", "200"]
        });
        let m = parse_member(&value).unwrap();
        assert_eq!(m.id, UserId(42));
        assert_eq!(m.display_name, "Countess");
        assert_eq!(m.roles, vec![RoleId(100), RoleId(200)]);
        assert!(!m.is_bot);
    }

    #[test]
    fn parse_member_falls_back_to_username_and_flags_bots() {
        let value = serde_json::json!({
            "user": {"id": "7", "username": "helper", "global_name": null, "bot": true},
            "nick": null,
            "roles": []
        });
        let m = parse_member(&value).unwrap();
        assert_eq!(m.display_name, "helper");
        assert!(m.is_bot);
        assert!(m.roles.is_empty());
    }

    #[test]
    fn parse_member_without_user_is_none() {
        assert!(parse_member(&serde_json::json!({"roles": []})).is_none());
    }

    fn member(id: u64, roles: &[u64]) -> Member {
        Member {
            id: UserId(id),
            display_name: "m".into(),
            is_bot: false,
            roles: roles.iter().copied().map(RoleId).collect(),
        }
    }

    #[test]
    fn administrator_by_ownership() {
        let guild = serde_json::json!({"owner_id": "5", "roles": []});
        assert!(member_is_administrator(&guild, GuildId(1), &member(5, &[])));
        assert!(!member_is_administrator(&guild, GuildId(1), &member(6, &[])));
    }

    #[test]
    fn administrator_by_role_permission() {
        let guild = serde_json::json!({
            "owner_id": "5",
            "roles": [
                {"id": "1", "permissions": "0"},
                {"id": "10", "permissions": "8"},
                {"id": "11", "permissions": "2048"}
            ]
        });
        assert!(member_is_administrator(&guild, GuildId(1), &member(6, &[10])));
        assert!(!member_is_administrator(&guild, GuildId(1), &member(6, &[11])));
    }

    #[test]
    fn administrator_via_everyone_role() {
        let guild = serde_json::json!({
            "owner_id": "5",
            "roles": [{"id": "1", "permissions": "8"}]
        });
        assert!(member_is_administrator(&guild, GuildId(1), &member(6, &[])));
    }

    #[test]
    fn snowflake_accepts_strings_and_numbers() {
        let v = serde_json::json!({"a": "123", "b": 456, "c": true});
        assert_eq!(snowflake(&v, "a"), Some(123));
        assert_eq!(snowflake(&v, "b"), Some(456));
        assert_eq!(snowflake(&v, "c"), None);
        assert_eq!(snowflake(&v, "missing"), None);
    }

    // ── Network error tests (no server listening) ───────────────────

    #[tokio::test]
    async fn discord_request_to_closed_port_is_http_error() {
        let ch = client().with_base_url("http://127.0.0.1:1");
        let result = ch.add_role(UserId(1), RoleId(2)).await;
        assert!(matches!(result, Err(PlatformError::Http(_))));
    }
}
