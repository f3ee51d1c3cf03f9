//! Discord gateway — websocket event stream.
//!
//! Keeps one session alive (hello → identify → heartbeat) and forwards the
//! dispatches the bot cares about as [`GatewayEvent`]s. Any session failure
//! reconnects after a short backoff, the same way a long-poll loop retries.

use std::pin::Pin;
use std::time::Duration;

use futures::{SinkExt, Stream, StreamExt};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::error::GatewayError;
use crate::platform::discord::snowflake;
use crate::platform::{
    ChannelId, ChatMessage, GuildId, Interaction, InteractionId, MessageId, ReactionEvent, UserId,
};

const GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

const OP_DISPATCH: u64 = 0;
const OP_HEARTBEAT: u64 = 1;
const OP_IDENTIFY: u64 = 2;
const OP_RECONNECT: u64 = 7;
const OP_INVALID_SESSION: u64 = 9;
const OP_HELLO: u64 = 10;
const OP_HEARTBEAT_ACK: u64 = 11;

/// Close code: authentication failed.
const CLOSE_AUTHENTICATION_FAILED: u16 = 4004;
/// Close code: disallowed (privileged, not enabled) intents.
const CLOSE_DISALLOWED_INTENTS: u16 = 4014;

/// Interaction type: message component (button press).
const INTERACTION_MESSAGE_COMPONENT: u64 = 3;

pub const INTENT_GUILDS: u64 = 1 << 0;
pub const INTENT_GUILD_MESSAGES: u64 = 1 << 9;
pub const INTENT_GUILD_MESSAGE_REACTIONS: u64 = 1 << 10;
pub const INTENT_MESSAGE_CONTENT: u64 = 1 << 15;

/// Intents needed for reactions and prefix commands.
pub const DEFAULT_INTENTS: u64 =
    INTENT_GUILDS | INTENT_GUILD_MESSAGES | INTENT_GUILD_MESSAGE_REACTIONS | INTENT_MESSAGE_CONTENT;

const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// Events forwarded to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    Ready { user_id: UserId, guild_count: usize },
    ReactionAdd(ReactionEvent),
    Interaction(Interaction),
    Message(ChatMessage),
}

pub type EventStream = Pin<Box<dyn Stream<Item = GatewayEvent> + Send>>;

/// Gateway connection settings.
pub struct Gateway {
    token: SecretString,
    intents: u64,
    url: String,
}

impl Gateway {
    pub fn new(token: SecretString) -> Self {
        Self {
            token,
            intents: DEFAULT_INTENTS,
            url: GATEWAY_URL.to_string(),
        }
    }

    /// Spawn the session loop and return the event stream.
    pub fn start(self) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                match self.run_session(&tx).await {
                    Ok(()) => {
                        tracing::info!("Gateway event receiver dropped; stopping");
                        return;
                    }
                    Err(GatewayError::AuthFailed) => {
                        tracing::error!("Gateway rejected the bot token; stopping");
                        return;
                    }
                    Err(e) => {
                        tracing::warn!("Gateway session ended: {e}; reconnecting");
                        tokio::time::sleep(RECONNECT_BACKOFF).await;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|ev| (ev, rx))
        });

        Box::pin(stream)
    }

    /// Run one session. `Ok(())` only when the event receiver is gone.
    async fn run_session(
        &self,
        tx: &mpsc::UnboundedSender<GatewayEvent>,
    ) -> Result<(), GatewayError> {
        let (ws, _resp) = connect_async(self.url.as_str())
            .await
            .map_err(|e| GatewayError::Connect(e.to_string()))?;
        let (mut write, mut read) = ws.split();

        // First frame must be HELLO.
        let hello = loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => break parse_frame(text.as_str())?,
                Some(Ok(Message::Close(frame))) => return Err(close_error(frame)),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(GatewayError::Protocol(e.to_string())),
                None => {
                    return Err(GatewayError::Closed {
                        code: None,
                        reason: "stream ended before hello".into(),
                    });
                }
            }
        };
        if hello.op != OP_HELLO {
            return Err(GatewayError::Protocol(format!(
                "expected hello, got op {}",
                hello.op
            )));
        }
        let interval = hello
            .d
            .get("heartbeat_interval")
            .and_then(serde_json::Value::as_u64)
            .map(Duration::from_millis)
            .ok_or_else(|| GatewayError::Protocol("hello without heartbeat_interval".into()))?;

        let identify = serde_json::json!({
            "op": OP_IDENTIFY,
            "d": {
                "token": self.token.expose_secret(),
                "intents": self.intents,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "onboard-bot",
                    "device": "onboard-bot"
                }
            }
        });
        send_json(&mut write, &identify).await?;

        // First beat is jittered per the gateway docs.
        let jitter = rand::thread_rng().gen_range(0.0..1.0);
        let first_beat = tokio::time::Instant::now() + interval.mul_f64(jitter);
        let mut heartbeat = tokio::time::interval_at(first_beat, interval);

        let mut sequence: Option<u64> = None;
        let mut awaiting_ack = false;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    if awaiting_ack {
                        return Err(GatewayError::HeartbeatTimeout);
                    }
                    send_json(&mut write, &serde_json::json!({"op": OP_HEARTBEAT, "d": sequence})).await?;
                    awaiting_ack = true;
                }
                frame = read.next() => {
                    let text = match frame {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(frame))) => return Err(close_error(frame)),
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => return Err(GatewayError::Protocol(e.to_string())),
                        None => {
                            return Err(GatewayError::Closed { code: None, reason: "stream ended".into() });
                        }
                    };

                    let frame = parse_frame(text.as_str())?;
                    if let Some(s) = frame.s {
                        sequence = Some(s);
                    }

                    match frame.op {
                        OP_DISPATCH => {
                            let Some(event_type) = frame.t.as_deref() else { continue };
                            match parse_dispatch(event_type, &frame.d) {
                                Some(event) => {
                                    if tx.send(event).is_err() {
                                        return Ok(());
                                    }
                                }
                                None => tracing::trace!(event_type, "Ignoring dispatch"),
                            }
                        }
                        OP_HEARTBEAT => {
                            send_json(&mut write, &serde_json::json!({"op": OP_HEARTBEAT, "d": sequence})).await?;
                        }
                        OP_HEARTBEAT_ACK => awaiting_ack = false,
                        OP_RECONNECT => {
                            return Err(GatewayError::Closed { code: None, reason: "server requested reconnect".into() });
                        }
                        OP_INVALID_SESSION => {
                            return Err(GatewayError::Closed { code: None, reason: "invalid session".into() });
                        }
                        other => tracing::trace!(op = other, "Ignoring gateway opcode"),
                    }
                }
            }
        }
    }
}

// ── Frame parsing ───────────────────────────────────────────────────

/// A raw gateway payload.
#[derive(Debug)]
struct Frame {
    op: u64,
    d: serde_json::Value,
    s: Option<u64>,
    t: Option<String>,
}

fn parse_frame(text: &str) -> Result<Frame, GatewayError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| GatewayError::Protocol(e.to_string()))?;
    let op = value
        .get("op")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| GatewayError::Protocol("frame without op".into()))?;
    Ok(Frame {
        op,
        d: value.get("d").cloned().unwrap_or(serde_json::Value::Null),
        s: value.get("s").and_then(serde_json::Value::as_u64),
        t: value.get("t").and_then(|t| t.as_str()).map(String::from),
    })
}

fn close_error(frame: Option<tokio_tungstenite::tungstenite::protocol::CloseFrame>) -> GatewayError {
    let code = frame.as_ref().map(|f| u16::from(f.code));
    match code {
        Some(CLOSE_AUTHENTICATION_FAILED) | Some(CLOSE_DISALLOWED_INTENTS) => GatewayError::AuthFailed,
        _ => GatewayError::Closed {
            code,
            reason: frame.map(|f| f.reason.as_str().to_string()).unwrap_or_default(),
        },
    }
}

async fn send_json<S>(write: &mut S, value: &serde_json::Value) -> Result<(), GatewayError>
where
    S: futures::Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    write
        .send(Message::Text(value.to_string().into()))
        .await
        .map_err(|e| GatewayError::Protocol(e.to_string()))
}

/// Map a dispatch (`t`, `d`) to an event, or `None` if the bot ignores it.
pub fn parse_dispatch(event_type: &str, d: &serde_json::Value) -> Option<GatewayEvent> {
    match event_type {
        "READY" => {
            let user_id = d.get("user").and_then(|u| snowflake(u, "id"))?;
            let guild_count = d
                .get("guilds")
                .and_then(serde_json::Value::as_array)
                .map(Vec::len)
                .unwrap_or(0);
            Some(GatewayEvent::Ready {
                user_id: UserId(user_id),
                guild_count,
            })
        }
        "MESSAGE_REACTION_ADD" => {
            let emoji = d.get("emoji")?;
            let emoji = emoji
                .get("name")
                .and_then(|n| n.as_str())
                .unwrap_or_default()
                .to_string();
            Some(GatewayEvent::ReactionAdd(ReactionEvent {
                user_id: UserId(snowflake(d, "user_id")?),
                channel_id: ChannelId(snowflake(d, "channel_id")?),
                message_id: MessageId(snowflake(d, "message_id")?),
                guild_id: snowflake(d, "guild_id").map(GuildId),
                emoji,
            }))
        }
        "INTERACTION_CREATE" => {
            if d.get("type").and_then(serde_json::Value::as_u64) != Some(INTERACTION_MESSAGE_COMPONENT) {
                return None;
            }
            // Guild interactions carry `member.user`; DM interactions carry `user`.
            let user = d
                .get("member")
                .and_then(|m| m.get("user"))
                .or_else(|| d.get("user"))?;
            Some(GatewayEvent::Interaction(Interaction {
                id: InteractionId(snowflake(d, "id")?),
                application_id: snowflake(d, "application_id")?,
                token: d.get("token")?.as_str()?.to_string(),
                user_id: UserId(snowflake(user, "id")?),
                custom_id: d.get("data")?.get("custom_id")?.as_str()?.to_string(),
                message_id: d.get("message").and_then(|m| snowflake(m, "id")).map(MessageId),
            }))
        }
        "MESSAGE_CREATE" => {
            let author = d.get("author")?;
            Some(GatewayEvent::Message(ChatMessage {
                id: MessageId(snowflake(d, "id")?),
                channel_id: ChannelId(snowflake(d, "channel_id")?),
                guild_id: snowflake(d, "guild_id").map(GuildId),
                author_id: UserId(snowflake(author, "id")?),
                author_is_bot: author.get("bot").and_then(|b| b.as_bool()).unwrap_or(false),
                content: d
                    .get("content")
                    .and_then(|c| c.as_str())
                    .unwrap_or_default()
                    .to_string(),
            }))
        }
        _ => None,
    }
}

// ── Tests ───────────────────────────────────────────────────────────
