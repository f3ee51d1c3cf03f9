//! Error types for the onboarding bot.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Discord REST API errors.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Discord API returned {status} (code {code:?}): {message}")]
    Api {
        status: u16,
        code: Option<u64>,
        message: String,
    },

    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Authentication failed: check DISCORD_TOKEN")]
    AuthFailed,
}

impl From<reqwest::Error> for PlatformError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

/// Gateway (websocket) session errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Failed to connect: {0}")]
    Connect(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Connection closed (code {code:?}): {reason}")]
    Closed { code: Option<u16>, reason: String },

    #[error("Gateway rejected the token")]
    AuthFailed,

    #[error("Heartbeat not acknowledged")]
    HeartbeatTimeout,
}

/// Errors raised while parsing or running a prefix command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Command \"{0}\" is not found")]
    UnknownCommand(String),

    #[error("{0} is a required argument that is missing.")]
    MissingArgument(&'static str),

    #[error("Member \"{0}\" not found.")]
    MemberNotFound(String),

    #[error("You are missing Administrator permission(s) to run this command.")]
    MissingPermissions,

    #[error("{0}")]
    Platform(#[from] PlatformError),
}
