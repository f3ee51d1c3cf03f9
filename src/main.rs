use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use onboard_bot::bot::Bot;
use onboard_bot::config::{DiscordConfig, OnboardingConfig};
use onboard_bot::error::ConfigError;
use onboard_bot::health::spawn_health_server;
use onboard_bot::platform::{DiscordClient, Gateway, Platform};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let (discord, config) = load_config().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    eprintln!("🤖 Onboard Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Guild: {}", config.guild_id);
    eprintln!("   Entry channel: {}", config.entry_channel_id);
    eprintln!("   Command prefix: {}", config.command_prefix);

    // ── Liveness ────────────────────────────────────────────────────────
    if let Some(port) = config.health_port {
        let addr = spawn_health_server(port).await?;
        eprintln!("   Health: http://{addr}/");
    }

    // ── Discord ─────────────────────────────────────────────────────────
    let platform: Arc<dyn Platform> = Arc::new(DiscordClient::new(
        SecretString::from(discord.token.expose_secret()),
        config.guild_id,
    ));
    let events = Gateway::new(discord.token).start();

    let bot = Arc::new(Bot::new(config, platform));
    bot.run(events).await;

    Ok(())
}

fn load_config() -> Result<(DiscordConfig, OnboardingConfig), ConfigError> {
    Ok((DiscordConfig::from_env()?, OnboardingConfig::from_env()?))
}
