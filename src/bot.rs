//! Event dispatcher: routes gateway events to onboarding and commands.

use std::sync::Arc;

use futures::{Stream, StreamExt};

use crate::commands::CommandHandler;
use crate::config::OnboardingConfig;
use crate::onboarding::{InMemoryProgressStore, OnboardingManager, ProgressStore, SelectionMenus};
use crate::platform::{GatewayEvent, Platform};

/// The assembled bot.
pub struct Bot {
    manager: Arc<OnboardingManager>,
    menus: Arc<SelectionMenus>,
    commands: Arc<CommandHandler>,
}

impl Bot {
    /// Wire the components over `platform` with an empty in-memory tracker.
    pub fn new(config: OnboardingConfig, platform: Arc<dyn Platform>) -> Self {
        Self::with_store(config, platform, Arc::new(InMemoryProgressStore::new()))
    }

    pub fn with_store(
        config: OnboardingConfig,
        platform: Arc<dyn Platform>,
        progress: Arc<dyn ProgressStore>,
    ) -> Self {
        let config = Arc::new(config);
        let manager = Arc::new(OnboardingManager::new(
            Arc::clone(&config),
            Arc::clone(&platform),
            progress,
        ));
        let menus = Arc::new(SelectionMenus::new(
            Arc::clone(&manager),
            Arc::clone(&platform),
            config.prompt_timeout,
        ));
        let commands = Arc::new(CommandHandler::new(config, platform, Arc::clone(&manager)));

        Self {
            manager,
            menus,
            commands,
        }
    }

    pub fn manager(&self) -> &Arc<OnboardingManager> {
        &self.manager
    }

    /// Consume events until the stream ends. Each event gets its own task.
    pub async fn run<S>(self: Arc<Self>, mut events: S)
    where
        S: Stream<Item = GatewayEvent> + Unpin,
    {
        while let Some(event) = events.next().await {
            let bot = Arc::clone(&self);
            tokio::spawn(async move { bot.handle_event(event).await });
        }
        tracing::info!("Event stream ended");
    }

    /// Handle one event to completion. Errors are logged, never propagated.
    pub async fn handle_event(&self, event: GatewayEvent) {
        match event {
            GatewayEvent::Ready {
                user_id,
                guild_count,
            } => {
                self.manager.set_bot_user(user_id);
                tracing::info!(%user_id, guild_count, "Logged in");
            }
            GatewayEvent::ReactionAdd(reaction) => {
                if let Err(e) = self.manager.handle_reaction(&reaction).await {
                    tracing::error!(user_id = %reaction.user_id, "Entry reaction failed: {e}");
                }
            }
            GatewayEvent::Interaction(interaction) => {
                self.menus.handle(&interaction).await;
            }
            GatewayEvent::Message(message) => {
                self.commands.handle_message(&message).await;
            }
        }
    }
}
