//! Configuration types.
//!
//! The community's ids are compiled-in defaults; a handful can be overridden
//! from the environment for staging servers.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::onboarding::model::{Choice, Domain, ResearcherType, Selection};
use crate::platform::{ChannelId, GuildId, Member, MessageId, RoleId};

/// Discord credentials.
pub struct DiscordConfig {
    pub token: SecretString,
}

impl DiscordConfig {
    /// Read `DISCORD_TOKEN`. Missing or empty is a fatal configuration error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let token = lookup("DISCORD_TOKEN")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ConfigError::MissingRequired {
                key: "DISCORD_TOKEN".into(),
                hint: "Set it in the environment: export DISCORD_TOKEN=your_token".into(),
            })?;
        Ok(Self {
            token: SecretString::from(token),
        })
    }
}

/// Role id for each domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRoles {
    pub social_science: RoleId,
    pub management: RoleId,
    pub cs_math: RoleId,
    pub natural_sciences: RoleId,
}

/// Role id for each researcher type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearcherRoles {
    pub dedicated: RoleId,
    pub intermediate: RoleId,
    pub casual: RoleId,
}

/// Maps a selection label to its guild role.
pub trait RoleLookup<C: Choice> {
    fn role(&self, choice: C) -> RoleId;
}

impl RoleLookup<Domain> for DomainRoles {
    fn role(&self, choice: Domain) -> RoleId {
        match choice {
            Domain::SocialScience => self.social_science,
            Domain::Management => self.management,
            Domain::CsMath => self.cs_math,
            Domain::NaturalSciences => self.natural_sciences,
        }
    }
}

impl RoleLookup<ResearcherType> for ResearcherRoles {
    fn role(&self, choice: ResearcherType) -> RoleId {
        match choice {
            ResearcherType::Dedicated => self.dedicated,
            ResearcherType::Intermediate => self.intermediate,
            ResearcherType::Casual => self.casual,
        }
    }
}

/// Onboarding flow configuration.
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    /// The single community the bot serves.
    pub guild_id: GuildId,
    /// Channel holding the entry message.
    pub entry_channel_id: ChannelId,
    /// If set, only reactions on this message start onboarding.
    pub entry_message_id: Option<MessageId>,
    /// Emoji that starts onboarding.
    pub entry_emoji: String,
    /// Marker role granted at step 1.
    pub base_role: RoleId,
    pub domain_roles: DomainRoles,
    pub researcher_roles: ResearcherRoles,
    /// Selection prompts stop accepting presses after this long.
    pub prompt_timeout: Duration,
    /// Lifetime of the public "enable your DMs" notice.
    pub fallback_notice_ttl: Duration,
    /// Prefix for admin commands.
    pub command_prefix: String,
    /// Liveness endpoint port; `None` disables it.
    pub health_port: Option<u16>,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            guild_id: GuildId(1421159009796231231),
            entry_channel_id: ChannelId(1425083905853358163),
            entry_message_id: None,
            entry_emoji: "✅".to_string(),
            base_role: RoleId(1425066557582872599),
            domain_roles: DomainRoles {
                social_science: RoleId(1425070996313997403),
                management: RoleId(1425071371003625492),
                cs_math: RoleId(1425071277663588382),
                natural_sciences: RoleId(1425071159422091264),
            },
            researcher_roles: ResearcherRoles {
                dedicated: RoleId(1425066979311747153),
                intermediate: RoleId(1425067233692090409),
                casual: RoleId(1425067365783179294),
            },
            prompt_timeout: Duration::from_secs(300), // 5 minutes
            fallback_notice_ttl: Duration::from_secs(30),
            command_prefix: "!".to_string(),
            health_port: None,
        }
    }
}

impl OnboardingConfig {
    /// Defaults, with `ONBOARD_*` environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(id) = parse_var(&lookup, "ONBOARD_GUILD_ID")? {
            config.guild_id = GuildId(id);
        }
        if let Some(id) = parse_var(&lookup, "ONBOARD_ENTRY_CHANNEL_ID")? {
            config.entry_channel_id = ChannelId(id);
        }
        if let Some(id) = parse_var(&lookup, "ONBOARD_ENTRY_MESSAGE_ID")? {
            config.entry_message_id = Some(MessageId(id));
        }
        if let Some(id) = parse_var(&lookup, "ONBOARD_BASE_ROLE_ID")? {
            config.base_role = RoleId(id);
        }
        if let Some(prefix) = lookup("ONBOARD_COMMAND_PREFIX").filter(|p| !p.trim().is_empty()) {
            config.command_prefix = prefix.trim().to_string();
        }
        config.health_port = parse_var(&lookup, "ONBOARD_HEALTH_PORT")?;

        Ok(config)
    }

    /// Role granted for a selection.
    pub fn role_for(&self, selection: Selection) -> RoleId {
        match selection {
            Selection::Domain(d) => self.domain_roles.role(d),
            Selection::Researcher(r) => self.researcher_roles.role(r),
        }
    }

    /// Domains whose role the member currently holds.
    pub fn held_domains(&self, member: &Member) -> Vec<Domain> {
        held(&self.domain_roles, member)
    }

    /// Researcher types whose role the member currently holds.
    pub fn held_researcher_types(&self, member: &Member) -> Vec<ResearcherType> {
        held(&self.researcher_roles, member)
    }

    /// Holds any domain or researcher role: the participant has already chosen.
    pub fn is_verified(&self, member: &Member) -> bool {
        !self.held_domains(member).is_empty() || !self.held_researcher_types(member).is_empty()
    }
}

/// Choices of set `C` whose role the member holds.
pub fn held<C: Choice>(roles: &impl RoleLookup<C>, member: &Member) -> Vec<C> {
    C::ALL
        .iter()
        .copied()
        .filter(|c| member.has_role(roles.role(*c)))
        .collect()
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{raw:?}: {e}"),
            }),
    }
}
