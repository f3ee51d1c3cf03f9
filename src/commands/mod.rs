//! Prefix commands: parsing and dispatch.
//!
//! `!change_domain @ada "CS/Math"` is split into a command name and its
//! arguments here; [`admin::CommandHandler`] runs it.

pub mod admin;

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CommandError;
use crate::platform::UserId;

pub use admin::CommandHandler;

static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<@!?(\d+)>$").expect("mention pattern is valid"));

/// Recognized command names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandName {
    ChangeDomain,
    ChangeResearcher,
    ViewRoles,
    CheckProgress,
    ResetProgress,
    Test,
}

impl CommandName {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "change_domain" => Some(Self::ChangeDomain),
            "change_researcher" => Some(Self::ChangeResearcher),
            "view_roles" => Some(Self::ViewRoles),
            "check_progress" => Some(Self::CheckProgress),
            "reset_progress" => Some(Self::ResetProgress),
            "test" => Some(Self::Test),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChangeDomain => "change_domain",
            Self::ChangeResearcher => "change_researcher",
            Self::ViewRoles => "view_roles",
            Self::CheckProgress => "check_progress",
            Self::ResetProgress => "reset_progress",
            Self::Test => "test",
        }
    }

    /// Whether the invoker must be an administrator.
    pub fn is_privileged(self) -> bool {
        !matches!(self, Self::Test)
    }
}

/// A fully parsed command. Labels are kept raw and validated on execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ChangeDomain { member: UserId, label: String },
    ChangeResearcher { member: UserId, label: String },
    ViewRoles { member: UserId },
    /// `None` means the invoker.
    CheckProgress { member: Option<UserId> },
    ResetProgress { member: UserId },
    Test,
}

/// Split `content` into a command name and the unparsed remainder.
///
/// Returns `None` if the message does not start with `prefix` or names no
/// command at all.
pub fn split_invocation<'a>(content: &'a str, prefix: &str) -> Option<(&'a str, &'a str)> {
    let body = content.trim_start().strip_prefix(prefix)?;
    let name_end = body.find(char::is_whitespace).unwrap_or(body.len());
    let (name, rest) = body.split_at(name_end);
    if name.is_empty() {
        return None;
    }
    Some((name, rest.trim()))
}

impl Command {
    /// Parse the arguments of `name` from `args`.
    pub fn parse(name: CommandName, args: &str) -> Result<Self, CommandError> {
        match name {
            CommandName::ChangeDomain => {
                let (member, rest) = required_member(args)?;
                let label = rest_of_line(rest).ok_or(CommandError::MissingArgument("new_domain"))?;
                Ok(Self::ChangeDomain { member, label })
            }
            CommandName::ChangeResearcher => {
                let (member, rest) = required_member(args)?;
                let label =
                    rest_of_line(rest).ok_or(CommandError::MissingArgument("new_researcher"))?;
                Ok(Self::ChangeResearcher { member, label })
            }
            CommandName::ViewRoles => Ok(Self::ViewRoles {
                member: required_member(args)?.0,
            }),
            CommandName::CheckProgress => {
                let member = match next_token(args) {
                    Some((raw, _)) => Some(parse_member(&raw)?),
                    None => None,
                };
                Ok(Self::CheckProgress { member })
            }
            CommandName::ResetProgress => Ok(Self::ResetProgress {
                member: required_member(args)?.0,
            }),
            CommandName::Test => Ok(Self::Test),
        }
    }
}

fn required_member(args: &str) -> Result<(UserId, &str), CommandError> {
    let (raw, rest) = next_token(args).ok_or(CommandError::MissingArgument("member"))?;
    Ok((parse_member(&raw)?, rest))
}

/// A member argument: `<@id>`, `<@!id>`, or a bare numeric id.
pub fn parse_member(raw: &str) -> Result<UserId, CommandError> {
    let digits = match MENTION.captures(raw) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
        None => raw,
    };
    digits
        .parse()
        .map_err(|_| CommandError::MemberNotFound(raw.to_string()))
}

/// Next whitespace-delimited token; a leading `"` groups up to the closing
/// quote. Returns the token and the remaining input.
fn next_token(input: &str) -> Option<(String, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }

    if let Some(quoted) = input.strip_prefix('"') {
        return Some(match quoted.find('"') {
            Some(end) => (quoted[..end].to_string(), &quoted[end + 1..]),
            // Unterminated: take everything.
            None => (quoted.to_string(), ""),
        });
    }

    let end = input.find(char::is_whitespace).unwrap_or(input.len());
    Some((input[..end].to_string(), &input[end..]))
}

/// The rest of the line as one argument, surrounding quotes stripped.
fn rest_of_line(input: &str) -> Option<String> {
    let trimmed = input.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed)
        .trim();
    (!unquoted.is_empty()).then(|| unquoted.to_string())
}
