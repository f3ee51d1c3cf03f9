//! Selection prompts and participant-facing message text.

use super::model::{Choice, ChoiceKind, Domain, ResearcherType, Selection};
use crate::platform::{Button, ButtonStyle, Embed, OutgoingMessage, UserId};

const PROMPT_COLOR: u32 = 0x00ff00;

/// Build the button menu for one selection set.
fn selection_prompt<C: Choice>(title: &str, description: &str, style: ButtonStyle) -> OutgoingMessage
where
    Selection: From<C>,
{
    let buttons = C::ALL
        .iter()
        .map(|c| Button {
            label: c.label().to_string(),
            custom_id: Selection::from(*c).custom_id(),
            style,
        })
        .collect();

    OutgoingMessage::embed(Embed::new(title, PROMPT_COLOR).with_description(description))
        .with_buttons(buttons)
}

/// Step 2 menu: one primary button per domain.
pub fn domain_prompt() -> OutgoingMessage {
    selection_prompt::<Domain>(
        "🔬 Select Your Domain",
        "Choose the domain you're most interested in:\n\n\
         **⚠️ Note: This choice is permanent!**\n\
         If you need to change it later, **please ping an exec**.",
        ButtonStyle::Primary,
    )
}

/// Step 3 menu: one success button per researcher type.
pub fn researcher_prompt() -> OutgoingMessage {
    selection_prompt::<ResearcherType>(
        "🧪 Select Your Researcher Type",
        "Choose how you prefer to conduct research:\n\n\
         **⚠️ Note: This choice is permanent!**\n\
         If you need to change it later, **please ping an exec**.",
        ButtonStyle::Success,
    )
}

pub fn member_granted() -> OutgoingMessage {
    OutgoingMessage::text("✅ Member role added! Next, select your **domain**.")
}

pub fn already_verified() -> OutgoingMessage {
    OutgoingMessage::text(
        "❌ You have already completed verification! If you need to change your domain or \
         researcher type, **please ping an exec** in the server.",
    )
}

pub fn completion() -> OutgoingMessage {
    OutgoingMessage::text(
        "🎉 All steps completed! You now have full server access with your selected roles.\n\n\
         **Remember:** Your domain and researcher type are permanent. \
         **Please ping an exec** if you need changes.",
    )
}

/// Public notice posted in the entry channel when a DM bounces.
pub fn dm_fallback_notice(user: UserId) -> OutgoingMessage {
    OutgoingMessage::text(format!(
        "{} I couldn't DM you! Please enable DMs from server members to continue.",
        user.mention()
    ))
}

/// Ephemeral confirmation after a selection is granted.
pub fn selection_confirmed(selection: Selection) -> String {
    match selection {
        Selection::Domain(d) => {
            format!("✅ **{d}** domain selected! Now choose your researcher type.")
        }
        Selection::Researcher(r) => {
            format!("✅ **{r}** type selected! Completing your verification...")
        }
    }
}

/// Ephemeral rejection when a role from the set is already held.
pub fn already_selected(kind: ChoiceKind) -> String {
    match kind {
        ChoiceKind::Domain => {
            "❌ You already have a domain role! To change it, **please ping an exec**.".to_string()
        }
        ChoiceKind::Researcher => {
            "❌ You already have a researcher type! To change it, **please ping an exec**."
                .to_string()
        }
    }
}

pub const NOT_IN_SERVER: &str = "Error: You are not in the server.";

/// Generic apology when a selection handler faults.
pub const SELECTION_FAILED: &str =
    "❌ Something went wrong while saving your selection. Please contact an admin.";
