//! Onboarding system — the three-step verification flow.
//!
//! A new arrival reacts on the entry message, receives the base role, then
//! picks a research domain and a researcher type from private button menus.
//! Both picks are one-time: the live role set is checked on every press and a
//! second pick from the same set is refused. Only administrators can change a
//! pick afterwards (see [`crate::commands`]).

pub mod manager;
pub mod menu;
pub mod model;
pub mod prompts;
pub mod state;
pub mod tracker;

pub use manager::{EntryOutcome, OnboardingManager, SelectionOutcome};
pub use menu::{PressOutcome, SelectionMenus};
pub use model::{Choice, ChoiceKind, Domain, ResearcherType, Selection};
pub use state::{OnboardingStep, ProgressRecord};
pub use tracker::{InMemoryProgressStore, ProgressStore};
