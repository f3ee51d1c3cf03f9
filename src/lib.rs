//! Onboard Bot — stepwise role onboarding for a Discord community.

pub mod bot;
pub mod commands;
pub mod config;
pub mod error;
pub mod health;
pub mod onboarding;
pub mod platform;
