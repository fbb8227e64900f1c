// Discord layer - commands, event handlers and gateway adapters.

#[path = "automod/mod.rs"]
pub mod automod;

use crate::core::automod::{AutomodService, AutomodStore};
use std::sync::Arc;

/// Type alias for our bot's context.
/// This is what every command receives as its first parameter.
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Data that's shared across all commands and event handlers.
pub struct Data {
    pub automod: Arc<AutomodService<Box<dyn AutomodStore>>>,
}
