// Discord automod glue: turns gateway events into `EventContext`s, runs them
// through the engine and exposes rule management as slash commands.

pub mod commands;
pub mod event_context;
pub mod handler;
