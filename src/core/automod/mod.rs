// Core automod module - the rule-evaluation engine.
//
// - `rate_limiter`: fixed-window counters keyed by user or channel
// - `conditions`: the catalog of condition kinds and their evaluators
// - `rule`: conditions + combinator, the unit that gets evaluated
// - `automod_service`: per-guild rule loading and caching

pub mod automod_models;
pub mod automod_service;
pub mod conditions;
mod patterns;
pub mod rate_limiter;
pub mod rule;
pub mod scam_links;

pub use automod_models::*;
pub use automod_service::{AutomodService, AutomodStore};
pub use rule::RuleOptions;
pub use scam_links::{ScamCheckError, ScamLinkChecker, ScamLinkGuard};
