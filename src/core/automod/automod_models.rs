// Automod domain models - data structures for the rule-evaluation engine.
//
// These are pure domain types with no Discord dependencies.
// The Discord layer converts gateway objects into an `EventContext`, and the
// storage layer hands us `RuleRecord`s exactly as they were persisted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// EVENT CONTEXT
// ============================================================================

/// Which gateway event produced the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventKind {
    #[default]
    Message,
    MemberJoin,
}

/// Read-only view of the event a rule is evaluated against.
///
/// Everything except `kind` is optional. Conditions that need a field which
/// is missing resolve to "not triggered" instead of failing.
#[derive(Debug, Clone, Default)]
pub struct EventContext {
    pub kind: EventKind,
    pub actor_id: Option<u64>,
    pub channel_id: Option<u64>,
    pub guild_id: Option<u64>,
    /// Message body. Always empty for member joins.
    pub text_content: String,
    pub display_name: Option<String>,
    pub account_name: Option<String>,
    /// Number of user mentions in the content.
    pub mention_count: u32,
    pub has_attachments: bool,
}

impl EventContext {
    /// Context for a chat message sent by `actor_id` in `channel_id`.
    pub fn message(actor_id: u64, channel_id: u64, content: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Message,
            actor_id: Some(actor_id),
            channel_id: Some(channel_id),
            text_content: content.into(),
            ..Default::default()
        }
    }

    /// Context for a member joining a guild. Joins never carry a channel.
    pub fn member_join(
        actor_id: u64,
        account_name: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            kind: EventKind::MemberJoin,
            actor_id: Some(actor_id),
            account_name: Some(account_name.into()),
            display_name: Some(display_name.into()),
            ..Default::default()
        }
    }

    pub fn with_guild(mut self, guild_id: u64) -> Self {
        self.guild_id = Some(guild_id);
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_account_name(mut self, name: impl Into<String>) -> Self {
        self.account_name = Some(name.into());
        self
    }

    pub fn with_mentions(mut self, mention_count: u32) -> Self {
        self.mention_count = mention_count;
        self
    }

    pub fn with_attachments(mut self, has_attachments: bool) -> Self {
        self.has_attachments = has_attachments;
        self
    }

    pub fn is_message(&self) -> bool {
        self.kind == EventKind::Message
    }

    pub fn is_member_join(&self) -> bool {
        self.kind == EventKind::MemberJoin
    }
}

// ============================================================================
// PERSISTED CONFIGURATION
// ============================================================================

/// How the condition results of one rule are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    /// Logical AND over every condition.
    #[default]
    All,
    /// Logical OR over every condition.
    Any,
}

impl Combinator {
    pub fn combine(self, results: &[bool]) -> bool {
        match self {
            Combinator::All => results.iter().all(|r| *r),
            Combinator::Any => results.iter().any(|r| *r),
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combinator::All => write!(f, "all"),
            Combinator::Any => write!(f, "any"),
        }
    }
}

impl FromStr for Combinator {
    type Err = AutomodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Combinator::All),
            "any" => Ok(Combinator::Any),
            other => Err(AutomodError::InvalidCombinator(other.to_string())),
        }
    }
}

/// One stored condition: a kind tag plus its free-form parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionRecord {
    #[serde(alias = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

#[allow(dead_code)]
impl ConditionRecord {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: serde_json::Map::new(),
        }
    }

    /// Add a parameter. Handy when building records in code.
    pub fn param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

/// A named automod rule as persisted in a guild's settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub name: String,
    #[serde(default)]
    pub combinator: Combinator,
    #[serde(default)]
    pub conditions: Vec<ConditionRecord>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum AutomodError {
    #[error("Unknown condition kind: {0}")]
    UnknownCondition(String),

    #[error("Invalid parameters for condition {kind}: {reason}")]
    InvalidParams { kind: String, reason: String },

    #[error("Invalid regex for condition {kind}: {source}")]
    InvalidRegex {
        kind: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid combinator: {0} (expected \"all\" or \"any\")")]
    InvalidCombinator(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}
