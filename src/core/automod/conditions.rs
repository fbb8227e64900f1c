// The condition catalog.
//
// Every condition kind a rule can reference is a variant of `ConditionSpec`.
// Stored records are parsed into typed variants once, when the rule is built,
// so evaluation is a plain exhaustive `match` with no string lookups.
//
// Evaluation never errors: a condition that lacks the data it needs (wrong
// event kind, no channel, no display name, no scam-link service) answers
// `false`.

use super::automod_models::{AutomodError, ConditionRecord, EventContext};
use super::patterns::{contains_invite, contains_link};
use super::rate_limiter::RateLimiter;
use super::scam_links::ScamLinkGuard;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};

// ============================================================================
// RATE CONDITIONS
// ============================================================================

/// What a rate limiter buckets events by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Actor,
    Channel,
}

/// Which messages count toward a rate limiter at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateGate {
    EveryMessage,
    Mentions,
    Attachments,
    Links,
}

impl RateGate {
    fn admits(self, ctx: &EventContext) -> bool {
        match self {
            RateGate::EveryMessage => true,
            RateGate::Mentions => ctx.mention_count > 0,
            RateGate::Attachments => ctx.has_attachments,
            RateGate::Links => contains_link(&ctx.text_content),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateCondition {
    pub gate: RateGate,
    pub dimension: Dimension,
    pub rate: u32,
    pub window: Duration,
}

impl RateCondition {
    fn kind(&self) -> &'static str {
        match (self.gate, self.dimension) {
            (RateGate::EveryMessage, Dimension::Actor) => "rate_messages_per_user",
            (RateGate::EveryMessage, Dimension::Channel) => "rate_messages_per_channel",
            (RateGate::Mentions, Dimension::Actor) => "rate_mentioning_messages_per_user",
            (RateGate::Mentions, Dimension::Channel) => "rate_mentioning_messages_per_channel",
            (RateGate::Attachments, Dimension::Actor) => "rate_attachment_messages_per_user",
            (RateGate::Attachments, Dimension::Channel) => "rate_attachment_messages_per_channel",
            (RateGate::Links, Dimension::Actor) => "rate_link_messages_per_user",
            (RateGate::Links, Dimension::Channel) => "rate_link_messages_per_channel",
        }
    }

    /// Ungated events are not counted; missing dimensions are not counted either.
    fn evaluate(&self, ctx: &EventContext, limiter: Option<&RateLimiter>, now: Instant) -> bool {
        if !ctx.is_message() {
            return false;
        }
        let Some(limiter) = limiter else {
            return false;
        };
        let dimension_id = match self.dimension {
            Dimension::Actor => ctx.actor_id,
            Dimension::Channel => ctx.channel_id,
        };
        let Some(dimension_id) = dimension_id else {
            return false;
        };
        if !self.gate.admits(ctx) {
            return false;
        }

        limiter.record_and_check(dimension_id, now)
    }
}

// ============================================================================
// WORD LISTS
// ============================================================================

/// Case-sensitive substring list. Blank entries are dropped on construction
/// because an empty needle matches everything.
#[derive(Debug, Clone, PartialEq)]
pub struct WordList(Vec<String>);

impl WordList {
    pub fn new(words: Vec<String>) -> Self {
        Self(words.into_iter().filter(|w| !w.is_empty()).collect())
    }

    pub fn any_in(&self, text: &str) -> bool {
        self.0.iter().any(|word| text.contains(word.as_str()))
    }
}

// ============================================================================
// CONDITION SPEC
// ============================================================================

/// One typed, parametrized predicate inside a rule.
#[derive(Debug, Clone)]
pub enum ConditionSpec {
    Rate(RateCondition),

    AllCaps {
        threshold: Option<u32>,
        percentage: Option<f64>,
    },
    MessageMentions {
        threshold: u32,
    },
    AnyLink,
    WordBlacklist(WordList),
    WordWhitelist(WordList),
    ServerInvites,
    MessageMatchRegex(Regex),
    MessageNotMatchRegex(Regex),
    MessageWithAttachments,
    MessageWithoutAttachments,
    MessageLongerThan {
        characters: usize,
    },
    MessageShorterThan {
        characters: usize,
    },

    NicknameMatchRegex(Regex),
    NicknameNotMatchRegex(Regex),
    NicknameWordBlacklist(WordList),
    NicknameWordWhitelist(WordList),

    JoinUsernameMatchRegex(Regex),
    JoinUsernameNotMatchRegex(Regex),
    JoinUsernameWordBlacklist(WordList),
    JoinUsernameWordWhitelist(WordList),
    JoinUsernameInvite,

    ScamLinks,
}

/// Collaborators a single condition may need while evaluating.
#[derive(Clone, Copy)]
pub struct EvalDeps<'a> {
    pub limiter: Option<&'a RateLimiter>,
    pub scam_links: Option<&'a ScamLinkGuard>,
    pub now: Instant,
}

#[derive(Deserialize)]
struct RateParams {
    rate: u32,
    window_seconds: f64,
}

#[derive(Deserialize)]
struct CapsParams {
    threshold: Option<u32>,
    percentage: Option<f64>,
}

#[derive(Deserialize)]
struct ThresholdParams {
    threshold: u32,
}

#[derive(Deserialize)]
struct WordsParams {
    words: Vec<String>,
}

#[derive(Deserialize)]
struct RegexParams {
    regex: String,
}

#[derive(Deserialize)]
struct CharactersParams {
    characters: usize,
}

impl ConditionSpec {
    /// Parse and validate a stored record.
    ///
    /// Unknown kinds, missing or mistyped parameters and bad regexes are all
    /// rejected here, so nothing malformed ever reaches evaluation.
    pub fn from_record(record: &ConditionRecord) -> Result<Self, AutomodError> {
        use ConditionSpec::*;

        let spec = match record.kind.as_str() {
            "rate_messages_per_user" => {
                rate(record, RateGate::EveryMessage, Dimension::Actor)?
            }
            "rate_messages_per_channel" => {
                rate(record, RateGate::EveryMessage, Dimension::Channel)?
            }
            "rate_mentioning_messages_per_user" => {
                rate(record, RateGate::Mentions, Dimension::Actor)?
            }
            "rate_mentioning_messages_per_channel" => {
                rate(record, RateGate::Mentions, Dimension::Channel)?
            }
            "rate_attachment_messages_per_user" => {
                rate(record, RateGate::Attachments, Dimension::Actor)?
            }
            "rate_attachment_messages_per_channel" => {
                rate(record, RateGate::Attachments, Dimension::Channel)?
            }
            "rate_link_messages_per_user" => rate(record, RateGate::Links, Dimension::Actor)?,
            "rate_link_messages_per_channel" => {
                rate(record, RateGate::Links, Dimension::Channel)?
            }

            "all_caps" => {
                let p: CapsParams = params(record)?;
                if let Some(pct) = p.percentage {
                    if !(0.0..=1.0).contains(&pct) {
                        return Err(invalid(record, "percentage must be between 0.0 and 1.0"));
                    }
                }
                AllCaps {
                    threshold: p.threshold,
                    percentage: p.percentage,
                }
            }
            "message_mentions" => {
                let p: ThresholdParams = params(record)?;
                MessageMentions {
                    threshold: p.threshold,
                }
            }
            "any_link" => AnyLink,
            "word_blacklist" => WordBlacklist(words(record)?),
            "word_whitelist" => WordWhitelist(words(record)?),
            "server_invites" => ServerInvites,
            "message_match_regex" => MessageMatchRegex(regex(record)?),
            "message_not_match_regex" => MessageNotMatchRegex(regex(record)?),
            "message_with_attachments" => MessageWithAttachments,
            "message_without_attachments" => MessageWithoutAttachments,
            "message_with_more_than_x_characters" => {
                let p: CharactersParams = params(record)?;
                MessageLongerThan {
                    characters: p.characters,
                }
            }
            "message_with_less_than_x_characters" => {
                let p: CharactersParams = params(record)?;
                MessageShorterThan {
                    characters: p.characters,
                }
            }

            "nickname_match_regex" => NicknameMatchRegex(regex(record)?),
            "nickname_not_match_regex" => NicknameNotMatchRegex(regex(record)?),
            "nickname_word_blacklist" => NicknameWordBlacklist(words(record)?),
            "nickname_word_whitelist" => NicknameWordWhitelist(words(record)?),

            "join_username_match_regex" => JoinUsernameMatchRegex(regex(record)?),
            "join_username_not_match_regex" => JoinUsernameNotMatchRegex(regex(record)?),
            "join_username_word_blacklist" => JoinUsernameWordBlacklist(words(record)?),
            "join_username_word_whitelist" => JoinUsernameWordWhitelist(words(record)?),
            "join_username_invite" => JoinUsernameInvite,

            "scam_links" => ScamLinks,

            other => return Err(AutomodError::UnknownCondition(other.to_string())),
        };

        Ok(spec)
    }

    /// The stored kind tag for this condition.
    pub fn kind(&self) -> &'static str {
        use ConditionSpec::*;

        match self {
            Rate(rate) => rate.kind(),
            AllCaps { .. } => "all_caps",
            MessageMentions { .. } => "message_mentions",
            AnyLink => "any_link",
            WordBlacklist(_) => "word_blacklist",
            WordWhitelist(_) => "word_whitelist",
            ServerInvites => "server_invites",
            MessageMatchRegex(_) => "message_match_regex",
            MessageNotMatchRegex(_) => "message_not_match_regex",
            MessageWithAttachments => "message_with_attachments",
            MessageWithoutAttachments => "message_without_attachments",
            MessageLongerThan { .. } => "message_with_more_than_x_characters",
            MessageShorterThan { .. } => "message_with_less_than_x_characters",
            NicknameMatchRegex(_) => "nickname_match_regex",
            NicknameNotMatchRegex(_) => "nickname_not_match_regex",
            NicknameWordBlacklist(_) => "nickname_word_blacklist",
            NicknameWordWhitelist(_) => "nickname_word_whitelist",
            JoinUsernameMatchRegex(_) => "join_username_match_regex",
            JoinUsernameNotMatchRegex(_) => "join_username_not_match_regex",
            JoinUsernameWordBlacklist(_) => "join_username_word_blacklist",
            JoinUsernameWordWhitelist(_) => "join_username_word_whitelist",
            JoinUsernameInvite => "join_username_invite",
            ScamLinks => "scam_links",
        }
    }

    /// Rate parameters, for conditions that own a limiter.
    pub fn rate_condition(&self) -> Option<&RateCondition> {
        match self {
            ConditionSpec::Rate(rate) => Some(rate),
            _ => None,
        }
    }

    /// Evaluate against one event. Only `ScamLinks` actually awaits.
    pub async fn evaluate(&self, ctx: &EventContext, deps: EvalDeps<'_>) -> bool {
        use ConditionSpec::*;

        match self {
            Rate(rate) => rate.evaluate(ctx, deps.limiter, deps.now),

            AllCaps {
                threshold,
                percentage,
            } => message_text(ctx).is_some_and(|text| all_caps(text, *threshold, *percentage)),
            MessageMentions { threshold } => {
                ctx.is_message() && ctx.mention_count >= *threshold
            }
            AnyLink => message_text(ctx).is_some_and(contains_link),
            WordBlacklist(words) => message_text(ctx).is_some_and(|text| words.any_in(text)),
            WordWhitelist(words) => message_text(ctx).is_some_and(|text| !words.any_in(text)),
            ServerInvites => message_text(ctx).is_some_and(contains_invite),
            MessageMatchRegex(re) => message_text(ctx).is_some_and(|text| re.is_match(text)),
            MessageNotMatchRegex(re) => message_text(ctx).is_some_and(|text| !re.is_match(text)),
            MessageWithAttachments => ctx.is_message() && ctx.has_attachments,
            MessageWithoutAttachments => ctx.is_message() && !ctx.has_attachments,
            MessageLongerThan { characters } => {
                message_text(ctx).is_some_and(|text| text.chars().count() > *characters)
            }
            MessageShorterThan { characters } => {
                message_text(ctx).is_some_and(|text| text.chars().count() < *characters)
            }

            NicknameMatchRegex(re) => display_name(ctx).is_some_and(|name| re.is_match(name)),
            NicknameNotMatchRegex(re) => {
                display_name(ctx).is_some_and(|name| !re.is_match(name))
            }
            NicknameWordBlacklist(words) => display_name(ctx).is_some_and(|name| words.any_in(name)),
            NicknameWordWhitelist(words) => {
                display_name(ctx).is_some_and(|name| !words.any_in(name))
            }

            JoinUsernameMatchRegex(re) => any_join_name(ctx, |name| re.is_match(name)),
            JoinUsernameNotMatchRegex(re) => every_join_name(ctx, |name| !re.is_match(name)),
            JoinUsernameWordBlacklist(words) => any_join_name(ctx, |name| words.any_in(name)),
            JoinUsernameWordWhitelist(words) => every_join_name(ctx, |name| !words.any_in(name)),
            JoinUsernameInvite => any_join_name(ctx, contains_invite),

            ScamLinks => match (message_text(ctx), deps.scam_links) {
                (Some(text), Some(guard)) => guard.is_scam(text).await,
                (_, None) if ctx.is_message() => {
                    tracing::debug!("scam_links condition has no link checker configured");
                    false
                }
                _ => false,
            },
        }
    }
}

// ============================================================================
// PARSING HELPERS
// ============================================================================

fn invalid(record: &ConditionRecord, reason: impl Into<String>) -> AutomodError {
    AutomodError::InvalidParams {
        kind: record.kind.clone(),
        reason: reason.into(),
    }
}

fn params<T: DeserializeOwned>(record: &ConditionRecord) -> Result<T, AutomodError> {
    serde_json::from_value(serde_json::Value::Object(record.params.clone()))
        .map_err(|e| invalid(record, e.to_string()))
}

fn rate(
    record: &ConditionRecord,
    gate: RateGate,
    dimension: Dimension,
) -> Result<ConditionSpec, AutomodError> {
    let p: RateParams = params(record)?;
    let window = Duration::try_from_secs_f64(p.window_seconds)
        .ok()
        .filter(|w| !w.is_zero())
        .ok_or_else(|| invalid(record, "window_seconds must be a positive number"))?;

    Ok(ConditionSpec::Rate(RateCondition {
        gate,
        dimension,
        rate: p.rate,
        window,
    }))
}

fn words(record: &ConditionRecord) -> Result<WordList, AutomodError> {
    let p: WordsParams = params(record)?;
    Ok(WordList::new(p.words))
}

fn regex(record: &ConditionRecord) -> Result<Regex, AutomodError> {
    let p: RegexParams = params(record)?;
    Regex::new(&p.regex).map_err(|source| AutomodError::InvalidRegex {
        kind: record.kind.clone(),
        source,
    })
}

// ============================================================================
// EVALUATION HELPERS
// ============================================================================

fn message_text(ctx: &EventContext) -> Option<&str> {
    ctx.is_message().then_some(ctx.text_content.as_str())
}

fn display_name(ctx: &EventContext) -> Option<&str> {
    ctx.display_name.as_deref()
}

/// Names a joining member is known by. Empty for anything but a join.
fn join_names(ctx: &EventContext) -> Vec<&str> {
    if !ctx.is_member_join() {
        return Vec::new();
    }
    [ctx.display_name.as_deref(), ctx.account_name.as_deref()]
        .into_iter()
        .flatten()
        .collect()
}

fn any_join_name(ctx: &EventContext, pred: impl Fn(&str) -> bool) -> bool {
    join_names(ctx).into_iter().any(pred)
}

/// Like `all`, but a join with no names at all does not count as a match.
fn every_join_name(ctx: &EventContext, pred: impl Fn(&str) -> bool) -> bool {
    let names = join_names(ctx);
    !names.is_empty() && names.into_iter().all(pred)
}

fn all_caps(text: &str, threshold: Option<u32>, percentage: Option<f64>) -> bool {
    if threshold.is_none() && percentage.is_none() {
        return false;
    }

    let length = text.chars().count();
    let upper = text.chars().filter(|c| c.is_uppercase()).count();

    let over_threshold = threshold.map_or(true, |t| upper >= t as usize);
    // Empty text has no ratio to compare.
    let over_percentage =
        percentage.map_or(true, |p| length > 0 && upper as f64 / length as f64 >= p);

    over_threshold && over_percentage
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::automod::scam_links::tests::MockChecker;
    use serde_json::json;
    use std::sync::Arc;

    fn spec(kind: &str, params: serde_json::Value) -> ConditionSpec {
        let params = match params {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        ConditionSpec::from_record(&ConditionRecord {
            kind: kind.to_string(),
            params,
        })
        .unwrap()
    }

    async fn eval(spec: &ConditionSpec, ctx: &EventContext) -> bool {
        let deps = EvalDeps {
            limiter: None,
            scam_links: None,
            now: Instant::now(),
        };
        spec.evaluate(ctx, deps).await
    }

    fn msg(content: &str) -> EventContext {
        EventContext::message(10, 20, content).with_guild(30)
    }

    #[test]
    fn test_every_kind_round_trips_its_tag() {
        let records = [
            ("rate_messages_per_user", json!({"rate": 1, "window_seconds": 1})),
            ("rate_messages_per_channel", json!({"rate": 1, "window_seconds": 1})),
            ("rate_mentioning_messages_per_user", json!({"rate": 1, "window_seconds": 1})),
            ("rate_mentioning_messages_per_channel", json!({"rate": 1, "window_seconds": 1})),
            ("rate_attachment_messages_per_user", json!({"rate": 1, "window_seconds": 1})),
            ("rate_attachment_messages_per_channel", json!({"rate": 1, "window_seconds": 1})),
            ("rate_link_messages_per_user", json!({"rate": 1, "window_seconds": 1})),
            ("rate_link_messages_per_channel", json!({"rate": 1, "window_seconds": 1.5})),
            ("all_caps", json!({"threshold": 3})),
            ("message_mentions", json!({"threshold": 3})),
            ("any_link", json!({})),
            ("word_blacklist", json!({"words": ["a"]})),
            ("word_whitelist", json!({"words": ["a"]})),
            ("server_invites", json!({})),
            ("message_match_regex", json!({"regex": "a+"})),
            ("message_not_match_regex", json!({"regex": "a+"})),
            ("message_with_attachments", json!({})),
            ("message_without_attachments", json!({})),
            ("message_with_more_than_x_characters", json!({"characters": 5})),
            ("message_with_less_than_x_characters", json!({"characters": 5})),
            ("nickname_match_regex", json!({"regex": "a"})),
            ("nickname_not_match_regex", json!({"regex": "a"})),
            ("nickname_word_blacklist", json!({"words": ["a"]})),
            ("nickname_word_whitelist", json!({"words": ["a"]})),
            ("join_username_match_regex", json!({"regex": "a"})),
            ("join_username_not_match_regex", json!({"regex": "a"})),
            ("join_username_word_blacklist", json!({"words": ["a"]})),
            ("join_username_word_whitelist", json!({"words": ["a"]})),
            ("join_username_invite", json!({})),
            ("scam_links", json!({})),
        ];

        for (kind, params) in records {
            assert_eq!(spec(kind, params).kind(), kind);
        }
    }

    #[test]
    fn test_construction_errors() {
        let unknown = ConditionSpec::from_record(&ConditionRecord::new("telepathy"));
        assert!(matches!(unknown, Err(AutomodError::UnknownCondition(k)) if k == "telepathy"));

        let missing = ConditionSpec::from_record(&ConditionRecord::new("word_blacklist"));
        assert!(matches!(missing, Err(AutomodError::InvalidParams { .. })));

        let mistyped = ConditionSpec::from_record(
            &ConditionRecord::new("message_mentions").param("threshold", "lots"),
        );
        assert!(matches!(mistyped, Err(AutomodError::InvalidParams { .. })));

        let bad_regex = ConditionSpec::from_record(
            &ConditionRecord::new("message_match_regex").param("regex", "(unclosed"),
        );
        assert!(matches!(bad_regex, Err(AutomodError::InvalidRegex { .. })));

        for window in [0.0, -1.0] {
            let bad_window = ConditionSpec::from_record(
                &ConditionRecord::new("rate_messages_per_user")
                    .param("rate", 3)
                    .param("window_seconds", window),
            );
            assert!(matches!(bad_window, Err(AutomodError::InvalidParams { .. })));
        }

        let bad_pct = ConditionSpec::from_record(
            &ConditionRecord::new("all_caps").param("percentage", 75),
        );
        assert!(matches!(bad_pct, Err(AutomodError::InvalidParams { .. })));
    }

    #[test]
    fn test_extra_params_are_ignored() {
        let spec = ConditionSpec::from_record(
            &ConditionRecord::new("any_link").param("note", "added by an admin"),
        );
        assert!(spec.is_ok());
    }

    #[tokio::test]
    async fn test_all_caps() {
        let caps = spec("all_caps", json!({"threshold": 5, "percentage": 0}));
        assert!(eval(&caps, &msg("HELLO world")).await);
        assert!(!eval(&caps, &msg("Hello world")).await);

        let pct_only = spec("all_caps", json!({"percentage": 0.5}));
        assert!(eval(&pct_only, &msg("STOP it")).await);
        assert!(!eval(&pct_only, &msg("Stop it")).await);

        let neither = spec("all_caps", json!({}));
        assert!(!eval(&neither, &msg("SHOUTING")).await);

        let threshold_only = spec("all_caps", json!({"threshold": 0}));
        assert!(eval(&threshold_only, &msg("")).await);

        let zero_pct = spec("all_caps", json!({"percentage": 0}));
        assert!(!eval(&zero_pct, &msg("")).await);
        assert!(eval(&zero_pct, &msg("quiet")).await);
    }

    #[tokio::test]
    async fn test_word_lists() {
        let blacklist = spec("word_blacklist", json!({"words": ["spam", "scam"]}));
        let whitelist = spec("word_whitelist", json!({"words": ["spam"]}));
        let ctx = msg("this is not spam");

        assert!(eval(&blacklist, &ctx).await);
        assert!(!eval(&whitelist, &ctx).await);

        // Matching is case-sensitive.
        assert!(!eval(&blacklist, &msg("SPAM")).await);
        assert!(eval(&whitelist, &msg("SPAM")).await);
    }

    #[tokio::test]
    async fn test_blank_words_are_ignored() {
        let blacklist = spec("word_blacklist", json!({"words": ["", "spam"]}));
        assert!(!eval(&blacklist, &msg("hello")).await);
    }

    #[tokio::test]
    async fn test_links_and_invites() {
        let any_link = spec("any_link", json!({}));
        let invites = spec("server_invites", json!({}));

        assert!(eval(&any_link, &msg("see https://example.com")).await);
        assert!(!eval(&any_link, &msg("nothing to see")).await);
        assert!(eval(&invites, &msg("join discord.gg/abcdef")).await);
        assert!(!eval(&invites, &msg("see https://example.com")).await);
    }

    #[tokio::test]
    async fn test_regex_conditions() {
        let matches = spec("message_match_regex", json!({"regex": r"\bfree\s+nitro\b"}));
        let not_matches = spec("message_not_match_regex", json!({"regex": r"^\[ticket\]"}));

        assert!(eval(&matches, &msg("get free  nitro now")).await);
        assert!(!eval(&matches, &msg("nitro is not free")).await);
        assert!(eval(&not_matches, &msg("hello")).await);
        assert!(!eval(&not_matches, &msg("[ticket] help")).await);
    }

    #[tokio::test]
    async fn test_attachments_mentions_and_length() {
        let with = spec("message_with_attachments", json!({}));
        let without = spec("message_without_attachments", json!({}));
        let mentions = spec("message_mentions", json!({"threshold": 3}));
        let longer = spec("message_with_more_than_x_characters", json!({"characters": 5}));
        let shorter = spec("message_with_less_than_x_characters", json!({"characters": 5}));

        let attached = msg("file").with_attachments(true).with_mentions(3);
        assert!(eval(&with, &attached).await);
        assert!(!eval(&without, &attached).await);
        assert!(eval(&mentions, &attached).await);
        assert!(!eval(&mentions, &msg("hi").with_mentions(2)).await);

        // Characters, not bytes.
        assert!(!eval(&longer, &msg("héllo")).await);
        assert!(eval(&longer, &msg("héllo!")).await);
        assert!(eval(&shorter, &msg("hey")).await);
        assert!(!eval(&shorter, &msg("hello")).await);
    }

    #[tokio::test]
    async fn test_message_conditions_ignore_joins() {
        let join = EventContext::member_join(1, "spam", "spam");
        for s in [
            spec("word_whitelist", json!({"words": ["hello"]})),
            spec("message_without_attachments", json!({})),
            spec("message_not_match_regex", json!({"regex": "x"})),
            spec("message_with_less_than_x_characters", json!({"characters": 10})),
            spec("message_mentions", json!({"threshold": 0})),
        ] {
            assert!(!eval(&s, &join).await, "{} fired on a join", s.kind());
        }
    }

    #[tokio::test]
    async fn test_nickname_conditions() {
        let matches = spec("nickname_match_regex", json!({"regex": "foo"}));
        let not_matches = spec("nickname_not_match_regex", json!({"regex": "foo"}));
        let blacklist = spec("nickname_word_blacklist", json!({"words": ["admin"]}));
        let whitelist = spec("nickname_word_whitelist", json!({"words": ["[team]"]}));

        let named = msg("hi").with_display_name("foobar");
        assert!(eval(&matches, &named).await);
        assert!(!eval(&not_matches, &named).await);
        assert!(eval(&blacklist, &msg("hi").with_display_name("real admin")).await);
        assert!(eval(&whitelist, &msg("hi").with_display_name("guest")).await);
        assert!(!eval(&whitelist, &msg("hi").with_display_name("[team] bob")).await);

        // No display name: every nickname condition stays quiet.
        let anonymous = msg("hi");
        for s in [&matches, &not_matches, &blacklist, &whitelist] {
            assert!(!eval(s, &anonymous).await, "{} fired without a name", s.kind());
        }
    }

    #[tokio::test]
    async fn test_join_username_conditions() {
        let matches = spec("join_username_match_regex", json!({"regex": "^bot"}));
        let not_matches = spec("join_username_not_match_regex", json!({"regex": "^bot"}));
        let blacklist = spec("join_username_word_blacklist", json!({"words": ["nitro"]}));
        let whitelist = spec("join_username_word_whitelist", json!({"words": ["nitro"]}));
        let invite = spec("join_username_invite", json!({}));

        // Either name matching is enough for the positive variants.
        let join = EventContext::member_join(1, "bot_account", "Friendly Name");
        assert!(eval(&matches, &join).await);
        assert!(!eval(&not_matches, &join).await);

        // Negative variants need every name to avoid the pattern.
        let clean = EventContext::member_join(1, "alice", "Alice");
        assert!(!eval(&matches, &clean).await);
        assert!(eval(&not_matches, &clean).await);
        assert!(eval(&whitelist, &clean).await);
        assert!(!eval(&blacklist, &clean).await);

        let shady = EventContext::member_join(1, "alice", "free nitro");
        assert!(eval(&blacklist, &shady).await);
        assert!(!eval(&whitelist, &shady).await);

        let advertiser = EventContext::member_join(1, "discord.gg/raid", "hello");
        assert!(eval(&invite, &advertiser).await);
        assert!(!eval(&invite, &clean).await);

        // Join conditions never fire on messages.
        let message = msg("hi").with_display_name("bot").with_account_name("bot");
        assert!(!eval(&matches, &message).await);
        assert!(!eval(&not_matches, &msg("hi")).await);
    }

    #[tokio::test]
    async fn test_rate_condition_without_channel_fails_closed() {
        let per_channel = spec("rate_messages_per_channel", json!({"rate": 0, "window_seconds": 60}));
        let limiter = RateLimiter::new(0, Duration::from_secs(60), 100);
        let mut ctx = msg("hi");
        ctx.channel_id = None;

        let deps = EvalDeps {
            limiter: Some(&limiter),
            scam_links: None,
            now: Instant::now(),
        };
        assert!(!per_channel.evaluate(&ctx, deps).await);
        assert!(!per_channel.evaluate(&ctx, deps).await);
        assert_eq!(limiter.tracked_dimensions(), 0);
    }

    #[tokio::test]
    async fn test_scam_links_delegates_silently() {
        let scam = spec("scam_links", json!({}));
        let checker = Arc::new(MockChecker::answering(true));
        let guard = ScamLinkGuard::new(checker.clone(), Duration::from_secs(1));
        let deps = EvalDeps {
            limiter: None,
            scam_links: Some(&guard),
            now: Instant::now(),
        };

        assert!(scam.evaluate(&msg("https://steamcommunnity.example"), deps).await);
        assert!(!scam.evaluate(&EventContext::member_join(1, "a", "b"), deps).await);
        assert_eq!(checker.calls.load(std::sync::atomic::Ordering::SeqCst), 1);

        // No checker configured: never fires.
        assert!(!eval(&scam, &msg("https://steamcommunnity.example")).await);
    }
}
