// Shared content patterns used by the link and invite conditions.

use regex::Regex;
use std::sync::OnceLock;

static LINK_PATTERN: OnceLock<Regex> = OnceLock::new();
static INVITE_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Generic URL: an explicit scheme or a `www.` prefix followed by non-space text.
fn link_pattern() -> &'static Regex {
    LINK_PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(?:https?://|www\.)[^\s<>]+").expect("link pattern is valid")
    })
}

/// Discord server invites, with or without a scheme.
fn invite_pattern() -> &'static Regex {
    INVITE_PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)(?:https?://)?(?:www\.)?(?:discord(?:app)?\.com/invite|discord\.(?:gg|io|me|li))/[a-z0-9-]+",
        )
        .expect("invite pattern is valid")
    })
}

pub fn contains_link(text: &str) -> bool {
    link_pattern().is_match(text)
}

pub fn contains_invite(text: &str) -> bool {
    invite_pattern().is_match(text)
}
