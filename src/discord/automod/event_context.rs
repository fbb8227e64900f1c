// Adapters from serenity gateway objects to the engine's `EventContext`.
//
// This layer is THIN: pull primitives out of Discord types, nothing more.

use crate::core::automod::EventContext;
use poise::serenity_prelude as serenity;

/// Name shown for a message author: guild nickname, then global display
/// name, then the account name.
fn author_display_name(msg: &serenity::Message) -> String {
    msg.member
        .as_ref()
        .and_then(|member| member.nick.clone())
        .or_else(|| msg.author.global_name.clone())
        .unwrap_or_else(|| msg.author.name.clone())
}

pub fn from_message(msg: &serenity::Message) -> EventContext {
    let mut ctx = EventContext::message(
        msg.author.id.get(),
        msg.channel_id.get(),
        msg.content.clone(),
    )
    .with_display_name(author_display_name(msg))
    .with_account_name(msg.author.name.clone())
    .with_mentions(msg.mentions.len() as u32)
    .with_attachments(!msg.attachments.is_empty());

    if let Some(guild_id) = msg.guild_id {
        ctx = ctx.with_guild(guild_id.get());
    }

    ctx
}

pub fn from_member_join(member: &serenity::Member) -> EventContext {
    EventContext::member_join(
        member.user.id.get(),
        member.user.name.clone(),
        member.display_name().to_string(),
    )
    .with_guild(member.guild_id.get())
}
