// Discord-specific automod handling - feeds gateway events to the engine
// and reports which rules fired.
//
// Acting on a verdict (deleting, warning, timing out) is deliberately not
// done here; the triggered rule names are logged and returned.

use super::event_context::{from_member_join, from_message};
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

/// Check a message against the guild's automod rules.
///
/// Returns the names of the rules that fired.
pub async fn handle_message(data: &Data, msg: &serenity::Message) -> Result<Vec<String>, Error> {
    // Skip bots
    if msg.author.bot {
        return Ok(Vec::new());
    }

    // Only check guild messages
    let guild_id = match msg.guild_id {
        Some(id) => id.get(),
        None => return Ok(Vec::new()),
    };

    let ctx = from_message(msg);
    let triggered = data
        .automod
        .check_event(guild_id, &ctx)
        .await?;

    if !triggered.is_empty() {
        tracing::info!(
            guild_id,
            channel_id = msg.channel_id.get(),
            user_id = msg.author.id.get(),
            message_id = msg.id.get(),
            rules = ?triggered,
            "Automod rules triggered by message"
        );
    }

    Ok(triggered)
}

/// Check a joining member against the guild's automod rules.
pub async fn handle_member_join(
    data: &Data,
    member: &serenity::Member,
) -> Result<Vec<String>, Error> {
    if member.user.bot {
        return Ok(Vec::new());
    }

    let guild_id = member.guild_id.get();
    let ctx = from_member_join(member);
    let triggered = data
        .automod
        .check_event(guild_id, &ctx)
        .await?;

    if !triggered.is_empty() {
        tracing::info!(
            guild_id,
            user_id = member.user.id.get(),
            rules = ?triggered,
            "Automod rules triggered by member join"
        );
    }

    Ok(triggered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::automod::AutomodError;

    #[test]
    fn test_automod_errors_keep_their_type() {
        fn load() -> Result<(), Error> {
            let stored: Result<(), AutomodError> =
                Err(AutomodError::StorageError("database is locked".to_string()));
            stored?;
            Ok(())
        }

        let err = load().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AutomodError>(),
            Some(AutomodError::StorageError(_))
        ));
        assert_eq!(err.to_string(), "Storage error: database is locked");
    }
}
