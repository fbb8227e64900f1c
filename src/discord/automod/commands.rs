// Automod slash commands for rule management.

use crate::core::automod::{Combinator, ConditionRecord, RuleRecord};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum CombinatorChoice {
    #[name = "All conditions"]
    All,
    #[name = "Any condition"]
    Any,
}

impl From<CombinatorChoice> for Combinator {
    fn from(choice: CombinatorChoice) -> Self {
        match choice {
            CombinatorChoice::All => Combinator::All,
            CombinatorChoice::Any => Combinator::Any,
        }
    }
}

/// Automod rule management.
#[poise::command(
    slash_command,
    subcommands("list", "add", "remove", "reload"),
    required_permissions = "MANAGE_GUILD",
    guild_only
)]
pub async fn automod(_ctx: Context<'_>) -> Result<(), Error> {
    // Parent command - shows help
    Ok(())
}

/// Show every automod rule configured for this server.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let rules = ctx
        .data()
        .automod
        .list_rules(guild_id.get())
        .await?;

    if rules.is_empty() {
        ctx.say("No automod rules are configured for this server.")
            .await?;
        return Ok(());
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("🛡️ Automod Rules")
        .color(0x5865F2);

    // Discord caps embeds at 25 fields.
    for rule in rules.iter().take(25) {
        let kinds: Vec<&str> = rule.conditions.iter().map(|c| c.kind.as_str()).collect();
        let status = if rule.enabled { "✅" } else { "❌" };
        embed = embed.field(
            format!("{} {}", status, rule.name),
            format!(
                "Fires when **{}** of: {}",
                rule.combinator,
                if kinds.is_empty() {
                    "(no conditions)".to_string()
                } else {
                    kinds.join(", ")
                }
            ),
            false,
        );
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Add or replace an automod rule.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn add(
    ctx: Context<'_>,
    #[description = "Rule name"] name: String,
    #[description = "How conditions combine"] combinator: CombinatorChoice,
    #[description = "Conditions as JSON, e.g. [{\"kind\":\"any_link\"}]"] conditions: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let conditions: Vec<ConditionRecord> = match serde_json::from_str(&conditions) {
        Ok(c) => c,
        Err(e) => {
            ctx.say(format!("❌ Could not read the conditions JSON: {}", e))
                .await?;
            return Ok(());
        }
    };

    let rule = RuleRecord {
        name: name.clone(),
        combinator: combinator.into(),
        conditions,
        enabled: true,
    };

    match ctx.data().automod.save_rule(guild_id.get(), rule).await {
        Ok(()) => {
            ctx.say(format!("✅ Automod rule **{}** saved.", name))
                .await?;
        }
        Err(e) => {
            ctx.say(format!("❌ Rule **{}** was not saved: {}", name, e))
                .await?;
        }
    }

    Ok(())
}

/// Delete an automod rule.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Rule name"] name: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let removed = ctx
        .data()
        .automod
        .delete_rule(guild_id.get(), &name)
        .await?;

    if removed {
        ctx.say(format!("🗑️ Automod rule **{}** deleted.", name))
            .await?;
    } else {
        ctx.say(format!("No automod rule named **{}**.", name))
            .await?;
    }
    Ok(())
}

/// Rebuild this server's rules from storage. Resets all rate counters.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn reload(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    ctx.data().automod.reload(guild_id.get());

    ctx.say("🔄 Automod rules will be reloaded on the next event.")
        .await?;
    Ok(())
}
