// This is the entry point of the automod bot.
//
// **Architecture Overview:**
// - `core/` = Rule-evaluation engine (platform-agnostic)
// - `infra/` = Implementations of core traits (SQLite, link-reputation API)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands and event handlers

mod config;
// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::config::{BotConfig, StorageBackend};
use crate::core::automod::{AutomodService, AutomodStore, RuleOptions, ScamLinkGuard};
use crate::discord::automod::handler as automod_handler;
use crate::discord::{Data, Error};
use crate::infra::automod::{InMemoryRuleStore, ScamLinkApiClient, SqliteRuleStore};
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Event handler for non-command Discord events.
/// Messages and member joins are run through the guild's automod rules.
async fn event_handler(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            if let Err(e) = automod_handler::handle_message(data, new_message).await {
                tracing::error!("Error running automod on message: {}", e);
            }
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            if let Err(e) = automod_handler::handle_member_join(data, new_member).await {
                tracing::error!("Error running automod on member join: {}", e);
            }
        }

        _ => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = BotConfig::from_env()?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let rule_store: Box<dyn AutomodStore> = match config.storage {
        StorageBackend::Sqlite => {
            // Keep runtime databases in a dedicated folder so the repo root stays tidy.
            std::fs::create_dir_all(&config.data_dir)?;

            let pool = sqlx::sqlite::SqlitePoolOptions::new()
                .connect(&config.database_url())
                .await?;
            let store = SqliteRuleStore::new(pool);
            store.migrate().await?;
            Box::new(store)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory automod storage, rules are lost on restart");
            Box::new(InMemoryRuleStore::new())
        }
    };

    // Scam-link lookups are optional; without an endpoint the condition never fires.
    let scam_links = match &config.scam_link_api_url {
        Some(url) => {
            tracing::info!(url = %url, "Scam link checks enabled");
            let client = ScamLinkApiClient::new(url.clone());
            Some(Arc::new(ScamLinkGuard::new(
                Arc::new(client),
                config.scam_link_timeout,
            )))
        }
        None => {
            tracing::warn!("SCAM_LINK_API_URL not set, scam_links conditions will never fire");
            None
        }
    };

    let options = RuleOptions {
        scam_links,
        max_buckets_per_limiter: config.max_buckets_per_limiter,
    };
    let automod_service = Arc::new(AutomodService::new(rule_store, options));

    // Create the data structure that will be shared across all commands
    let data = Data {
        automod: Arc::clone(&automod_service),
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let sweep_interval = config.sweep_interval;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![discord::automod::commands::automod()],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                tracing::info!("Bot is starting up...");

                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!("Commands registered");

                // Background sweep so rate limiters don't keep buckets for
                // users and channels that went quiet long ago.
                let automod = Arc::clone(&data.automod);
                tokio::spawn(async move {
                    let mut interval = tokio::time::interval(sweep_interval);
                    loop {
                        interval.tick().await;
                        let evicted = automod.sweep_limiters(std::time::Instant::now());
                        if evicted > 0 {
                            tracing::debug!(evicted, "Swept expired rate limit buckets");
                        }
                    }
                });

                tracing::info!("Bot is ready!");
                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await?;

    client.start().await?;
    Ok(())
}
