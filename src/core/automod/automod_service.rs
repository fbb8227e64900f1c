// Automod service - loads a guild's rules, keeps them compiled, and answers
// "which rules does this event trigger?".
//
// NO Discord dependencies here. Deciding what to do about a triggered rule
// (delete, warn, timeout) is up to the caller.

use super::automod_models::{AutomodError, EventContext, RuleRecord};
use super::rule::{Rule, RuleOptions};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for persisting per-guild automod rules.
#[async_trait]
pub trait AutomodStore: Send + Sync {
    /// All rules for a guild, enabled or not, in name order.
    async fn get_rules(&self, guild_id: u64) -> Result<Vec<RuleRecord>, AutomodError>;

    /// Insert or replace a rule (matched by name).
    async fn save_rule(&self, guild_id: u64, rule: RuleRecord) -> Result<(), AutomodError>;

    /// Remove a rule. Returns `false` if it didn't exist.
    async fn delete_rule(&self, guild_id: u64, name: &str) -> Result<bool, AutomodError>;
}

// Blanket implementation for Box<dyn AutomodStore>
// This lets the composition root pick SQLite or in-memory storage at runtime.
#[async_trait]
impl AutomodStore for Box<dyn AutomodStore> {
    async fn get_rules(&self, guild_id: u64) -> Result<Vec<RuleRecord>, AutomodError> {
        (**self).get_rules(guild_id).await
    }

    async fn save_rule(&self, guild_id: u64, rule: RuleRecord) -> Result<(), AutomodError> {
        (**self).save_rule(guild_id, rule).await
    }

    async fn delete_rule(&self, guild_id: u64, name: &str) -> Result<bool, AutomodError> {
        (**self).delete_rule(guild_id, name).await
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

struct NamedRule {
    name: String,
    rule: Rule,
}

/// The compiled, enabled rules of one guild.
struct GuildRules {
    rules: Vec<NamedRule>,
}

pub struct AutomodService<S: AutomodStore> {
    store: S,
    options: RuleOptions,
    /// Guild ID -> compiled rules. Entries live until the guild's config changes.
    compiled: DashMap<u64, Arc<GuildRules>>,
    /// Guild ID -> config generation, bumped on every change. A load that
    /// started under an older generation is thrown away instead of cached.
    generations: DashMap<u64, u64>,
}

impl<S: AutomodStore> AutomodService<S> {
    pub fn new(store: S, options: RuleOptions) -> Self {
        Self {
            store,
            options,
            compiled: DashMap::new(),
            generations: DashMap::new(),
        }
    }

    /// Evaluate every enabled rule of a guild against an event.
    ///
    /// Returns the names of the rules that fired. The only error is failing
    /// to load the guild's rules from storage.
    pub async fn check_event(
        &self,
        guild_id: u64,
        ctx: &EventContext,
    ) -> Result<Vec<String>, AutomodError> {
        let guild_rules = self.guild_rules(guild_id).await?;

        let mut triggered = Vec::new();
        for named in &guild_rules.rules {
            if named.rule.check(ctx).await {
                triggered.push(named.name.clone());
            }
        }

        if !triggered.is_empty() {
            tracing::debug!(guild_id, rules = ?triggered, "Automod rules triggered");
        }

        Ok(triggered)
    }

    /// Validate and persist a rule, then drop the guild's compiled rules.
    pub async fn save_rule(&self, guild_id: u64, rule: RuleRecord) -> Result<(), AutomodError> {
        // Compile first so a bad rule is rejected before it is stored.
        Rule::from_record(&rule, &self.options)?;

        let name = rule.name.clone();
        self.store.save_rule(guild_id, rule).await?;
        self.reload(guild_id);

        tracing::info!(guild_id, rule = %name, "Saved automod rule");
        Ok(())
    }

    pub async fn delete_rule(&self, guild_id: u64, name: &str) -> Result<bool, AutomodError> {
        let removed = self.store.delete_rule(guild_id, name).await?;
        if removed {
            self.reload(guild_id);
            tracing::info!(guild_id, rule = %name, "Deleted automod rule");
        }
        Ok(removed)
    }

    pub async fn list_rules(&self, guild_id: u64) -> Result<Vec<RuleRecord>, AutomodError> {
        self.store.get_rules(guild_id).await
    }

    /// Forget a guild's compiled rules. They are rebuilt, with fresh
    /// counters, on the next event.
    pub fn reload(&self, guild_id: u64) {
        // Hold the generation entry while evicting so a concurrent load
        // can't slip its stale rules in between the two steps.
        let mut generation = self.generations.entry(guild_id).or_insert(0);
        *generation += 1;
        self.compiled.remove(&guild_id);
    }

    /// Evict expired rate-limit buckets across every compiled rule.
    pub fn sweep_limiters(&self, now: Instant) -> usize {
        // Clone the Arcs out so no shard lock is held while sweeping.
        let guilds: Vec<Arc<GuildRules>> = self
            .compiled
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        guilds
            .iter()
            .flat_map(|guild| guild.rules.iter())
            .map(|named| named.rule.sweep_limiters(now))
            .sum()
    }

    async fn guild_rules(&self, guild_id: u64) -> Result<Arc<GuildRules>, AutomodError> {
        loop {
            // Copy the Arc out so the map guard is released before any await.
            let cached = self
                .compiled
                .get(&guild_id)
                .map(|entry| Arc::clone(entry.value()));
            if let Some(existing) = cached {
                return Ok(existing);
            }

            let generation = self.generation(guild_id);
            let records = self.store.get_rules(guild_id).await?;
            let compiled = Arc::new(self.compile(guild_id, records));

            {
                let current = self.generations.entry(guild_id).or_insert(0);
                if *current == generation {
                    // Another task may have loaded the same generation meanwhile;
                    // keep whichever landed first so everyone shares one set of counters.
                    let entry = self.compiled.entry(guild_id).or_insert(compiled);
                    return Ok(Arc::clone(entry.value()));
                }
            }

            tracing::debug!(guild_id, "Automod rules changed during load, reloading");
        }
    }

    fn generation(&self, guild_id: u64) -> u64 {
        self.generations.get(&guild_id).map_or(0, |g| *g)
    }

    fn compile(&self, guild_id: u64, records: Vec<RuleRecord>) -> GuildRules {
        let mut rules = Vec::with_capacity(records.len());

        for record in records.into_iter().filter(|r| r.enabled) {
            match Rule::from_record(&record, &self.options) {
                Ok(rule) => {
                    tracing::debug!(
                        guild_id,
                        rule = %record.name,
                        combinator = %record.combinator,
                        conditions = ?rule.kinds(),
                        "Compiled automod rule"
                    );
                    rules.push(NamedRule {
                        name: record.name,
                        rule,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        guild_id,
                        rule = %record.name,
                        "Skipping automod rule with invalid configuration: {}",
                        e
                    );
                }
            }
        }

        GuildRules { rules }
    }
}

// ============================================================================
// TESTS
// ============================================================================
