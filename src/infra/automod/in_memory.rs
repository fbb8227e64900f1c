// In-memory implementation of AutomodStore.
//
// Rules vanish when the process exits. Used when no database is wanted
// (quick local runs) and as a lightweight store in tests.

use crate::core::automod::{AutomodError, AutomodStore, RuleRecord};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;

/// Guild ID -> (rule name -> rule). BTreeMap keeps names ordered like the SQL store.
pub struct InMemoryRuleStore {
    rules: DashMap<u64, BTreeMap<String, RuleRecord>>,
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self {
            rules: DashMap::new(),
        }
    }
}

impl Default for InMemoryRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AutomodStore for InMemoryRuleStore {
    async fn get_rules(&self, guild_id: u64) -> Result<Vec<RuleRecord>, AutomodError> {
        Ok(self
            .rules
            .get(&guild_id)
            .map(|rules| rules.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn save_rule(&self, guild_id: u64, rule: RuleRecord) -> Result<(), AutomodError> {
        self.rules
            .entry(guild_id)
            .or_default()
            .insert(rule.name.clone(), rule);
        Ok(())
    }

    async fn delete_rule(&self, guild_id: u64, name: &str) -> Result<bool, AutomodError> {
        Ok(self
            .rules
            .get_mut(&guild_id)
            .map(|mut rules| rules.remove(name).is_some())
            .unwrap_or(false))
    }
}
