// SQLite-backed automod rule store.
//
// Tables:
// - automod_rules: one row per (guild, rule name); conditions kept as JSON

use crate::core::automod::{AutomodError, AutomodStore, Combinator, ConditionRecord, RuleRecord};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteRuleStore {
    pool: Pool<Sqlite>,
}

fn storage_err(e: impl std::fmt::Display) -> AutomodError {
    AutomodError::StorageError(e.to_string())
}

impl SqliteRuleStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), AutomodError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS automod_rules (
                guild_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                combinator TEXT NOT NULL DEFAULT 'all',
                conditions TEXT NOT NULL DEFAULT '[]',
                enabled BOOLEAN NOT NULL DEFAULT 1,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (guild_id, name)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }
}

#[async_trait]
impl AutomodStore for SqliteRuleStore {
    async fn get_rules(&self, guild_id: u64) -> Result<Vec<RuleRecord>, AutomodError> {
        let rows = sqlx::query(
            r#"
            SELECT name, combinator, conditions, enabled
            FROM automod_rules
            WHERE guild_id = ?
            ORDER BY name
            "#,
        )
        .bind(guild_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        let mut rules = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.get("name");
            let combinator: String = row.get("combinator");
            let conditions: String = row.get("conditions");
            let enabled: bool = row.get("enabled");

            // A row we cannot even decode is a storage problem, not a rule problem.
            let combinator: Combinator = combinator.parse().map_err(storage_err)?;
            let conditions: Vec<ConditionRecord> =
                serde_json::from_str(&conditions).map_err(storage_err)?;

            rules.push(RuleRecord {
                name,
                combinator,
                conditions,
                enabled,
            });
        }

        Ok(rules)
    }

    async fn save_rule(&self, guild_id: u64, rule: RuleRecord) -> Result<(), AutomodError> {
        let conditions = serde_json::to_string(&rule.conditions).map_err(storage_err)?;

        sqlx::query(
            r#"
            INSERT INTO automod_rules (guild_id, name, combinator, conditions, enabled, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(guild_id, name) DO UPDATE SET
                combinator = excluded.combinator,
                conditions = excluded.conditions,
                enabled = excluded.enabled,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(guild_id as i64)
        .bind(&rule.name)
        .bind(rule.combinator.to_string())
        .bind(conditions)
        .bind(rule.enabled)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn delete_rule(&self, guild_id: u64, name: &str) -> Result<bool, AutomodError> {
        let result = sqlx::query("DELETE FROM automod_rules WHERE guild_id = ? AND name = ?")
            .bind(guild_id as i64)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(result.rows_affected() > 0)
    }
}
