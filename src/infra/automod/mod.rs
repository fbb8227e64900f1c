// Automod infra layer.
// - `sqlite_rule_store.rs` persists per-guild rules.
// - `in_memory.rs` keeps rules in process memory.
// - `scam_link_client.rs` talks to the link-reputation HTTP API.

pub mod in_memory;
pub mod scam_link_client;
pub mod sqlite_rule_store;

pub use in_memory::InMemoryRuleStore;
pub use scam_link_client::ScamLinkApiClient;
pub use sqlite_rule_store::SqliteRuleStore;
