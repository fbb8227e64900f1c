// Scam-link detection is delegated to an external link-reputation service.
//
// The engine only consumes a yes/no answer. The lookup is always "silent":
// the service must not message the user itself, because deciding what to do
// with a positive verdict belongs to whoever called the engine.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScamCheckError {
    #[error("Scam link service unavailable: {0}")]
    Unavailable(String),

    #[error("Unexpected response from scam link service: {0}")]
    BadResponse(String),
}

/// Port for the link-reputation collaborator.
#[async_trait]
pub trait ScamLinkChecker: Send + Sync {
    /// Classify `content`. `silent` asks the service not to notify anyone.
    async fn check(&self, content: &str, silent: bool) -> Result<bool, ScamCheckError>;
}

/// Wraps a checker with a hard timeout and the "never fail" contract.
pub struct ScamLinkGuard {
    checker: Arc<dyn ScamLinkChecker>,
    timeout: Duration,
}

impl ScamLinkGuard {
    pub fn new(checker: Arc<dyn ScamLinkChecker>, timeout: Duration) -> Self {
        Self { checker, timeout }
    }

    /// `true` only when the service answered in time and said "scam".
    pub async fn is_scam(&self, content: &str) -> bool {
        if content.trim().is_empty() {
            return false;
        }

        match tokio::time::timeout(self.timeout, self.checker.check(content, true)).await {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(e)) => {
                tracing::warn!("Scam link check failed, treating as clean: {}", e);
                false
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Scam link check timed out, treating as clean"
                );
                false
            }
        }
    }
}
