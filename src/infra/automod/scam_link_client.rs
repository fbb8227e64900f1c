use crate::core::automod::{ScamCheckError, ScamLinkChecker};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// HTTP client for the link-reputation service.
///
/// POSTs `{"content": ..., "silent": ...}` and expects `{"is_scam": bool}`.
/// Timeouts are enforced by `ScamLinkGuard`, not here.
pub struct ScamLinkApiClient {
    client: Client,
    url: String,
}

#[derive(Serialize)]
struct ScamCheckRequest<'a> {
    content: &'a str,
    silent: bool,
}

#[derive(Deserialize)]
struct ScamCheckResponse {
    is_scam: bool,
}

impl ScamLinkApiClient {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }
}

fn parse_verdict(body: &str) -> Result<bool, ScamCheckError> {
    serde_json::from_str::<ScamCheckResponse>(body)
        .map(|r| r.is_scam)
        .map_err(|e| ScamCheckError::BadResponse(e.to_string()))
}

#[async_trait]
impl ScamLinkChecker for ScamLinkApiClient {
    async fn check(&self, content: &str, silent: bool) -> Result<bool, ScamCheckError> {
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&ScamCheckRequest { content, silent })
            .send()
            .await
            .map_err(|e| ScamCheckError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ScamCheckError::Unavailable(format!(
                "Scam link API error: {} - {}",
                status, text
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ScamCheckError::Unavailable(e.to_string()))?;

        parse_verdict(&body)
    }
}
