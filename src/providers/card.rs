//! Virtual card provider client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{PaneError, Result};

/// Provider-side card record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardResult {
    pub token: String,
    pub last_four: String,
}

#[async_trait]
pub trait CardProvider: Send + Sync {
    /// Issue a disposable card with a spend ceiling.
    async fn create(&self, memo: &str, spend_limit_cents: u64) -> Result<CardResult>;

    /// Freeze a card so no further charges clear.
    async fn freeze(&self, token: &str) -> Result<()>;
}

#[derive(Serialize)]
struct CreateCardRequest<'a> {
    memo: &'a str,
    spend_limit_cents: u64,
}

/// HTTP client for the card provider API.
#[derive(Debug, Clone)]
pub struct CardClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl CardClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PaneError::CardProvider(format!("http client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }
}

#[async_trait]
impl CardProvider for CardClient {
    async fn create(&self, memo: &str, spend_limit_cents: u64) -> Result<CardResult> {
        let url = format!("{}/cards", self.base_url);
        let body = CreateCardRequest {
            memo,
            spend_limit_cents,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PaneError::CardProvider(format!("create card: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PaneError::CardProvider(format!(
                "create card failed with status {status}: {text}"
            )));
        }

        response
            .json::<CardResult>()
            .await
            .map_err(|e| PaneError::CardProvider(format!("parse card response: {e}")))
    }

    async fn freeze(&self, token: &str) -> Result<()> {
        let url = format!("{}/cards/{token}/freeze", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| PaneError::CardProvider(format!("freeze card: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(PaneError::CardProvider(format!(
                "freeze card failed with status {status}"
            )));
        }
        Ok(())
    }
}
