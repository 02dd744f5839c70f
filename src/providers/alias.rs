//! Disposable alias email provider client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{PaneError, Result};
use crate::identity::Identity;

/// Provider-side alias record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasResult {
    pub id: String,
    pub email: String,
}

#[async_trait]
pub trait AliasProvider: Send + Sync {
    /// Create a forwarding alias for the given context name and identity.
    async fn create(&self, name: &str, identity: &Identity) -> Result<AliasResult>;

    /// Burn an alias. Idempotent on the provider side.
    async fn delete(&self, id: &str) -> Result<()>;
}

#[derive(Serialize)]
struct CreateAliasRequest<'a> {
    name: &'a str,
    display_name: &'a str,
}

/// HTTP client for the alias provider API.
#[derive(Debug, Clone)]
pub struct AliasClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl AliasClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PaneError::AliasProvider(format!("http client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }
}

#[async_trait]
impl AliasProvider for AliasClient {
    async fn create(&self, name: &str, identity: &Identity) -> Result<AliasResult> {
        let url = format!("{}/aliases", self.base_url);
        let body = CreateAliasRequest {
            name,
            display_name: &identity.full_name,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PaneError::AliasProvider(format!("create alias: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PaneError::AliasProvider(format!(
                "create alias failed with status {status}: {text}"
            )));
        }

        response
            .json::<AliasResult>()
            .await
            .map_err(|e| PaneError::AliasProvider(format!("parse alias response: {e}")))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let url = format!("{}/aliases/{id}", self.base_url);
        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| PaneError::AliasProvider(format!("delete alias: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(PaneError::AliasProvider(format!(
                "delete alias {id} failed with status {status}"
            )));
        }
        Ok(())
    }
}
