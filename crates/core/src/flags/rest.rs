//! Hosted settings table reached over a PostgREST-style HTTP API.
//!
//! - read: `GET {base}/rest/v1/settings?select=key,value`
//! - write: `POST {base}/rest/v1/settings` with `Prefer: resolution=merge-duplicates` (upsert)

use super::{FeatureFlags, FlagKey, FlagStore, SettingRow};
use crate::error::{FlagStoreError, FlagStoreResult};
use std::time::Duration;

const SETTINGS_TABLE_PATH: &str = "rest/v1/settings";

#[derive(Debug, Clone)]
pub struct RestFlagStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestFlagStore {
    /// Creates a store for the settings table under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `FlagStoreError::Http` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> FlagStoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(FlagStoreError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key,
        })
    }

    fn table_url(&self) -> String {
        format!("{}/{}", self.base_url, SETTINGS_TABLE_PATH)
    }

    fn authorised(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }

    async fn fetch_rows(&self) -> FlagStoreResult<Vec<SettingRow>> {
        let response = self
            .authorised(self.client.get(self.table_url()))
            .query(&[("select", "key,value")])
            .send()
            .await
            .map_err(FlagStoreError::Http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FlagStoreError::Status(status.as_u16()));
        }

        response.json().await.map_err(FlagStoreError::Http)
    }
}

#[async_trait::async_trait]
impl FlagStore for RestFlagStore {
    async fn snapshot(&self) -> FlagStoreResult<FeatureFlags> {
        let rows = self.fetch_rows().await?;
        FeatureFlags::from_rows(&rows)
    }

    async fn update(
        &self,
        key: FlagKey,
        value: serde_json::Value,
    ) -> FlagStoreResult<FeatureFlags> {
        let mut flags = self.snapshot().await?;
        flags.apply(key, &value)?;

        let row = SettingRow {
            key: key.as_str().to_owned(),
            value,
        };
        let response = self
            .authorised(self.client.post(self.table_url()))
            .header("Prefer", "resolution=merge-duplicates")
            .json(&[row])
            .send()
            .await
            .map_err(FlagStoreError::Http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FlagStoreError::Status(status.as_u16()));
        }

        tracing::info!(flag = %key, "feature flag updated in hosted settings table");
        Ok(flags)
    }
}
