use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::{names, FetchContext, Source};

const API_VERSION: &str = "2023-01-01";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StorageSection {
    pub account_count: u64,
    pub accounts: Vec<StorageAccount>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StorageAccount {
    pub name: String,
    pub location: String,
    pub sku: Option<String>,
    pub kind: Option<String>,
}

/// Storage account inventory for the subscription.
pub(crate) struct StorageSource {
    ttl: Duration,
}

impl StorageSource {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }
}

#[async_trait]
impl Source for StorageSource {
    fn name(&self) -> &'static str {
        names::STORAGE
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<Value> {
        let raw = ctx
            .arm_get(&format!(
                "/providers/Microsoft.Storage/storageAccounts?api-version={API_VERSION}"
            ))
            .await?;
        let section = map_storage_accounts(&raw)?;
        serde_json::to_value(section).context("serializing storage section")
    }
}

pub(crate) fn map_storage_accounts(raw: &Value) -> Result<StorageSection> {
    let items = raw
        .get("value")
        .and_then(Value::as_array)
        .context("storage account list missing value array")?;

    let accounts: Vec<StorageAccount> = items
        .iter()
        .map(|item| StorageAccount {
            name: item
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            location: item
                .get("location")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            sku: item
                .pointer("/sku/name")
                .and_then(Value::as_str)
                .map(str::to_string),
            kind: item
                .get("kind")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
        .collect();

    Ok(StorageSection {
        account_count: accounts.len() as u64,
        accounts,
    })
}
