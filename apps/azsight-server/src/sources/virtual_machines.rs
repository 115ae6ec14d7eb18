use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::{names, FetchContext, Source};

const API_VERSION: &str = "2024-07-01";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VirtualMachinesSection {
    pub vm_count: u64,
    pub by_location: BTreeMap<String, u64>,
    pub vms: Vec<VirtualMachine>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VirtualMachine {
    pub name: String,
    pub location: String,
    pub size: Option<String>,
}

/// Compute inventory for the subscription.
pub(crate) struct VirtualMachinesSource {
    ttl: Duration,
}

impl VirtualMachinesSource {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }
}

#[async_trait]
impl Source for VirtualMachinesSource {
    fn name(&self) -> &'static str {
        names::VIRTUAL_MACHINES
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<Value> {
        let raw = ctx
            .arm_get(&format!(
                "/providers/Microsoft.Compute/virtualMachines?api-version={API_VERSION}"
            ))
            .await?;
        let section = map_virtual_machines(&raw)?;
        serde_json::to_value(section).context("serializing virtualMachines section")
    }
}

pub(crate) fn map_virtual_machines(raw: &Value) -> Result<VirtualMachinesSection> {
    let items = raw
        .get("value")
        .and_then(Value::as_array)
        .context("virtual machine list missing value array")?;

    let mut by_location: BTreeMap<String, u64> = BTreeMap::new();
    let vms: Vec<VirtualMachine> = items
        .iter()
        .map(|item| {
            let location = item
                .get("location")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if !location.is_empty() {
                *by_location.entry(location.clone()).or_default() += 1;
            }
            VirtualMachine {
                name: item
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                location,
                size: item
                    .pointer("/properties/hardwareProfile/vmSize")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }
        })
        .collect();

    Ok(VirtualMachinesSection {
        vm_count: vms.len() as u64,
        by_location,
        vms,
    })
}
