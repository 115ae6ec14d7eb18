use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use super::{names, FetchContext, Source};

const API_VERSION: &str = "2023-03-01";

/// Version stamp for the static fallback table below; bump when the table
/// changes so degraded payloads stay auditable.
const FALLBACK_VERSION: &str = "2026-07";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CostsSection {
    pub currency: String,
    /// Month-to-date actual cost.
    pub total: f64,
    pub history: Vec<DailyCost>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub(crate) struct DailyCost {
    pub date: String,
    pub cost: f64,
}

/// Month-to-date actual cost with daily granularity, via the Cost
/// Management query endpoint.
pub(crate) struct CostsSource {
    ttl: Duration,
}

impl CostsSource {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }
}

#[async_trait]
impl Source for CostsSource {
    fn name(&self) -> &'static str {
        names::COSTS
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    fn fallback(&self) -> Option<Value> {
        Some(json!({
            "currency": "USD",
            "total": 0.0,
            "history": [],
            "fallbackVersion": FALLBACK_VERSION,
        }))
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<Value> {
        let body = json!({
            "type": "ActualCost",
            "timeframe": "MonthToDate",
            "dataset": {
                "granularity": "Daily",
                "aggregation": {
                    "totalCost": { "name": "Cost", "function": "Sum" }
                }
            }
        });
        let raw = ctx
            .arm_post(
                &format!("/providers/Microsoft.CostManagement/query?api-version={API_VERSION}"),
                &body,
            )
            .await?;
        let section = map_cost_query(&raw)?;
        serde_json::to_value(section).context("serializing costs section")
    }
}

/// Shape the Cost Management row set into the dashboard section. Rows are
/// `[cost, usageDate, currency]` with the column order declared in
/// `properties.columns`.
pub(crate) fn map_cost_query(raw: &Value) -> Result<CostsSection> {
    let columns = raw
        .pointer("/properties/columns")
        .and_then(Value::as_array)
        .context("cost query response missing columns")?;
    let find = |name: &str| {
        columns
            .iter()
            .position(|c| c.get("name").and_then(Value::as_str) == Some(name))
    };
    let cost_idx = find("Cost").context("cost query response missing Cost column")?;
    let date_idx = find("UsageDate").context("cost query response missing UsageDate column")?;
    let currency_idx = find("Currency");

    let rows = raw
        .pointer("/properties/rows")
        .and_then(Value::as_array)
        .context("cost query response missing rows")?;

    let mut history = Vec::with_capacity(rows.len());
    let mut total = 0.0f64;
    let mut currency = "USD".to_string();
    for row in rows {
        let row = row.as_array().context("cost row is not an array")?;
        let cost = row
            .get(cost_idx)
            .and_then(Value::as_f64)
            .context("cost row missing cost value")?;
        let date = row
            .get(date_idx)
            .and_then(Value::as_u64)
            .context("cost row missing usage date")?;
        if let Some(idx) = currency_idx {
            if let Some(c) = row.get(idx).and_then(Value::as_str) {
                currency = c.to_string();
            }
        }
        total += cost;
        history.push(DailyCost {
            date: format_usage_date(date),
            cost,
        });
    }
    history.sort_by(|a, b| a.date.cmp(&b.date));

    Ok(CostsSection {
        currency,
        total,
        history,
    })
}

/// `20260801` → `"2026-08-01"`.
fn format_usage_date(yyyymmdd: u64) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        yyyymmdd / 10_000,
        (yyyymmdd / 100) % 100,
        yyyymmdd % 100
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Value {
        json!({
            "properties": {
                "columns": [
                    { "name": "Cost", "type": "Number" },
                    { "name": "UsageDate", "type": "Number" },
                    { "name": "Currency", "type": "String" }
                ],
                "rows": [
                    [12.5, 20260802u64, "EUR"],
                    [3.25, 20260801u64, "EUR"]
                ]
            }
        })
    }

    #[test]
    fn maps_rows_into_sorted_history_and_total() {
        let section = map_cost_query(&fixture()).expect("mapped");
        assert_eq!(section.currency, "EUR");
        assert!((section.total - 15.75).abs() < f64::EPSILON);
        assert_eq!(section.history.len(), 2);
        assert_eq!(section.history[0].date, "2026-08-01");
        assert_eq!(section.history[1].cost, 12.5);
    }

    #[test]
    fn empty_row_set_is_a_zero_month_not_an_error() {
        let raw = json!({
            "properties": {
                "columns": [
                    { "name": "Cost" }, { "name": "UsageDate" }, { "name": "Currency" }
                ],
                "rows": []
            }
        });
        let section = map_cost_query(&raw).expect("mapped");
        assert_eq!(section.total, 0.0);
        assert!(section.history.is_empty());
    }

    #[test]
    fn missing_columns_surface_as_errors() {
        let raw = json!({"properties": {"rows": []}});
        assert!(map_cost_query(&raw).is_err());
    }

    #[test]
    fn fallback_table_is_version_stamped() {
        let fallback = CostsSource::new(Duration::from_secs(3600))
            .fallback()
            .expect("costs has a fallback table");
        assert_eq!(fallback["fallbackVersion"], json!(FALLBACK_VERSION));
    }
}
