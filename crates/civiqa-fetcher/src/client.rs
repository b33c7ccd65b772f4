use std::time::Duration;

use async_trait::async_trait;
use civiqa_models::Record;
use serde_json::Value;
use tracing::debug;

use crate::error::FetchError;
use crate::source::DomainSource;

/// Hard ceiling on a single page regardless of configured batch size.
const MAX_PAGE_LIMIT: u64 = 50_000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A remote tabular data portal, paged Socrata-style with `$offset`/`$limit`.
#[async_trait]
pub trait DataPortal: Send + Sync {
    /// Fetch one page of rows for a source.
    async fn fetch_page(
        &self,
        source: &DomainSource,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Record>, FetchError>;

    /// Total row count for the source, if the portal can answer cheaply.
    /// Used for progress logging only, never as a loop bound.
    async fn total_count(&self, source: &DomainSource) -> Result<Option<u64>, FetchError>;
}

/// HTTP client for Socrata open-data portals.
pub struct SocrataClient {
    http: reqwest::Client,
}

impl SocrataClient {
    pub fn new() -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http })
    }

    fn resource_url(source: &DomainSource) -> String {
        format!("https://{}/resource/{}.json", source.host, source.dataset_id)
    }
}

#[async_trait]
impl DataPortal for SocrataClient {
    async fn fetch_page(
        &self,
        source: &DomainSource,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Record>, FetchError> {
        let url = Self::resource_url(source);
        let mut params: Vec<(&str, String)> = vec![
            ("$offset", offset.to_string()),
            ("$limit", limit.min(MAX_PAGE_LIMIT).to_string()),
        ];
        if let Some(select) = source.soql.select {
            params.push(("$select", select.to_string()));
        }
        if let Some(clause) = source.soql.where_clause {
            params.push(("$where", clause.to_string()));
        }
        if let Some(group) = source.soql.group {
            params.push(("$group", group.to_string()));
        }
        if let Some(order) = source.soql.order {
            params.push(("$order", order.to_string()));
        }

        debug!(domain = %source.domain, offset, limit, "fetching page");
        let response = self.http.get(&url).query(&params).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let rows: Vec<Record> = response.json().await?;
        Ok(rows)
    }

    async fn total_count(&self, source: &DomainSource) -> Result<Option<u64>, FetchError> {
        let url = Self::resource_url(source);
        let mut params: Vec<(&str, String)> = vec![("$select", "count(*)".to_string())];
        if let Some(clause) = source.soql.where_clause {
            params.push(("$where", clause.to_string()));
        }

        let response = self.http.get(&url).query(&params).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let rows: Vec<Value> = response.json().await?;
        Ok(parse_count(&rows))
    }
}

/// Socrata serializes `count(*)` as a one-row list with a string value.
fn parse_count(rows: &[Value]) -> Option<u64> {
    rows.first()
        .and_then(|row| row.get("count"))
        .and_then(|value| match value {
            Value::String(s) => s.parse::<u64>().ok(),
            Value::Number(n) => n.as_u64(),
            _ => None,
        })
}
