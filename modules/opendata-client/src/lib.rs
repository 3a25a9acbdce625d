pub mod error;
pub mod types;

pub use error::{CatalogError, Result};
pub use types::{CatalogFilters, RecordsPage};

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use parkgraph_common::RawRecord;
use serde_json::Value;

/// Pause between consecutive pages of a full fetch.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(100);

/// Page size used by [`RecordPager::fetch_all`] when the caller has no preference.
pub const DEFAULT_BATCH_SIZE: u32 = 100;

/// A source of paginated catalog records.
///
/// `fetch` never fails: a page that cannot be retrieved comes back empty, so
/// `fetch_all` stops there. Callers cannot tell a failed page from the end of
/// the data.
#[async_trait]
pub trait RecordPager: Send + Sync {
    /// Fetch a single page.
    async fn fetch(
        &self,
        limit: Option<u32>,
        offset: u64,
        filters: Option<&CatalogFilters>,
    ) -> Vec<RawRecord>;

    /// Delay between pages in `fetch_all`.
    fn throttle(&self) -> Duration {
        DEFAULT_THROTTLE
    }

    /// Walk every page in `batch_size` steps. Stops on an empty page or on a
    /// page shorter than `batch_size`.
    async fn fetch_all(&self, batch_size: u32) -> Vec<RawRecord> {
        let batch_size = batch_size.max(1);
        let mut all = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let page = self.fetch(Some(batch_size), offset, None).await;
            if page.is_empty() {
                break;
            }

            let count = page.len();
            all.extend(page);
            tracing::info!(fetched = all.len(), offset, "Fetched catalog page");

            if count < batch_size as usize {
                break;
            }

            offset += u64::from(batch_size);
            let pause = self.throttle();
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }

        all
    }
}

/// HTTP client for one dataset's `/records` endpoint.
pub struct CatalogClient {
    client: reqwest::Client,
    api_url: String,
    throttle: Duration,
}

impl CatalogClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            throttle: DEFAULT_THROTTLE,
        }
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    /// Fetch one page, surfacing transport and decoding errors.
    pub async fn try_fetch(
        &self,
        limit: Option<u32>,
        offset: u64,
        filters: Option<&CatalogFilters>,
    ) -> Result<Vec<RawRecord>> {
        let mut params: Vec<(&str, String)> = vec![("offset", offset.to_string())];
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(predicate) = filters.and_then(CatalogFilters::where_clause) {
            params.push(("where", predicate));
        }

        let resp = self.client.get(&self.api_url).query(&params).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        let page: RecordsPage = serde_json::from_str(&body)?;
        tracing::debug!(
            offset,
            returned = page.results.len(),
            total = ?page.total_count,
            "Catalog page fetched"
        );
        Ok(page.results)
    }

    /// Distinct, sorted values of `field` among the first `sample_size`
    /// remote records. Useful before anything has been loaded locally.
    pub async fn sample_distinct_values(&self, field: &str, sample_size: u32) -> Vec<String> {
        let sample = self.fetch(Some(sample_size), 0, None).await;
        distinct_values(&sample, field)
    }
}

#[async_trait]
impl RecordPager for CatalogClient {
    async fn fetch(
        &self,
        limit: Option<u32>,
        offset: u64,
        filters: Option<&CatalogFilters>,
    ) -> Vec<RawRecord> {
        match self.try_fetch(limit, offset, filters).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(url = %self.api_url, offset, error = %e, "Catalog page failed, treating as empty");
                Vec::new()
            }
        }
    }

    fn throttle(&self) -> Duration {
        self.throttle
    }
}

fn distinct_values(records: &[RawRecord], field: &str) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| match r.get(field)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
