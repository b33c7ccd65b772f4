use std::collections::HashSet;
use std::time::Duration;

use civiqa_models::{Dataset, DomainId, Record};
use tracing::{debug, info, warn};

use crate::client::DataPortal;
use crate::error::FetchError;

/// Defensive upper bound on pages fetched in one attempt.
pub const MAX_PAGES: u64 = 100;

/// Optional SoQL clauses sent with every page request for a source.
#[derive(Debug, Clone, Default)]
pub struct SoqlQuery {
    pub select: Option<&'static str>,
    pub where_clause: Option<&'static str>,
    pub group: Option<&'static str>,
    pub order: Option<&'static str>,
}

/// Static descriptor for one remote dataset.
#[derive(Debug, Clone)]
pub struct DomainSource {
    pub domain: DomainId,
    pub host: &'static str,
    pub dataset_id: &'static str,
    pub ttl_hours: u64,
    pub batch_size: u64,
    /// Column identifying a row across pages; None dedups on the whole row.
    pub unique_key: Option<&'static str>,
    pub soql: SoqlQuery,
}

impl DomainSource {
    /// The built-in portal descriptor for a domain.
    ///
    /// Property sales is the odd one out: the raw parcel-sales table is far
    /// too large to page, so its source runs a server-side aggregation by
    /// year and township and the "rows" are already grouped summaries.
    pub fn builtin(domain: DomainId) -> DomainSource {
        match domain {
            DomainId::Homicides => DomainSource {
                domain,
                host: "data.cityofchicago.org",
                dataset_id: "ijzp-q8t2",
                ttl_hours: 6,
                batch_size: 10_000,
                unique_key: Some("id"),
                soql: SoqlQuery {
                    where_clause: Some("primary_type = 'HOMICIDE'"),
                    ..SoqlQuery::default()
                },
            },
            DomainId::Census => DomainSource {
                domain,
                host: "data.cityofchicago.org",
                dataset_id: "t68z-cikk",
                ttl_hours: 168,
                batch_size: 10_000,
                unique_key: None,
                soql: SoqlQuery::default(),
            },
            DomainId::Socioeconomic => DomainSource {
                domain,
                host: "data.cityofchicago.org",
                dataset_id: "kn9c-c2s2",
                ttl_hours: 720,
                batch_size: 10_000,
                unique_key: Some("ca"),
                soql: SoqlQuery::default(),
            },
            DomainId::PropertySales => DomainSource {
                domain,
                host: "datacatalog.cookcountyil.gov",
                dataset_id: "wvhk-k5uv",
                ttl_hours: 24,
                batch_size: 500,
                unique_key: None,
                soql: SoqlQuery {
                    select: Some(
                        "year, township_code, \
                         count(*) as sales_count, \
                         avg(sale_price) as avg_price, \
                         min(sale_price) as min_price, \
                         max(sale_price) as max_price, \
                         sum(sale_price) as total_volume",
                    ),
                    where_clause: Some(
                        "sale_price > 10000 AND class LIKE '2%' \
                         AND township_code IN ('70','71','72','73','74','75','76','77')",
                    ),
                    group: Some("year, township_code"),
                    order: Some("year DESC, township_code"),
                },
            },
        }
    }
}

/// Page through a source until a short page, an empty page, or the page cap.
///
/// Rows are deduplicated across pages: under concurrent remote writes,
/// adjacent pages can overlap. A mid-pagination failure discards everything
/// fetched in this attempt; the caller decides whether a stale snapshot can
/// stand in.
pub async fn fetch_domain(
    portal: &dyn DataPortal,
    source: &DomainSource,
    pacing: Duration,
) -> Result<Dataset, FetchError> {
    if let Ok(Some(total)) = portal.total_count(source).await {
        info!(domain = %source.domain, total, "remote row count");
    }

    let mut rows: Vec<Record> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut duplicates: usize = 0;
    let mut offset: u64 = 0;
    let mut pages: u64 = 0;

    loop {
        let page = portal.fetch_page(source, offset, source.batch_size).await?;
        if page.is_empty() {
            debug!(domain = %source.domain, offset, "no more rows");
            break;
        }

        let page_len = page.len() as u64;
        for row in page {
            let key = row_key(source, &row)?;
            if seen.insert(key) {
                rows.push(row);
            } else {
                duplicates += 1;
            }
        }

        pages += 1;
        offset += page_len;

        if page_len < source.batch_size {
            debug!(domain = %source.domain, offset, "reached end of dataset");
            break;
        }
        if pages >= MAX_PAGES {
            warn!(domain = %source.domain, pages, "page cap reached, stopping");
            break;
        }
        tokio::time::sleep(pacing).await;
    }

    if rows.is_empty() {
        return Err(FetchError::EmptyDataset(source.domain));
    }
    if duplicates > 0 {
        info!(domain = %source.domain, duplicates, "removed duplicate rows");
    }
    info!(domain = %source.domain, rows = rows.len(), pages, "fetch complete");

    Ok(Dataset::new(source.domain, rows))
}

fn row_key(source: &DomainSource, row: &Record) -> Result<String, FetchError> {
    if let Some(col) = source.unique_key {
        if let Some(value) = row.get(col) {
            return Ok(format!("{col}={value}"));
        }
    }
    // Record's column map is ordered, so this serialization is canonical.
    Ok(serde_json::to_string(row)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{numbered_rows, MockPortal};

    fn test_source(batch_size: u64) -> DomainSource {
        DomainSource {
            domain: DomainId::Homicides,
            host: "example.test",
            dataset_id: "test-data",
            ttl_hours: 1,
            batch_size,
            unique_key: Some("id"),
            soql: SoqlQuery::default(),
        }
    }

    #[test]
    fn builtin_descriptors_cover_every_domain() {
        for domain in DomainId::ALL {
            let source = DomainSource::builtin(domain);
            assert_eq!(source.domain, domain);
            assert!(!source.dataset_id.is_empty());
        }

        assert_eq!(DomainSource::builtin(DomainId::Homicides).ttl_hours, 6);
        assert_eq!(DomainSource::builtin(DomainId::Census).ttl_hours, 168);
        assert_eq!(DomainSource::builtin(DomainId::Socioeconomic).ttl_hours, 720);

        let property = DomainSource::builtin(DomainId::PropertySales);
        assert_eq!(property.ttl_hours, 24);
        assert!(property.soql.group.is_some(), "property source is aggregated");
    }

    #[tokio::test]
    async fn stops_on_short_page() {
        let portal = MockPortal::new(vec![
            Ok(numbered_rows(0, 5)),
            Ok(numbered_rows(5, 5)),
            Ok(numbered_rows(10, 2)),
        ]);
        let source = test_source(5);

        let dataset = fetch_domain(&portal, &source, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(dataset.len(), 12);
        assert_eq!(portal.fetch_count(), 3);
    }

    #[tokio::test]
    async fn dedups_across_overlapping_pages() {
        let portal = MockPortal::new(vec![
            Ok(numbered_rows(0, 5)),
            // Overlaps the previous page by one row, then ends short.
            Ok(numbered_rows(4, 3)),
        ]);
        let source = test_source(5);

        let dataset = fetch_domain(&portal, &source, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(dataset.len(), 7);
    }

    #[tokio::test]
    async fn mid_fetch_failure_discards_partial_rows() {
        let portal = MockPortal::new(vec![
            Ok(numbered_rows(0, 5)),
            Err("portal unavailable".to_string()),
        ]);
        let source = test_source(5);

        let result = fetch_domain(&portal, &source, Duration::ZERO).await;
        assert!(matches!(result, Err(FetchError::Status { .. })));
    }

    #[tokio::test]
    async fn empty_result_is_an_error() {
        let portal = MockPortal::new(vec![Ok(Vec::new())]);
        let source = test_source(5);

        let result = fetch_domain(&portal, &source, Duration::ZERO).await;
        assert!(matches!(result, Err(FetchError::EmptyDataset(_))));
    }

    #[tokio::test]
    async fn page_cap_bounds_runaway_sources() {
        // Every page comes back full, so only the cap can stop the loop.
        let pages: Vec<Result<Vec<Record>, String>> = (0..200i64)
            .map(|i| Ok(numbered_rows(i * 2, 2)))
            .collect();
        let portal = MockPortal::new(pages);
        let source = test_source(2);

        let dataset = fetch_domain(&portal, &source, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(portal.fetch_count() as u64, MAX_PAGES);
        assert_eq!(dataset.len() as u64, MAX_PAGES * 2);
    }
}
