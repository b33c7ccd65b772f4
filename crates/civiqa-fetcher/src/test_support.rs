//! Scripted portal implementations for fetcher tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use civiqa_models::Record;
use serde_json::json;

use crate::client::DataPortal;
use crate::error::FetchError;
use crate::source::DomainSource;

/// Serves a fixed sequence of pages, counting how often the network was
/// touched. A scripted `Err` surfaces as a remote 503; once the script is
/// exhausted, further pages are empty.
pub struct MockPortal {
    pages: Mutex<VecDeque<Result<Vec<Record>, String>>>,
    fetch_calls: AtomicUsize,
}

impl MockPortal {
    pub fn new(pages: Vec<Result<Vec<Record>, String>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataPortal for MockPortal {
    async fn fetch_page(
        &self,
        source: &DomainSource,
        _offset: u64,
        _limit: u64,
    ) -> Result<Vec<Record>, FetchError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .pages
            .lock()
            .expect("mock page script lock")
            .pop_front();
        match next {
            Some(Ok(rows)) => Ok(rows),
            Some(Err(message)) => Err(FetchError::Status {
                status: 503,
                url: format!("mock://{}/{}: {message}", source.host, source.dataset_id),
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn total_count(&self, _source: &DomainSource) -> Result<Option<u64>, FetchError> {
        Ok(None)
    }
}

/// `count` rows with sequential string ids starting at `start`, shaped like
/// a minimal homicide record.
pub fn numbered_rows(start: i64, count: i64) -> Vec<Record> {
    (start..start + count)
        .map(|i| {
            Record::from_iter([
                ("id".to_string(), json!(format!("{i}"))),
                ("year".to_string(), json!(2023)),
                ("district".to_string(), json!(format!("{}", i % 25 + 1))),
                ("arrest".to_string(), json!(i % 2 == 0)),
            ])
        })
        .collect()
}
