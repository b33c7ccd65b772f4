use std::sync::{Arc, RwLock};

use civiqa_models::{Dataset, DomainId, ToolDefinition, ToolOutcome};
use serde_json::{Map, Value};

/// Interface every data domain implements. The registry discovers and
/// dispatches to domains through this trait alone; adding a domain never
/// touches dispatch code.
pub trait DataDomain: Send + Sync {
    fn domain_id(&self) -> DomainId;

    /// Tool schemas consumed by the LLM prompt builder. Declaration order
    /// is presentation order.
    fn tool_definitions(&self) -> Vec<ToolDefinition>;

    /// Execute one of this domain's tools. Schema violations come back as
    /// outcome values, never as panics or errors.
    fn call_tool(&self, name: &str, arguments: &Map<String, Value>) -> ToolOutcome;

    /// Render an outcome into the compact text that re-enters LLM context.
    fn format_result(&self, outcome: &ToolOutcome) -> String;

    fn tool_names(&self) -> Vec<String> {
        self.tool_definitions().into_iter().map(|d| d.name).collect()
    }
}

/// Shared handle to one domain's dataset.
///
/// The fetch layer replaces the inner `Arc` wholesale on refresh; query
/// code clones the `Arc` and works on an immutable snapshot. Readers
/// never observe a half-populated table because replacement is a pointer
/// swap, so lock poisoning is recovered rather than propagated.
pub struct DatasetCell {
    inner: RwLock<Arc<Dataset>>,
}

impl DatasetCell {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self {
            inner: RwLock::new(dataset),
        }
    }

    pub fn empty(domain: DomainId) -> Self {
        Self::new(Arc::new(Dataset::empty(domain)))
    }

    /// Current snapshot. Cheap: clones the `Arc`, not the rows.
    pub fn get(&self) -> Arc<Dataset> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn replace(&self, dataset: Arc<Dataset>) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = dataset;
    }
}

/// Digit grouping for formatted counts: 1234567 -> "1,234,567".
pub(crate) fn thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0 {
        format!("-{out}")
    } else {
        out
    }
}
