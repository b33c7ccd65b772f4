use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::tool_schema::ToolCall;

pub const TRACE_SCHEMA_VERSION: u32 = 1;

/// Why an orchestration run stopped asking for tools.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The LLM answered without requesting a tool.
    DirectAnswer,
    /// The per-run tool call cap was reached.
    MaxIterations,
    /// The run-level timeout expired between iterations.
    Timeout,
    /// The LLM repeated an already-executed call.
    DuplicateCall,
    /// A marker was present but no call could be extracted.
    ExtractionFailed,
}

/// Execution details for one dispatched tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionRecord {
    pub tool_name: String,
    pub arguments: Value,
    /// Error description when the outcome was not data.
    pub error: Option<String>,
    pub formatted: String,
    pub elapsed_ms: u64,
}

/// One iteration of the ask/extract/dispatch cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IterationRecord {
    pub iteration: u32,
    /// Leading excerpt of the model's raw text for this iteration.
    pub model_excerpt: String,
    pub tool_call: Option<ToolCall>,
    pub execution: Option<ExecutionRecord>,
    /// True when a duplicate call reused a prior result instead of executing.
    pub reused_prior: bool,
}

/// Full call/result trace of one run, attached to the answer as metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunTrace {
    pub iterations: Vec<IterationRecord>,
    pub stop: StopReason,
    /// Set when the run-level timeout forced synthesis with partial results.
    pub timeout_truncated: bool,
    pub tool_calls_executed: u32,
}

/// The user-visible answer to one question plus its run metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerReport {
    pub id: Uuid,
    pub schema_version: u32,
    pub question: String,
    pub answer: String,
    pub answered_at: DateTime<Utc>,
    pub trace: RunTrace,
    pub processing_time_ms: u64,
}
