pub mod answer;
pub mod cache_schema;
pub mod config;
pub mod record;
pub mod tool_schema;

pub use answer::{
    AnswerReport, ExecutionRecord, IterationRecord, RunTrace, StopReason, TRACE_SCHEMA_VERSION,
};
pub use cache_schema::{SnapshotRow, SNAPSHOT_TABLE_DDL};
pub use config::{AgentConfig, CacheConfig, CiviqaConfig};
pub use record::{Dataset, DomainId, Record};
pub use tool_schema::{ParamType, ToolCall, ToolDefinition, ToolOutcome, ToolParam, ToolResult};
