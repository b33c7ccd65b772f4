pub mod error;
pub mod extract;
pub mod llm;
pub mod orchestrator;
pub mod prompts;

pub mod test_support;

pub use error::AgentError;
pub use extract::{contains_marker, extract_tool_call, TOOL_CALL_MARKER};
pub use llm::{GeminiConfig, GeminiHttp, LanguageModel};
pub use orchestrator::{Orchestrator, RunState};
