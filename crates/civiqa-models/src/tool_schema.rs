use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Scalar type a tool parameter accepts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    /// Array of strings (used for comparison-area lists).
    Array,
}

/// One named parameter of a tool, with the description shown to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolParam {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
}

impl ToolParam {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            required: true,
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            required: false,
        }
    }
}

/// Schema for one tool an LLM may invoke.
///
/// Tool names are globally unique across the registry; the registry
/// rejects a second domain claiming an already-registered name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// Declaration order is presentation order in prompts.
    pub params: Vec<ToolParam>,
}

impl ToolDefinition {
    pub fn new(name: &str, description: &str, params: Vec<ToolParam>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            params,
        }
    }

    pub fn required_params(&self) -> impl Iterator<Item = &ToolParam> {
        self.params.iter().filter(|p| p.required)
    }
}

/// An invocation request extracted from LLM text. Not yet validated:
/// the name may be unknown and the arguments may violate the schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            arguments: Map::new(),
        }
    }

    /// Stable identity for duplicate detection: name plus the arguments
    /// serialized with keys in sorted order. `serde_json::Map` over a
    /// BTreeMap already iterates sorted, so serialization is canonical.
    pub fn dedup_key(&self) -> (String, String) {
        let args = Value::Object(self.arguments.clone());
        (self.name.clone(), args.to_string())
    }
}

/// Outcome of dispatching one tool call.
///
/// Schema violations and unknown names are values here, not errors: they
/// flow back to the LLM as formatted text so the loop can recover.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolOutcome {
    Data {
        value: Value,
    },
    MissingParameter {
        tool: String,
        parameter: String,
    },
    InvalidParameter {
        tool: String,
        parameter: String,
        message: String,
    },
    UnknownTool {
        name: String,
        available: Vec<String>,
    },
    DataUnavailable {
        domain: String,
        message: String,
    },
}

impl ToolOutcome {
    pub fn data(value: Value) -> Self {
        ToolOutcome::Data { value }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, ToolOutcome::Data { .. })
    }

    /// Error description for non-data outcomes.
    pub fn error_text(&self) -> Option<String> {
        match self {
            ToolOutcome::Data { .. } => None,
            ToolOutcome::MissingParameter { tool, parameter } => Some(format!(
                "Tool '{tool}' requires parameter '{parameter}'"
            )),
            ToolOutcome::InvalidParameter {
                tool,
                parameter,
                message,
            } => Some(format!(
                "Invalid value for parameter '{parameter}' of tool '{tool}': {message}"
            )),
            ToolOutcome::UnknownTool { name, available } => Some(format!(
                "Tool '{name}' not found. Available tools: {}",
                available.join(", ")
            )),
            ToolOutcome::DataUnavailable { domain, message } => {
                Some(format!("Data for domain '{domain}' unavailable: {message}"))
            }
        }
    }
}

/// One executed (or reused) call accumulated during an orchestration run.
/// Accumulation is append-only and never reordered; the formatted text is
/// what re-enters LLM context on later iterations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub tool_name: String,
    pub arguments: Value,
    pub structured: ToolOutcome,
    pub formatted: String,
}
