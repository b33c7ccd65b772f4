use std::collections::HashMap;
use std::sync::Arc;

use civiqa_models::{ToolCall, ToolDefinition, ToolOutcome, ToolResult};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::DataDomain;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Tool '{tool}' is already registered by domain '{existing}'")]
    DuplicateTool { tool: String, existing: String },
}

/// Maps tool names to their owning domains and routes calls.
///
/// Domains self-register at startup; dispatch never branches on a domain
/// identity, only on the name index built here. A dispatch miss is an
/// `UnknownTool` outcome, not an error, so a hallucinated tool name
/// cannot abort a run.
#[derive(Default)]
pub struct ToolRegistry {
    domains: Vec<Arc<dyn DataDomain>>,
    by_tool: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_domain(&mut self, domain: Arc<dyn DataDomain>) -> Result<(), RegistryError> {
        let names = domain.tool_names();
        for name in &names {
            if let Some(&existing) = self.by_tool.get(name) {
                return Err(RegistryError::DuplicateTool {
                    tool: name.clone(),
                    existing: self.domains[existing].domain_id().to_string(),
                });
            }
        }

        let index = self.domains.len();
        for name in &names {
            self.by_tool.insert(name.clone(), index);
        }
        info!(
            domain = %domain.domain_id(),
            tools = names.len(),
            "Registered domain"
        );
        self.domains.push(domain);
        Ok(())
    }

    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }

    /// Tool names in registration order.
    pub fn tool_names(&self) -> Vec<String> {
        self.domains
            .iter()
            .flat_map(|d| d.tool_names())
            .collect()
    }

    /// Every registered tool definition, in registration order. This order
    /// is what prompts present; it never affects dispatch.
    pub fn all_tool_definitions(&self) -> Vec<ToolDefinition> {
        self.domains
            .iter()
            .flat_map(|d| d.tool_definitions())
            .collect()
    }

    /// Route a call to its owning domain and package the outcome with the
    /// formatted text that re-enters LLM context.
    pub fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let outcome = match self.by_tool.get(&call.name) {
            Some(&index) => {
                debug!(tool = %call.name, "Dispatching tool call");
                self.domains[index].call_tool(&call.name, &call.arguments)
            }
            None => ToolOutcome::UnknownTool {
                name: call.name.clone(),
                available: self.tool_names(),
            },
        };

        let formatted = self.format_result(&call.name, &outcome);
        ToolResult {
            tool_name: call.name.clone(),
            arguments: Value::Object(call.arguments.clone()),
            structured: outcome,
            formatted,
        }
    }

    /// Delegate formatting to the owning domain; non-data outcomes render
    /// as their error text regardless of owner.
    pub fn format_result(&self, tool_name: &str, outcome: &ToolOutcome) -> String {
        if let Some(text) = outcome.error_text() {
            return format!("Error: {text}");
        }
        match self.by_tool.get(tool_name) {
            Some(&index) => self.domains[index].format_result(outcome),
            None => serde_json::to_string(outcome).unwrap_or_else(|_| "unformattable result".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civiqa_models::{DomainId, ParamType, ToolParam};
    use serde_json::{json, Map};

    struct StubDomain {
        id: DomainId,
        tools: Vec<&'static str>,
    }

    impl DataDomain for StubDomain {
        fn domain_id(&self) -> DomainId {
            self.id
        }

        fn tool_definitions(&self) -> Vec<ToolDefinition> {
            self.tools
                .iter()
                .map(|name| {
                    ToolDefinition::new(
                        name,
                        "stub",
                        vec![ToolParam::optional("x", ParamType::Integer, "unused")],
                    )
                })
                .collect()
        }

        fn call_tool(&self, name: &str, _arguments: &Map<String, Value>) -> ToolOutcome {
            ToolOutcome::data(json!({"handled_by": self.id.as_str(), "tool": name}))
        }

        fn format_result(&self, outcome: &ToolOutcome) -> String {
            match outcome {
                ToolOutcome::Data { value } => format!("{} says {value}", self.id),
                other => other.error_text().unwrap_or_default(),
            }
        }
    }

    fn registry_with_two_domains() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry
            .register_domain(Arc::new(StubDomain {
                id: DomainId::Homicides,
                tools: vec!["query_homicides_advanced", "get_iucr_info"],
            }))
            .unwrap();
        registry
            .register_domain(Arc::new(StubDomain {
                id: DomainId::Census,
                tools: vec!["query_census_demographics"],
            }))
            .unwrap();
        registry
    }

    #[test]
    fn dispatch_reaches_owning_domain() {
        let registry = registry_with_two_domains();
        let call: ToolCall =
            serde_json::from_value(json!({"name": "query_census_demographics", "arguments": {}}))
                .unwrap();
        let result = registry.dispatch(&call);
        match &result.structured {
            ToolOutcome::Data { value } => assert_eq!(value["handled_by"], "census"),
            other => panic!("expected data, got {other:?}"),
        }
        assert!(result.formatted.contains("census"));
    }

    #[test]
    fn unknown_tool_is_a_value_not_an_error() {
        let registry = registry_with_two_domains();
        let call = ToolCall::new("query_weather");
        let result = registry.dispatch(&call);
        match &result.structured {
            ToolOutcome::UnknownTool { name, available } => {
                assert_eq!(name, "query_weather");
                assert_eq!(available.len(), 3);
            }
            other => panic!("expected UnknownTool, got {other:?}"),
        }
        assert!(result.formatted.contains("not found"));
        assert!(result.formatted.contains("query_census_demographics"));
    }

    #[test]
    fn duplicate_tool_name_rejected_at_registration() {
        let mut registry = registry_with_two_domains();
        let err = registry
            .register_domain(Arc::new(StubDomain {
                id: DomainId::Socioeconomic,
                tools: vec!["get_iucr_info"],
            }))
            .unwrap_err();
        assert!(err.to_string().contains("get_iucr_info"));
        assert!(err.to_string().contains("homicides"));
        assert_eq!(registry.domain_count(), 2);
    }

    #[test]
    fn definitions_follow_registration_order() {
        let registry = registry_with_two_domains();
        let names: Vec<String> = registry
            .all_tool_definitions()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "query_homicides_advanced",
                "get_iucr_info",
                "query_census_demographics"
            ]
        );
    }
}
