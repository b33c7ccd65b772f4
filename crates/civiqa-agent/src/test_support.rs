//! Test support: a scripted stand-in for the real model plus a registry
//! over the hand-built fixture datasets.
//!
//! `ScriptedModel` returns its canned responses in order and records every
//! prompt it was given, so tests can assert on both the answers the loop
//! produces and the exact context it feeds back to the model.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use civiqa_tools::test_support::{
    census_fixture, homicide_fixture, property_fixture, socioeconomic_fixture,
};
use civiqa_tools::{
    CensusDomain, DatasetCell, HomicideDomain, PropertyDomain, RegistryError, SocioeconomicDomain,
    ToolRegistry,
};
use tokio::sync::Mutex;

use crate::error::AgentError;
use crate::llm::LanguageModel;

/// Replays a fixed sequence of responses, one per `generate` call.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    fail: bool,
}

impl ScriptedModel {
    pub fn new(responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A model whose every call fails, for exercising the fatal path.
    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Every prompt received so far, in call order.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }

    pub async fn calls(&self) -> usize {
        self.prompts.lock().await.len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String, AgentError> {
        self.prompts.lock().await.push(prompt.to_string());
        if self.fail {
            return Err(AgentError::Provider("scripted failure".to_string()));
        }
        self.responses
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| AgentError::Provider("script exhausted".to_string()))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// A registry with all four domains loaded from the fixture datasets.
pub fn fixture_registry() -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    registry.register_domain(Arc::new(HomicideDomain::new(Arc::new(DatasetCell::new(
        homicide_fixture(),
    )))))?;
    registry.register_domain(Arc::new(CensusDomain::new(Arc::new(DatasetCell::new(
        census_fixture(),
    )))))?;
    registry.register_domain(Arc::new(SocioeconomicDomain::new(Arc::new(
        DatasetCell::new(socioeconomic_fixture()),
    ))))?;
    registry.register_domain(Arc::new(PropertyDomain::new(Arc::new(DatasetCell::new(
        property_fixture(),
    )))))?;
    Ok(registry)
}

/// A well-formed marker line for scripting tool-call responses.
pub fn tool_call_line(name: &str, arguments: serde_json::Value) -> String {
    format!(
        "TOOL_CALL: {}",
        serde_json::json!({"name": name, "arguments": arguments})
    )
}
