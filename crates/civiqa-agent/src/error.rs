use civiqa_tools::RegistryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Model provider error: {0}")]
    Provider(String),

    #[error("Model returned no usable text")]
    EmptyResponse,

    #[error("Model call timed out after {0} seconds")]
    Timeout(u64),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tool registry error: {0}")]
    Registry(#[from] RegistryError),
}
