use thiserror::Error;

use crate::config::ConfigError;
use crate::llm::ProviderError;
use crate::tools::ToolError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("agent stopped after {0} iterations without a final answer")]
    MaxIterations(usize),
}

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("{0} is not configured")]
    MissingCredential(String),

    #[error("failed to build client: {0}")]
    Client(#[from] ProviderError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind listener: {0}")]
    Bind(#[source] hyper::Error),

    #[error("server stopped: {0}")]
    Serve(#[source] hyper::Error),
}
