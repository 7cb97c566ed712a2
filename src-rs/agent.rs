use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::llm::{CompletionRequest, Message, ProviderAdapter, ProviderKind, Role};
use crate::tools::ToolRegistry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Capability {
    Search,
}

/// Per-request description of the agent to build.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub model_id: String,
    pub provider: ProviderKind,
    pub capabilities: BTreeSet<Capability>,
    pub system_prompt: String,
    pub max_iterations: usize,
    pub temperature: Option<f64>,
}

pub struct Agent {
    pub config: AgentConfig,
    pub adapter: Arc<dyn ProviderAdapter>,
    pub tools: ToolRegistry,
}

impl Agent {
    pub fn new(config: AgentConfig, adapter: Arc<dyn ProviderAdapter>, tools: ToolRegistry) -> Self {
        Self { config, adapter, tools }
    }

    /// Runs the reasoning loop on one user query and returns the full history.
    pub fn run(&self, query: &str) -> Result<Vec<Message>, AgentError> {
        let mut messages = vec![Message::system(self.config.system_prompt.clone()), Message::user(query)];

        let tool_schemas = if self.tools.is_empty() {
            None
        } else {
            Some(self.tools.get_schemas())
        };

        for round in 0..self.config.max_iterations {
            let request = CompletionRequest {
                messages: messages.clone(),
                tools: tool_schemas.clone(),
                temperature: self.config.temperature,
                model: Some(self.config.model_id.clone()),
            };
            let response = self.adapter.complete(request)?;
            debug!(round, tool_calls = response.tool_calls.len(), "model responded");

            let calls = response.tool_calls.clone();
            messages.push(Message::assistant(response.content, response.tool_calls));
            if calls.is_empty() {
                return Ok(messages);
            }

            for call in &calls {
                debug!(tool = %call.name, "executing tool call");
                let result = self.tools.execute(&call.name, call.args.clone());
                let content = if result.success {
                    render_value(result.output)
                } else {
                    let error = result.error.unwrap_or_else(|| "unknown error".to_string());
                    warn!(tool = %call.name, %error, "tool call failed");
                    format!("Error: {}", error)
                };
                messages.push(Message::tool(call, content));
            }
        }

        Err(AgentError::MaxIterations(self.config.max_iterations))
    }
}

/// Content of the last assistant-authored message, if any.
pub fn last_assistant_content(messages: &[Message]) -> Option<String> {
    messages
        .iter()
        .rev()
        .find(|msg| msg.role == Role::Assistant)
        .map(|msg| msg.content.clone())
}

fn render_value(value: Option<Value>) -> String {
    match value {
        Some(Value::String(text)) => text,
        Some(val) => val.to_string(),
        None => String::new(),
    }
}
