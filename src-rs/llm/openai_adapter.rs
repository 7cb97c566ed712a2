use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{json, Value};

use super::http::{build_client, read_body};
use super::rotation::Rotator;
use super::types::{CompletionRequest, LLMResponse, Message, ProviderAdapter, ProviderError, Role, ToolCall};
use crate::tools::ToolSchema;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAiConfig {
    pub api_keys: Vec<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: Option<f64>,
    pub timeout: Duration,
}

pub struct OpenAiAdapter {
    cfg: OpenAiConfig,
    rotator: Rotator,
    client: Client,
}

impl OpenAiAdapter {
    pub fn new(mut cfg: OpenAiConfig) -> Result<Self, ProviderError> {
        if cfg.base_url.is_empty() {
            cfg.base_url = OPENAI_BASE_URL.to_string();
        }
        let client = build_client(cfg.timeout)?;
        Ok(Self {
            rotator: Rotator::new(cfg.api_keys.clone()),
            cfg,
            client,
        })
    }
}

impl ProviderAdapter for OpenAiAdapter {
    fn complete(&self, request: CompletionRequest) -> Result<LLMResponse, ProviderError> {
        let model = request.model.clone().unwrap_or_else(|| self.cfg.model.clone());
        let temperature = request.temperature.or(self.cfg.temperature);
        let payload = build_payload(&model, &request.messages, request.tools.as_ref(), temperature);

        let key = self
            .rotator
            .next()
            .ok_or_else(|| ProviderError::new("auth_error", "no OpenAI API keys", false))?;

        let endpoint = format!("{}/v1/chat/completions", self.cfg.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(endpoint)
            .bearer_auth(key)
            .json(&payload)
            .send()
            .map_err(|err| ProviderError::new("network_error", &err.to_string(), true))?;

        let body = read_body(resp)?;
        let raw: Value = serde_json::from_str(&body)
            .map_err(|_| ProviderError::new("parse_error", "invalid json", false))?;
        if let Some(error) = raw.get("error") {
            return Err(ProviderError::new("api_error", &error.to_string(), false));
        }
        let (content, tool_calls) = parse_response(&raw)?;
        Ok(LLMResponse {
            content,
            tool_calls,
            raw: Some(raw),
        })
    }
}

fn build_payload(
    model: &str,
    messages: &[Message],
    tools: Option<&Vec<ToolSchema>>,
    temperature: Option<f64>,
) -> Value {
    let messages: Vec<Value> = messages.iter().map(message_to_openai).collect();
    let mut payload = json!({
        "model": model,
        "messages": messages,
    });

    if let Some(tools) = tools {
        let specs: Vec<Value> = tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters.clone().unwrap_or(json!({"type": "object", "properties": {}})),
                    }
                })
            })
            .collect();
        payload["tools"] = json!(specs);
    }
    if let Some(temperature) = temperature {
        payload["temperature"] = json!(temperature);
    }

    payload
}

fn message_to_openai(msg: &Message) -> Value {
    match msg.role {
        Role::System => json!({"role": "system", "content": msg.content}),
        Role::User => json!({"role": "user", "content": msg.content}),
        Role::Assistant if msg.tool_calls.is_empty() => {
            json!({"role": "assistant", "content": msg.content})
        }
        Role::Assistant => {
            let calls: Vec<Value> = msg
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.args.to_string(),
                        }
                    })
                })
                .collect();
            let content = if msg.content.is_empty() {
                Value::Null
            } else {
                Value::String(msg.content.clone())
            };
            json!({"role": "assistant", "content": content, "tool_calls": calls})
        }
        Role::Tool => json!({
            "role": "tool",
            "tool_call_id": msg.tool_call_id,
            "content": msg.content,
        }),
    }
}

fn parse_response(raw: &Value) -> Result<(String, Vec<ToolCall>), ProviderError> {
    let message = raw
        .pointer("/choices/0/message")
        .ok_or_else(|| ProviderError::new("parse_error", "response has no choices", false))?;

    let content = message
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let mut tool_calls = Vec::new();
    if let Some(calls) = message.get("tool_calls").and_then(|v| v.as_array()) {
        for call in calls {
            let function = match call.get("function") {
                Some(function) => function,
                None => continue,
            };
            let name = function.get("name").and_then(|v| v.as_str()).unwrap_or("");
            let arguments = function.get("arguments").and_then(|v| v.as_str()).unwrap_or("{}");
            let args = serde_json::from_str(arguments).map_err(|err| {
                ProviderError::new(
                    "parse_error",
                    &format!("invalid arguments for tool {}: {}", name, err),
                    false,
                )
            })?;
            tool_calls.push(ToolCall {
                id: call.get("id").and_then(|v| v.as_str()).map(str::to_string),
                name: name.to_string(),
                args,
            });
        }
    }

    Ok((content, tool_calls))
}
