use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{json, Value};

use super::http::{build_client, read_body};
use super::rotation::Rotator;
use super::types::{CompletionRequest, LLMResponse, Message, ProviderAdapter, ProviderError, Role, ToolCall};
use crate::tools::ToolSchema;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiConfig {
    pub api_keys: Vec<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: Option<f64>,
    pub timeout: Duration,
}

pub struct GeminiAdapter {
    cfg: GeminiConfig,
    rotator: Rotator,
    client: Client,
}

impl GeminiAdapter {
    pub fn new(mut cfg: GeminiConfig) -> Result<Self, ProviderError> {
        if cfg.base_url.is_empty() {
            cfg.base_url = GEMINI_BASE_URL.to_string();
        }
        let client = build_client(cfg.timeout)?;
        Ok(Self {
            rotator: Rotator::new(cfg.api_keys.clone()),
            cfg,
            client,
        })
    }
}

impl ProviderAdapter for GeminiAdapter {
    fn complete(&self, request: CompletionRequest) -> Result<LLMResponse, ProviderError> {
        let model = request.model.clone().unwrap_or_else(|| self.cfg.model.clone());
        let temperature = request.temperature.or(self.cfg.temperature);
        let payload = build_payload(&request.messages, request.tools.as_ref(), temperature);

        let key = self
            .rotator
            .next()
            .ok_or_else(|| ProviderError::new("auth_error", "no Gemini API keys", false))?;
        send_request(&self.client, &self.cfg.base_url, &model, key, &payload)
    }
}

fn build_payload(messages: &[Message], tools: Option<&Vec<ToolSchema>>, temperature: Option<f64>) -> Value {
    let mut contents = Vec::new();
    let mut system_instruction = None;

    for msg in messages {
        match msg.role {
            Role::System => system_instruction = Some(msg.content.clone()),
            Role::User => contents.push(json!({
                "role": "user",
                "parts": [{"text": msg.content}]
            })),
            Role::Assistant => {
                let mut parts = Vec::new();
                if !msg.content.is_empty() || msg.tool_calls.is_empty() {
                    parts.push(json!({"text": msg.content}));
                }
                for call in &msg.tool_calls {
                    parts.push(json!({
                        "functionCall": {"name": call.name, "args": call.args}
                    }));
                }
                contents.push(json!({"role": "model", "parts": parts}));
            }
            Role::Tool => {
                let output = serde_json::from_str::<Value>(&msg.content)
                    .unwrap_or_else(|_| Value::String(msg.content.clone()));
                let part = json!({
                    "functionResponse": {
                        "name": msg.name.clone().unwrap_or_default(),
                        "response": {"content": output}
                    }
                });
                // Responses to one model turn share a single user turn.
                match contents.last_mut() {
                    Some(last) if holds_function_responses(last) => {
                        if let Some(parts) = last["parts"].as_array_mut() {
                            parts.push(part);
                        }
                    }
                    _ => contents.push(json!({"role": "user", "parts": [part]})),
                }
            }
        }
    }

    let mut payload = json!({ "contents": contents });

    if let Some(temperature) = temperature {
        payload["generationConfig"] = json!({ "temperature": temperature });
    }

    if let Some(system) = system_instruction.filter(|text| !text.is_empty()) {
        payload["systemInstruction"] = json!({
            "parts": [{"text": system}]
        });
    }

    if let Some(tools) = tools {
        let declarations: Vec<Value> = tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters.clone().unwrap_or(json!({})),
                })
            })
            .collect();
        payload["tools"] = json!([
            {
                "functionDeclarations": declarations
            }
        ]);
    }

    payload
}

fn holds_function_responses(content: &Value) -> bool {
    content["role"] == "user"
        && content["parts"]
            .as_array()
            .map_or(false, |parts| parts.iter().all(|p| p.get("functionResponse").is_some()))
}

fn send_request(
    client: &Client,
    base_url: &str,
    model: &str,
    api_key: &str,
    payload: &Value,
) -> Result<LLMResponse, ProviderError> {
    let endpoint = format!(
        "{}/v1beta/models/{}:generateContent",
        base_url.trim_end_matches('/'),
        model
    );
    let resp = client
        .post(endpoint)
        .header("Content-Type", "application/json")
        .header("x-goog-api-key", api_key)
        .json(payload)
        .send()
        .map_err(|err| ProviderError::new("network_error", &err.to_string(), true))?;

    let body = read_body(resp)?;
    let raw: Value = serde_json::from_str(&body)
        .map_err(|_| ProviderError::new("parse_error", "invalid json", false))?;
    let (content, tool_calls) = parse_response(&raw)?;
    Ok(LLMResponse {
        content,
        tool_calls,
        raw: Some(raw),
    })
}

fn parse_response(raw: &Value) -> Result<(String, Vec<ToolCall>), ProviderError> {
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    let parts = match raw.pointer("/candidates/0/content/parts").and_then(|v| v.as_array()) {
        Some(parts) => parts,
        None => {
            if let Some(reason) = raw.pointer("/promptFeedback/blockReason").and_then(|v| v.as_str()) {
                return Err(ProviderError::new(
                    "api_error",
                    &format!("prompt blocked by Gemini: {}", reason),
                    false,
                ));
            }
            let finish = raw
                .pointer("/candidates/0/finishReason")
                .and_then(|v| v.as_str())
                .unwrap_or("none");
            return Err(ProviderError::new(
                "parse_error",
                &format!("response has no content parts (finish reason: {})", finish),
                false,
            ));
        }
    };

    for part in parts {
        if let Some(chunk) = part.get("text").and_then(|v| v.as_str()) {
            text.push_str(chunk);
        }
        if let Some(fc) = part.get("functionCall") {
            let name = fc.get("name").and_then(|v| v.as_str()).unwrap_or("");
            let args = fc.get("args").cloned().unwrap_or(json!({}));
            tool_calls.push(ToolCall {
                id: None,
                name: name.to_string(),
                args,
            });
        }
    }

    Ok((text, tool_calls))
}
