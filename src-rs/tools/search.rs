use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{json, Value};

use super::registry::ToolRegistry;
use super::types::{ToolError, ToolHandler, ToolSchema};
use crate::llm::http::{build_client, read_body};
use crate::llm::ProviderError;

pub const TAVILY_BASE_URL: &str = "https://api.tavily.com";
pub const SEARCH_TOOL_NAME: &str = "tavily_search_results_json";
pub const DEFAULT_MAX_RESULTS: usize = 2;

#[derive(Clone)]
pub struct TavilySearchConfig {
    pub api_key: String,
    pub base_url: String,
    pub max_results: usize,
    pub timeout: Duration,
}

/// Web search through the Tavily API, exposed to the agent as a tool.
pub struct TavilySearch {
    cfg: TavilySearchConfig,
    client: Client,
}

impl TavilySearch {
    pub fn new(mut cfg: TavilySearchConfig) -> Result<Self, ProviderError> {
        if cfg.base_url.is_empty() {
            cfg.base_url = TAVILY_BASE_URL.to_string();
        }
        if cfg.max_results == 0 {
            cfg.max_results = DEFAULT_MAX_RESULTS;
        }
        let client = build_client(cfg.timeout)?;
        Ok(Self { cfg, client })
    }

    pub fn schema() -> ToolSchema {
        ToolSchema {
            name: SEARCH_TOOL_NAME.to_string(),
            description: "A search engine optimized for comprehensive, accurate, and trusted results. \
                Useful for when you need to answer questions about current events. \
                Input should be a search query."
                .to_string(),
            parameters: Some(json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "search query to look up"
                    }
                },
                "required": ["query"]
            })),
        }
    }

    /// Returns up to `max_results` hits as `[{url, content}]`.
    pub fn search(&self, query: &str) -> Result<Value, ProviderError> {
        let endpoint = format!("{}/search", self.cfg.base_url.trim_end_matches('/'));
        let payload = json!({
            "api_key": self.cfg.api_key,
            "query": query,
            "max_results": self.cfg.max_results,
            "search_depth": "advanced",
        });
        let resp = self
            .client
            .post(endpoint)
            .json(&payload)
            .send()
            .map_err(|err| ProviderError::new("network_error", &err.to_string(), true))?;

        let body = read_body(resp)?;
        let raw: Value = serde_json::from_str(&body)
            .map_err(|_| ProviderError::new("parse_error", "invalid json", false))?;
        let hits: Vec<Value> = raw
            .get("results")
            .and_then(|v| v.as_array())
            .map(|results| {
                results
                    .iter()
                    .take(self.cfg.max_results)
                    .map(|item| {
                        json!({
                            "url": item.get("url").cloned().unwrap_or(Value::Null),
                            "content": item.get("content").cloned().unwrap_or(Value::Null),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Value::Array(hits))
    }

    pub fn into_handler(self) -> ToolHandler {
        let search = Arc::new(self);
        Arc::new(move |args: Value| -> Result<Value, String> {
            let query = args
                .get("query")
                .and_then(|v| v.as_str())
                .filter(|q| !q.trim().is_empty())
                .ok_or_else(|| "missing required argument: query".to_string())?;
            search.search(query).map_err(|err| err.to_string())
        })
    }

    pub fn register(self, registry: &mut ToolRegistry) -> Result<(), ToolError> {
        registry.register(SEARCH_TOOL_NAME, self.into_handler(), Self::schema())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn search(base_url: String) -> TavilySearch {
        TavilySearch::new(TavilySearchConfig {
            api_key: "tvly-test".to_string(),
            base_url,
            max_results: 2,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_search_caps_results_and_keeps_url_and_content() {
        let mut server = mockito::Server::new();
        let body = json!({
            "query": "rust",
            "results": [
                {"title": "a", "url": "https://a.example", "content": "A", "score": 0.9},
                {"title": "b", "url": "https://b.example", "content": "B", "score": 0.8},
                {"title": "c", "url": "https://c.example", "content": "C", "score": 0.7}
            ]
        });
        let mock = server
            .mock("POST", "/search")
            .match_body(Matcher::PartialJson(json!({
                "api_key": "tvly-test",
                "query": "rust",
                "max_results": 2
            })))
            .with_status(200)
            .with_body(body.to_string())
            .create();

        let hits = search(server.url()).search("rust").unwrap();

        mock.assert();
        assert_eq!(
            hits,
            json!([
                {"url": "https://a.example", "content": "A"},
                {"url": "https://b.example", "content": "B"}
            ])
        );
    }

    #[test]
    fn test_handler_requires_query() {
        let handler = search("http://127.0.0.1:9".to_string()).into_handler();
        let err = handler(json!({})).unwrap_err();
        assert_eq!(err, "missing required argument: query");
    }

    #[test]
    fn test_handler_surfaces_upstream_errors() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("POST", "/search").with_status(500).with_body("oops").create();

        let handler = search(server.url()).into_handler();
        let err = handler(json!({"query": "rust"})).unwrap_err();
        assert_eq!(err, "server_error: oops");
    }

    #[test]
    fn test_register_adds_single_tool() {
        let mut registry = ToolRegistry::new();
        search(TAVILY_BASE_URL.to_string()).register(&mut registry).unwrap();

        assert_eq!(registry.count(), 1);
        assert!(registry.has(SEARCH_TOOL_NAME));
    }
}
