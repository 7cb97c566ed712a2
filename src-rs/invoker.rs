use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::agent::{last_assistant_content, Agent, AgentConfig, Capability};
use crate::config::Settings;
use crate::error::InvokeError;
use crate::llm::{ClientFactory, HttpClientFactory, ProviderKind};
use crate::tools::{search::DEFAULT_MAX_RESULTS, TavilySearch, TavilySearchConfig, ToolRegistry};

/// Builds a fresh agent per request and returns its final answer.
pub struct AgentInvoker {
    factory: Arc<dyn ClientFactory>,
    search: TavilySearchConfig,
    max_iterations: usize,
    temperature: Option<f64>,
}

impl AgentInvoker {
    pub fn new(settings: &Settings, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            factory,
            search: TavilySearchConfig {
                api_key: settings.tavily_api_key.clone(),
                base_url: settings.tavily_base_url.clone(),
                max_results: DEFAULT_MAX_RESULTS,
                timeout: settings.request_timeout,
            },
            max_iterations: settings.max_iterations,
            temperature: settings.temperature,
        }
    }

    pub fn from_settings(settings: Arc<Settings>) -> Self {
        let factory = Arc::new(HttpClientFactory::new(settings.clone()));
        Self::new(&settings, factory)
    }

    pub fn invoke(
        &self,
        model_id: &str,
        query: &str,
        allow_search: bool,
        system_prompt: &str,
        provider: &str,
    ) -> Result<Option<String>, InvokeError> {
        let agent = self.build_agent(model_id, allow_search, system_prompt, provider)?;
        info!(
            model = model_id,
            provider = %agent.config.provider,
            tools = agent.tools.count(),
            "invoking agent"
        );

        let history = agent.run(query)?;
        debug!(messages = history.len(), "agent finished");
        Ok(last_assistant_content(&history))
    }

    /// Resolves the provider before anything else, so an unknown tag never reaches a client.
    pub fn build_agent(
        &self,
        model_id: &str,
        allow_search: bool,
        system_prompt: &str,
        provider: &str,
    ) -> Result<Agent, InvokeError> {
        let provider: ProviderKind = provider.parse()?;

        let mut capabilities = BTreeSet::new();
        if allow_search {
            capabilities.insert(Capability::Search);
        }
        let config = AgentConfig {
            model_id: model_id.to_string(),
            provider,
            capabilities,
            system_prompt: system_prompt.to_string(),
            max_iterations: self.max_iterations,
            temperature: self.temperature,
        };

        let adapter = self.factory.build(provider, model_id)?;
        let tools = self.build_tools(&config.capabilities)?;
        Ok(Agent::new(config, adapter, tools))
    }

    fn build_tools(&self, capabilities: &BTreeSet<Capability>) -> Result<ToolRegistry, InvokeError> {
        let mut tools = ToolRegistry::new();
        for capability in capabilities {
            match capability {
                Capability::Search => {
                    TavilySearch::new(self.search.clone())?.register(&mut tools)?;
                }
            }
        }
        Ok(tools)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::agent::tests::{text, ScriptedAdapter};
    use crate::config::tests::settings_from;
    use crate::llm::{LLMResponse, ProviderAdapter};
    use crate::tools::SEARCH_TOOL_NAME;
    use std::sync::Mutex;

    /// Hands out scripted adapters and records which providers were requested.
    pub(crate) struct StubFactory {
        responses: Vec<LLMResponse>,
        pub(crate) builds: Mutex<Vec<(ProviderKind, String)>>,
        pub(crate) adapters: Mutex<Vec<Arc<ScriptedAdapter>>>,
    }

    impl StubFactory {
        pub(crate) fn answering(responses: Vec<LLMResponse>) -> Self {
            Self {
                responses,
                builds: Mutex::new(Vec::new()),
                adapters: Mutex::new(Vec::new()),
            }
        }
    }

    impl ClientFactory for StubFactory {
        fn build(&self, kind: ProviderKind, model_id: &str) -> Result<Arc<dyn ProviderAdapter>, InvokeError> {
            self.builds.lock().unwrap().push((kind, model_id.to_string()));
            let adapter = Arc::new(ScriptedAdapter::new(self.responses.clone()));
            self.adapters.lock().unwrap().push(adapter.clone());
            Ok(adapter)
        }
    }

    pub(crate) fn stub_invoker(factory: Arc<StubFactory>) -> AgentInvoker {
        let settings = settings_from(&[("GEMINI_API_KEY", "g"), ("TAVILY_API_KEY", "t")]);
        AgentInvoker::new(&settings, factory)
    }

    #[test]
    fn test_unsupported_provider_never_builds_a_client() {
        let factory = Arc::new(StubFactory::answering(vec![text("unused")]));
        let invoker = stub_invoker(factory.clone());

        for provider in ["Anthropic", "gemini", "openai", ""] {
            let err = invoker
                .invoke("gemini-1.5-flash", "hi", true, "sys", provider)
                .unwrap_err();
            assert!(matches!(err, InvokeError::UnsupportedProvider(ref p) if p == provider));
        }
        assert!(factory.builds.lock().unwrap().is_empty());
    }

    #[test]
    fn test_search_flag_controls_tool_set() {
        let factory = Arc::new(StubFactory::answering(Vec::new()));
        let invoker = stub_invoker(factory);

        let without = invoker.build_agent("gemini-1.5-pro", false, "sys", "Gemini").unwrap();
        assert_eq!(without.tools.count(), 0);
        assert!(without.config.capabilities.is_empty());

        let with = invoker.build_agent("gemini-1.5-pro", true, "sys", "Gemini").unwrap();
        assert_eq!(with.tools.count(), 1);
        assert!(with.tools.has(SEARCH_TOOL_NAME));
        assert!(with.config.capabilities.contains(&Capability::Search));
    }

    #[test]
    fn test_invoke_passes_model_and_prompt_through() {
        let factory = Arc::new(StubFactory::answering(vec![text("4")]));
        let invoker = stub_invoker(factory.clone());

        let answer = invoker
            .invoke("gpt-4o-mini", "What is 2+2?", false, "Be concise.", "OpenAI")
            .unwrap();

        assert_eq!(answer.as_deref(), Some("4"));
        let builds = factory.builds.lock().unwrap();
        assert_eq!(builds.as_slice(), &[(ProviderKind::OpenAI, "gpt-4o-mini".to_string())]);
    }

    #[test]
    fn test_invoke_surfaces_agent_failures() {
        let factory = Arc::new(StubFactory::answering(Vec::new()));
        let invoker = stub_invoker(factory);

        let err = invoker
            .invoke("gemini-1.5-flash", "hi", false, "sys", "Gemini")
            .unwrap_err();
        assert!(matches!(err, InvokeError::Agent(_)));
    }
}
