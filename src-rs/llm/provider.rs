use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::gemini_adapter::{GeminiAdapter, GeminiConfig};
use super::openai_adapter::{OpenAiAdapter, OpenAiConfig};
use super::types::ProviderAdapter;
use crate::config::Settings;
use crate::error::InvokeError;

/// Model backends a chat request may select.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAI,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "Gemini",
            ProviderKind::OpenAI => "OpenAI",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = InvokeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "Gemini" => Ok(ProviderKind::Gemini),
            "OpenAI" => Ok(ProviderKind::OpenAI),
            other => Err(InvokeError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Produces a chat completion client for a provider and model id.
pub trait ClientFactory: Send + Sync {
    fn build(&self, kind: ProviderKind, model_id: &str) -> Result<Arc<dyn ProviderAdapter>, InvokeError>;
}

/// Builds the HTTP adapters from the process settings.
pub struct HttpClientFactory {
    settings: Arc<Settings>,
}

impl HttpClientFactory {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }
}

impl ClientFactory for HttpClientFactory {
    fn build(&self, kind: ProviderKind, model_id: &str) -> Result<Arc<dyn ProviderAdapter>, InvokeError> {
        let cfg = &self.settings;
        match kind {
            ProviderKind::Gemini => {
                let adapter = GeminiAdapter::new(GeminiConfig {
                    api_keys: cfg.gemini_api_keys.clone(),
                    base_url: cfg.gemini_base_url.clone(),
                    model: model_id.to_string(),
                    temperature: cfg.temperature,
                    timeout: cfg.request_timeout,
                })?;
                Ok(Arc::new(adapter))
            }
            ProviderKind::OpenAI => {
                if cfg.openai_api_keys.is_empty() {
                    return Err(InvokeError::MissingCredential("OPENAI_API_KEY".to_string()));
                }
                let adapter = OpenAiAdapter::new(OpenAiConfig {
                    api_keys: cfg.openai_api_keys.clone(),
                    base_url: cfg.openai_base_url.clone(),
                    model: model_id.to_string(),
                    temperature: cfg.temperature,
                    timeout: cfg.request_timeout,
                })?;
                Ok(Arc::new(adapter))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::settings_from;

    #[test]
    fn parses_exact_provider_tags() {
        assert_eq!("Gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAI);
        assert_eq!(ProviderKind::OpenAI.to_string(), "OpenAI");
    }

    #[test]
    fn rejects_unknown_provider_tags() {
        for raw in ["gemini", "Anthropic", ""] {
            let err = raw.parse::<ProviderKind>().unwrap_err();
            assert!(matches!(err, InvokeError::UnsupportedProvider(ref p) if p == raw));
            assert_eq!(err.to_string(), format!("Unsupported provider: {}", raw));
        }
    }

    #[test]
    fn openai_without_key_is_a_missing_credential() {
        let settings = settings_from(&[("GEMINI_API_KEY", "g"), ("TAVILY_API_KEY", "t")]);
        let factory = HttpClientFactory::new(Arc::new(settings));

        assert!(factory.build(ProviderKind::Gemini, "gemini-1.5-pro").is_ok());
        let err = factory.build(ProviderKind::OpenAI, "gpt-4o-mini").err().unwrap();
        assert!(matches!(err, InvokeError::MissingCredential(ref key) if key == "OPENAI_API_KEY"));
    }
}
