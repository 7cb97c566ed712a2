pub mod gemini_adapter;
pub mod http;
pub mod openai_adapter;
pub mod provider;
pub mod rotation;
pub mod types;

pub use gemini_adapter::{GeminiAdapter, GeminiConfig};
pub use openai_adapter::{OpenAiAdapter, OpenAiConfig};
pub use provider::{ClientFactory, HttpClientFactory, ProviderKind};
pub use rotation::Rotator;
pub use types::{CompletionRequest, LLMResponse, Message, ProviderAdapter, ProviderError, Role, ToolCall};
