pub mod agent;
pub mod config;
pub mod error;
pub mod invoker;

#[path = "llm/lib.rs"]
pub mod llm;
#[path = "tools/lib.rs"]
pub mod tools;
#[path = "api/lib.rs"]
pub mod api;

pub use agent::{last_assistant_content, Agent, AgentConfig, Capability};
pub use config::{ConfigError, Settings};
pub use error::{AgentError, InvokeError, ServerError};
pub use invoker::AgentInvoker;
