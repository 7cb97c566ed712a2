pub mod registry;
pub mod search;
pub mod types;

pub use registry::ToolRegistry;
pub use search::{TavilySearch, TavilySearchConfig, SEARCH_TOOL_NAME};
pub use types::{ToolEntry, ToolError, ToolHandler, ToolResult, ToolSchema};
