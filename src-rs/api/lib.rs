pub mod handlers;
pub mod server;

pub use handlers::{ChatRequest, ALLOWED_MODEL_NAMES, INVALID_MODEL_MESSAGE};
pub use server::{router, AgentServer, AppState};
