use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::handlers::{handle_chat, handle_health};
use crate::config::Settings;
use crate::error::ServerError;
use crate::invoker::AgentInvoker;

#[derive(Clone)]
pub struct AppState {
    pub invoker: Arc<AgentInvoker>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/chat", post(handle_chat))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct AgentServer {
    pub addr: SocketAddr,
    pub state: AppState,
}

impl AgentServer {
    pub fn new(addr: SocketAddr, invoker: Arc<AgentInvoker>) -> Self {
        Self {
            addr,
            state: AppState { invoker },
        }
    }

    pub fn from_settings(settings: Arc<Settings>) -> Result<Self, ServerError> {
        let addr = settings.socket_addr()?;
        let invoker = Arc::new(AgentInvoker::from_settings(settings));
        Ok(Self::new(addr, invoker))
    }

    pub async fn start(self) -> Result<(), ServerError> {
        let app = router(self.state);
        let server = axum::Server::try_bind(&self.addr).map_err(ServerError::Bind)?;
        info!("listening on {}", self.addr);
        server
            .serve(app.into_make_service())
            .await
            .map_err(ServerError::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tests::text;
    use crate::api::handlers::INVALID_MODEL_MESSAGE;
    use crate::config::tests::settings_from;
    use crate::config::ConfigError;
    use crate::invoker::tests::{stub_invoker, StubFactory};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(factory: Arc<StubFactory>) -> Router {
        router(AppState {
            invoker: Arc::new(stub_invoker(factory)),
        })
    }

    fn chat_request(body: &Value) -> Request<Body> {
        Request::builder()
            .uri("/chat")
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_chat_end_to_end_with_stub_model() {
        let factory = Arc::new(StubFactory::answering(vec![text("4")]));
        let body = json!({
            "model_name": "gemini-1.5-flash",
            "model_provider": "Gemini",
            "system_prompt": "Be concise.",
            "messages": ["What is 2+2?"],
            "allow_search": false
        });

        let response = app(factory.clone()).oneshot(chat_request(&body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await, json!("4"));
        assert_eq!(factory.builds.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_model_returns_error_payload() {
        let factory = Arc::new(StubFactory::answering(vec![text("unused")]));
        let body = json!({
            "model_name": "gpt-5",
            "model_provider": "OpenAI",
            "system_prompt": "",
            "messages": ["hi"],
            "allow_search": true
        });

        let response = app(factory.clone()).oneshot(chat_request(&body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await, json!({"error": INVALID_MODEL_MESSAGE}));
        assert!(factory.builds.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_messages_reach_the_model_as_one_query() {
        let factory = Arc::new(StubFactory::answering(vec![text("ok")]));
        let body = json!({
            "model_name": "gpt-4o-mini",
            "model_provider": "OpenAI",
            "system_prompt": "sys",
            "messages": ["a", "b", "c"],
            "allow_search": false
        });

        let response = app(factory.clone()).oneshot(chat_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await, json!("ok"));

        let adapters = factory.adapters.lock().unwrap();
        let requests = adapters[0].requests.lock().unwrap();
        assert_eq!(requests[0].messages.len(), 2);
        assert_eq!(requests[0].messages[0].content, "sys");
        assert_eq!(requests[0].messages[1].content, "a b c");
    }

    #[tokio::test]
    async fn test_unsupported_provider_is_a_server_error() {
        let factory = Arc::new(StubFactory::answering(vec![text("unused")]));
        let body = json!({
            "model_name": "gemini-1.5-pro",
            "model_provider": "Anthropic",
            "system_prompt": "sys",
            "messages": ["hi"],
            "allow_search": false
        });

        let response = app(factory.clone()).oneshot(chat_request(&body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(read_json(response).await, json!({"error": "Unsupported provider: Anthropic"}));
        assert!(factory.builds.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_client_error() {
        let factory = Arc::new(StubFactory::answering(vec![text("unused")]));
        let missing_field = json!({
            "model_name": "gemini-1.5-pro",
            "model_provider": "Gemini",
            "messages": ["hi"],
            "allow_search": false
        });
        let wrong_type = json!({
            "model_name": "gemini-1.5-pro",
            "model_provider": "Gemini",
            "system_prompt": "sys",
            "messages": "hi",
            "allow_search": "yes"
        });

        for body in [missing_field, wrong_type] {
            let response = app(factory.clone()).oneshot(chat_request(&body)).await.unwrap();
            assert!(response.status().is_client_error());
        }
        assert!(factory.builds.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_health() {
        let factory = Arc::new(StubFactory::answering(Vec::new()));
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let response = app(factory).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["status"], "ok");
    }

    #[test]
    fn test_from_settings_rejects_bad_host() {
        let settings = settings_from(&[
            ("GEMINI_API_KEY", "g"),
            ("TAVILY_API_KEY", "t"),
            ("HOST", "not a host"),
        ]);

        let err = AgentServer::from_settings(Arc::new(settings)).err().unwrap();
        assert!(matches!(err, ServerError::Config(ConfigError::InvalidValue(ref key, _)) if key == "HOST"));
    }

    #[tokio::test]
    async fn test_start_reports_address_in_use() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap();
        let factory = Arc::new(StubFactory::answering(Vec::new()));
        let server = AgentServer::new(addr, Arc::new(stub_invoker(factory)));

        let err = server.start().await.unwrap_err();
        assert!(matches!(err, ServerError::Bind(_)));
    }
}
