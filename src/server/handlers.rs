// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ENDPOINT HANDLERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
};
use std::sync::Arc;

use super::page::INDEX_HTML;
use super::sse;
use super::types::*;
use super::AppState;
use crate::types::ResearchQuery;

// ── GET / ───────────────────────────────────────

/// Página do formulário
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

// ── GET /health ─────────────────────────────────

/// Health check endpoint
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ── POST /api/research ──────────────────────────

/// Executa uma pesquisa com streaming (SSE) ou resposta JSON
pub async fn research(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResearchRequest>,
) -> Response {
    let stream = body.stream;
    let query = body.into_query();
    if query.is_blank() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "The \"query\" parameter is required and must not be empty.",
        );
    }

    if stream {
        log::info!("[SSE] Starting streaming research: {}", query.text());
        sse::stream_run(state, query)
    } else {
        log::info!("[JSON] Starting research: {}", query.text());
        run_to_completion(state, query).await
    }
}

async fn run_to_completion(state: Arc<AppState>, query: ResearchQuery) -> Response {
    match tokio::spawn(async move { state.manager.run(query).await }).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => {
            log::error!("[research] Run task panicked: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Internal error: {}", e),
            )
        }
    }
}

// ── POST /api/clarify ───────────────────────────

/// Gera perguntas de esclarecimento para a query
pub async fn clarify(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ClarifyRequest>,
) -> Response {
    let query = ResearchQuery::new(body.query);
    if query.is_blank() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "The \"query\" parameter is required and must not be empty.",
        );
    }

    match state.manager.clarify(&query).await {
        Ok(outcome) => Json(ClarifyResponse {
            questions: outcome.questions,
            usage: outcome.usage,
        })
        .into_response(),
        Err(e) => {
            log::warn!("[clarify] {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(ApiError {
                    error: ApiErrorDetail {
                        message: e.to_string(),
                        error_type: "upstream_error".into(),
                        param: None,
                        code: None,
                    },
                }),
            )
                .into_response()
        }
    }
}

// ── Helpers ─────────────────────────────────────

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ApiError {
            error: ApiErrorDetail {
                message: message.into(),
                error_type: "invalid_request_error".into(),
                param: Some("query".into()),
                code: None,
            },
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResearchConfig;
    use crate::llm::{LlmError, MockLlmClient};
    use crate::notifier::{DeliveryError, MockEmailTransport, Notifier};
    use crate::orchestrator::ResearchManager;
    use crate::config::EmailConfig;
    use serde_json::{json, Value};

    fn state_with(llm: MockLlmClient) -> Arc<AppState> {
        let mut transport = MockEmailTransport::new();
        transport
            .expect_send()
            .returning(|_| Err(DeliveryError::AuthFailed));
        let notifier = Notifier::with_transport(EmailConfig::default(), Arc::new(transport));
        Arc::new(AppState {
            manager: ResearchManager::new(Arc::new(llm), &ResearchConfig::default(), notifier),
        })
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_blank_query_rejected() {
        let llm = MockLlmClient::new(|_| Err(LlmError::EmptyResponse));
        let state = state_with(llm);
        let request = ResearchRequest {
            query: "   ".into(),
            clarifications: vec![],
            stream: true,
        };

        let response = research(State(state), Json(request)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["type"], "invalid_request_error");
    }

    #[tokio::test]
    async fn test_json_mode_returns_outcome() {
        let llm = MockLlmClient::new(|_| Err(LlmError::RateLimitError));
        let state = state_with(llm);
        let request = ResearchRequest {
            query: "topic".into(),
            clarifications: vec![],
            stream: false,
        };

        let response = research(State(state), Json(request)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["state"]["state"], "failed");
        assert_eq!(body["state"]["stage"], "planning");
        assert_eq!(body["query"], "topic");
    }

    #[tokio::test]
    async fn test_clarify_endpoint() {
        let llm = MockLlmClient::new(|_| Ok(json!({"questions": ["Region?", "Years?"]}).to_string()));
        let state = state_with(llm);

        let response = clarify(State(state), Json(ClarifyRequest { query: "EVs".into() })).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["questions"], json!(["Region?", "Years?"]));
        assert!(body["usage"]["total_tokens"].as_u64().unwrap_or(0) > 0);
    }

    #[tokio::test]
    async fn test_clarify_upstream_failure() {
        let llm = MockLlmClient::new(|_| Err(LlmError::Timeout));
        let state = state_with(llm);

        let response = clarify(State(state), Json(ClarifyRequest { query: "EVs".into() })).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
