// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TIPOS DA API HTTP
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use serde::{Deserialize, Serialize};

use crate::types::{Clarification, ResearchQuery, TokenUsage};

/// Corpo de `POST /api/research`
#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    pub query: String,
    #[serde(default)]
    pub clarifications: Vec<Clarification>,
    #[serde(default = "default_stream")]
    pub stream: bool,
}

fn default_stream() -> bool {
    true
}

impl ResearchRequest {
    /// Converte para `ResearchQuery`, descartando perguntas sem resposta
    pub fn into_query(self) -> ResearchQuery {
        let clarifications = self
            .clarifications
            .into_iter()
            .filter(|c| !c.question.trim().is_empty() && !c.answer.trim().is_empty())
            .collect();
        ResearchQuery::new(self.query).with_clarifications(clarifications)
    }
}

/// Corpo de `POST /api/clarify`
#[derive(Debug, Deserialize)]
pub struct ClarifyRequest {
    pub query: String,
}

/// Resposta de `POST /api/clarify`
#[derive(Debug, Serialize)]
pub struct ClarifyResponse {
    pub questions: Vec<String>,
    pub usage: TokenUsage,
}

// ─────────────────────────────────────────────────
// Erros (formato OpenAI)
// ─────────────────────────────────────────────────

/// Resposta de erro
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

/// Detalhes do erro
#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub param: Option<String>,
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request: ResearchRequest = serde_json::from_str(r#"{"query": "topic"}"#).unwrap();
        assert!(request.stream);
        assert!(request.clarifications.is_empty());
    }

    #[test]
    fn test_into_query_drops_unanswered() {
        let request: ResearchRequest = serde_json::from_str(
            r#"{"query": " topic ", "stream": false, "clarifications": [
                {"question": "Region?", "answer": "EU"},
                {"question": "Depth?", "answer": "  "}
            ]}"#,
        )
        .unwrap();
        assert!(!request.stream);

        let query = request.into_query();
        assert_eq!(query.text(), "topic");
        assert_eq!(query.clarifications().len(), 1);
        assert_eq!(query.clarifications()[0].answer, "EU");
    }

    #[test]
    fn test_error_body_shape() {
        let body = ApiError {
            error: ApiErrorDetail {
                message: "bad".into(),
                error_type: "invalid_request_error".into(),
                param: Some("query".into()),
                code: None,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["type"], "invalid_request_error");
        assert_eq!(json["error"]["param"], "query");
    }
}
