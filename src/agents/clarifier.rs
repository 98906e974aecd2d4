// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CLARIFIER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Etapa opcional antes do planejamento: gera 2-3 perguntas curtas para
// entender melhor o que o usuário quer pesquisar. As respostas voltam como
// `Clarification` na `ResearchQuery`.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::llm::{complete_json, CompletionRequest, LlmClient, LlmError};
use crate::types::ResearchQuery;
use crate::utils::UsageTracker;

/// Rótulo das chamadas do clarifier
pub const CLARIFIER_LABEL: &str = "clarifier";

/// Máximo de perguntas devolvidas
pub const MAX_QUESTIONS: usize = 3;

const CLARIFIER_INSTRUCTIONS: &str = "You help scope a research request before any searching \
happens. Given the user's query, ask 2 or 3 short clarifying questions that would most change \
how the research is done: scope, audience, region, time frame or depth. Ask only what the query \
leaves open. Each question must be a single sentence.";

/// Erros do clarifier
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClarifyError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("No clarifying questions returned")]
    NoQuestions,
}

#[derive(Debug, Deserialize)]
struct ClarifyingQuestions {
    #[serde(default)]
    questions: Vec<String>,
}

/// Agente de esclarecimento
pub struct Clarifier {
    llm: Arc<dyn LlmClient>,
}

impl Clarifier {
    /// Cria um clarifier
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Gera até [`MAX_QUESTIONS`] perguntas para a query.
    pub async fn clarify(
        &self,
        query: &ResearchQuery,
        tracker: &UsageTracker,
    ) -> Result<Vec<String>, ClarifyError> {
        log::info!("❓ Clarifier: gerando perguntas para '{}'", query.text());

        let request = CompletionRequest::text(
            CLARIFIER_LABEL,
            CLARIFIER_INSTRUCTIONS,
            format!("Query: {}", query.text()),
        )
        .json_schema("clarifying_questions", questions_schema());

        let (raw, usage): (ClarifyingQuestions, _) =
            complete_json(self.llm.as_ref(), &request).await?;
        tracker.track(CLARIFIER_LABEL, usage);

        let questions: Vec<String> = raw
            .questions
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .take(MAX_QUESTIONS)
            .collect();

        if questions.is_empty() {
            return Err(ClarifyError::NoQuestions);
        }

        log::info!("❓ Clarifier: {} perguntas", questions.len());
        Ok(questions)
    }
}

fn questions_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "questions": {
                "type": "array",
                "description": "Two or three short clarifying questions.",
                "items": { "type": "string" }
            }
        },
        "required": ["questions"],
        "additionalProperties": false
    })
}
