// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PLANNER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Decompõe a query do usuário em um número limitado de buscas distintas,
// cada uma com uma justificativa de uma linha.
//
// Validação após a resposta do LLM:
// 1. Todo item precisa de termo e justificativa
// 2. Termos repetidos (ignorando caixa) são descartados
// 3. Acima do máximo: trunca com warning
// 4. Abaixo do mínimo: erro
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use super::render_clarifications;
use crate::config::{ResearchConfig, MAX_SEARCHES_CAP};
use crate::llm::{complete_json, CompletionRequest, LlmClient, LlmError};
use crate::types::{ResearchQuery, SearchPlan, SearchPlanItem};
use crate::utils::UsageTracker;

/// Rótulo das chamadas do planner
pub const PLANNER_LABEL: &str = "planner";

/// Erros do planejamento
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanningError {
    #[error("Query is empty")]
    EmptyQuery,

    #[error("LLM error: {0}")]
    Llm(LlmError),

    #[error("Malformed plan: {0}")]
    Malformed(String),

    #[error("Search {index} is missing a term or reason")]
    IncompleteItem { index: usize },

    #[error("Plan has {got} searches, at least {min} required")]
    TooFewSearches { got: usize, min: usize },
}

impl From<LlmError> for PlanningError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::ParseError(msg) => PlanningError::Malformed(msg),
            LlmError::EmptyResponse => PlanningError::Malformed("empty response".into()),
            other => PlanningError::Llm(other),
        }
    }
}

/// Limites do plano
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerConfig {
    pub min_searches: usize,
    pub max_searches: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            min_searches: 3,
            max_searches: 5,
        }
    }
}

impl From<&ResearchConfig> for PlannerConfig {
    fn from(config: &ResearchConfig) -> Self {
        Self {
            min_searches: config.min_searches,
            max_searches: config.max_searches,
        }
    }
}

/// Formato bruto devolvido pelo LLM
#[derive(Debug, Deserialize)]
struct WebSearchPlan {
    searches: Vec<WebSearchItem>,
}

#[derive(Debug, Deserialize)]
struct WebSearchItem {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    query: String,
}

/// Agente de planejamento
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    config: PlannerConfig,
}

impl Planner {
    /// Cria um planner com os limites padrão (3..=5)
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self::with_config(llm, PlannerConfig::default())
    }

    /// Cria um planner com limites customizados
    pub fn with_config(llm: Arc<dyn LlmClient>, config: PlannerConfig) -> Self {
        let max_searches = config.max_searches.clamp(1, MAX_SEARCHES_CAP);
        let config = PlannerConfig {
            min_searches: config.min_searches.clamp(1, max_searches),
            max_searches,
        };
        Self { llm, config }
    }

    /// Limites efetivos
    pub fn config(&self) -> PlannerConfig {
        self.config
    }

    /// Gera o plano de buscas para a query.
    pub async fn plan(
        &self,
        query: &ResearchQuery,
        tracker: &UsageTracker,
    ) -> Result<SearchPlan, PlanningError> {
        if query.is_blank() {
            return Err(PlanningError::EmptyQuery);
        }
        log::info!("🗺️ Planner: planejando buscas para '{}'", query.text());

        let request = CompletionRequest::text(
            PLANNER_LABEL,
            self.instructions(),
            build_planner_input(query),
        )
        .json_schema("web_search_plan", plan_schema());

        let (raw, usage): (WebSearchPlan, _) = complete_json(self.llm.as_ref(), &request).await?;
        tracker.track(PLANNER_LABEL, usage);

        let plan = self.validate(raw)?;
        log::info!("🗺️ Planner: {} buscas planejadas", plan.len());
        for (i, item) in plan.iter().enumerate() {
            log::debug!("   {}. {} ({})", i + 1, item.search_term, item.reason);
        }

        Ok(plan)
    }

    fn validate(&self, raw: WebSearchPlan) -> Result<SearchPlan, PlanningError> {
        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(raw.searches.len());

        for (index, search) in raw.searches.into_iter().enumerate() {
            let item = SearchPlanItem::new(search.query.trim(), search.reason.trim());
            if !item.is_complete() {
                return Err(PlanningError::IncompleteItem { index: index + 1 });
            }
            if !seen.insert(item.search_term.to_lowercase()) {
                log::warn!("⚠️ Planner: termo repetido descartado: '{}'", item.search_term);
                continue;
            }
            items.push(item);
        }

        if items.len() > self.config.max_searches {
            log::warn!(
                "⚠️ Planner: {} buscas retornadas, truncando para {}",
                items.len(),
                self.config.max_searches
            );
            items.truncate(self.config.max_searches);
        }

        if items.len() < self.config.min_searches {
            return Err(PlanningError::TooFewSearches {
                got: items.len(),
                min: self.config.min_searches,
            });
        }

        Ok(SearchPlan { items })
    }

    fn instructions(&self) -> String {
        format!(
            "You are a research planner. Given a research query, come up with a set of web \
             searches that together answer it as completely as possible.\n\
             \n\
             Output between {min} and {max} searches. Each search must cover a different \
             angle of the query; do not repeat or paraphrase another search.\n\
             For each search give:\n\
             - query: the exact term to type into a web search engine\n\
             - reason: one line explaining why this search matters for the query\n\
             \n\
             If clarifying questions and answers are provided, use them to narrow the \
             searches to what the user actually wants.",
            min = self.config.min_searches,
            max = self.config.max_searches
        )
    }
}

/// Monta a entrada do planner: query principal e esclarecimentos, se houver.
pub(crate) fn build_planner_input(query: &ResearchQuery) -> String {
    let clarifications = render_clarifications(query);
    if clarifications.is_empty() {
        return format!("Query: {}", query.text());
    }

    format!(
        "Main query: {}\n\n{}\nBased on the query and the answers above, create the web search plan.",
        query.text(),
        clarifications
    )
}

fn plan_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "searches": {
                "type": "array",
                "description": "The web searches to perform to best answer the query.",
                "items": {
                    "type": "object",
                    "properties": {
                        "reason": {
                            "type": "string",
                            "description": "Why this search is important to the query."
                        },
                        "query": {
                            "type": "string",
                            "description": "The search term to use for the web search."
                        }
                    },
                    "required": ["reason", "query"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["searches"],
        "additionalProperties": false
    })
}
