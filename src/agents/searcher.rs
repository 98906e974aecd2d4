// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SEARCHER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Executa UMA busca na web (ferramenta hospedada do provedor) e devolve um
// resumo curto e denso. Várias instâncias rodam em paralelo no orquestrador.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::llm::{CompletionRequest, LlmClient, LlmError};
use crate::types::{SearchPlanItem, SearchResult};
use crate::utils::{ActionTimer, UsageTracker};

/// Rótulo das chamadas do searcher
pub const SEARCHER_LABEL: &str = "searcher";

const SEARCH_INSTRUCTIONS: &str = "You are a research assistant. Given a search term, you \
search the web for that term and produce a concise summary of the results. The summary must \
be 2-3 paragraphs and less than 300 words. Capture the main points and keep figures, dates \
and names exactly as found. Write succinctly; sentences can be fragments. No fluff and no market-report framing. This summary will \
be consumed by someone synthesizing a report, so only the essence matters. Do not include \
any commentary other than the summary itself.";

/// Erros de uma busca
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Search timed out after {0:?}")]
    Timeout(Duration),

    #[error("Search returned an empty summary")]
    EmptySummary,
}

/// Agente de busca
pub struct Searcher {
    llm: Arc<dyn LlmClient>,
    timeout: Option<Duration>,
}

impl Searcher {
    /// Cria um searcher sem prazo por busca
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm, timeout: None }
    }

    /// Define o prazo máximo de cada busca (`None` desativa)
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Busca um item do plano e resume os resultados.
    pub async fn search(
        &self,
        item: &SearchPlanItem,
        tracker: &UsageTracker,
    ) -> Result<SearchResult, SearchError> {
        log::info!("🔍 Searcher: buscando '{}'", item.search_term);
        let timer = ActionTimer::start(&format!("Busca '{}'", item.search_term));

        let request = CompletionRequest::text(
            SEARCHER_LABEL,
            SEARCH_INSTRUCTIONS,
            format!(
                "Search term: {}\nReason for searching: {}",
                item.search_term, item.reason
            ),
        )
        .with_web_search();

        let completion = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.llm.complete(&request))
                .await
                .map_err(|_| {
                    log::warn!("⏰ Searcher: '{}' excedeu {:?}", item.search_term, limit);
                    SearchError::Timeout(limit)
                })??,
            None => self.llm.complete(&request).await?,
        };
        tracker.track(SEARCHER_LABEL, completion.usage);

        let summary = completion.text.trim();
        if summary.is_empty() {
            return Err(SearchError::EmptySummary);
        }

        timer.stop_and_log();
        Ok(SearchResult {
            item: item.clone(),
            summary: summary.to_string(),
        })
    }
}
