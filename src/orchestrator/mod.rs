// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ORQUESTRADOR
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Sequência fixa de uma execução:
// 1. Planner: query -> plano
// 2. Searchers: um por item, todos concorrentes (fan-out)
// 3. Barreira: só segue quando TODAS as buscas terminaram com sucesso
// 4. Writer: relatório com todos os resumos (fan-in)
// 5. Relatório emitido para a UI
// 6. Notifier: e-mail best-effort
//
// Falha em Planning/Searching/Writing aborta a execução (Failed). A
// primeira busca que falha cancela as irmãs ainda em voo.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod state;

pub use state::{DeliveryOutcome, RunState, Stage};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::agents::{
    ClarifyError, Clarifier, Planner, PlannerConfig, PlanningError, SearchError, Searcher,
    Writer, WritingError, CLARIFIER_LABEL, PLANNER_LABEL, SEARCHER_LABEL, WRITER_LABEL,
};
use crate::config::{AppConfig, ResearchConfig};
use crate::llm::LlmClient;
use crate::notifier::{markdown, DeliveryError, Notifier};
use crate::types::{Report, ResearchQuery, SearchPlan, SearchResult, TokenUsage};
use crate::utils::{ActionTimer, StageTimings, UsageTracker};

/// Erro fatal de uma execução, com o estágio que falhou
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("Planning failed: {0}")]
    Planning(#[from] PlanningError),

    #[error("Searching failed: {0}")]
    Searching(#[from] SearchError),

    #[error("Writing failed: {0}")]
    Writing(#[from] WritingError),
}

impl RunError {
    /// Estágio que falhou
    pub fn stage(&self) -> Stage {
        match self {
            RunError::Planning(_) => Stage::Planning,
            RunError::Searching(_) => Stage::Searching,
            RunError::Writing(_) => Stage::Writing,
        }
    }
}

/// Evento de progresso emitido durante a execução
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// Linha de status
    Status { message: String },
    /// Problema não fatal (ex.: falha no e-mail)
    Warning { message: String },
    /// Resumo curto do relatório
    Summary { text: String },
    /// Relatório completo
    Report {
        markdown: String,
        html: String,
        follow_up_questions: Vec<String>,
    },
    /// Estágio fatal falhou
    Error { stage: Stage, message: String },
    /// Execução terminou
    Finished { run_id: Uuid, state: RunState },
}

/// Callback de progresso
pub type ProgressCallback = Arc<dyn Fn(RunEvent) + Send + Sync>;

/// Uso de tokens por estágio
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageUsage {
    pub planning: TokenUsage,
    pub searching: TokenUsage,
    pub writing: TokenUsage,
    pub total: TokenUsage,
}

impl StageUsage {
    fn from_tracker(tracker: &UsageTracker) -> Self {
        Self {
            planning: tracker.total_for(PLANNER_LABEL),
            searching: tracker.total_for(SEARCHER_LABEL),
            writing: tracker.total_for(WRITER_LABEL),
            total: tracker.total(),
        }
    }
}

/// Resultado final de uma execução
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub query: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Sempre terminal: Done ou Failed
    pub state: RunState,
    /// Linhas de status na ordem em que foram emitidas
    pub status: Vec<String>,
    pub plan: Option<SearchPlan>,
    pub results: Vec<SearchResult>,
    pub report: Option<Report>,
    pub usage: StageUsage,
    pub timings: StageTimings,
}

impl RunOutcome {
    /// Verifica se a execução produziu relatório
    pub fn is_done(&self) -> bool {
        self.state.is_done()
    }

    /// Mensagem de erro, se a execução falhou
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            RunState::Failed { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// Perguntas de esclarecimento e o uso de tokens da chamada
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClarifyOutcome {
    pub questions: Vec<String>,
    pub usage: TokenUsage,
}

/// Estado mutável compartilhado pelas buscas concorrentes
struct RunTracker {
    run_id: Uuid,
    state: Mutex<RunState>,
    status: Mutex<Vec<String>>,
    progress: Option<ProgressCallback>,
}

impl RunTracker {
    fn new(progress: Option<ProgressCallback>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: Mutex::new(RunState::Idle),
            status: Mutex::new(Vec::new()),
            progress,
        }
    }

    fn emit(&self, event: RunEvent) {
        if let Some(cb) = &self.progress {
            cb(event);
        }
    }

    fn transition(&self, next: RunState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.can_transition_to(&next) {
            log::error!(
                "❌ [{}] Transição inválida: {} → {}",
                self.run_id,
                state.name(),
                next.name()
            );
        }
        log::info!("🔄 [{}] {} → {}", self.run_id, state.name(), next.name());
        *state = next;
    }

    fn state(&self) -> RunState {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn status(&self, message: impl Into<String>) {
        let message = message.into();
        log::info!("📣 [{}] {}", self.run_id, message);
        self.status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.clone());
        self.emit(RunEvent::Status { message });
    }

    fn warning(&self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("⚠️ [{}] {}", self.run_id, message);
        self.status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(format!("Warning: {}", message));
        self.emit(RunEvent::Warning { message });
    }

    fn status_lines(&self) -> Vec<String> {
        self.status.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Partes produzidas até o ponto em que a execução parou
#[derive(Default)]
struct Draft {
    plan: Option<SearchPlan>,
    results: Vec<SearchResult>,
    report: Option<Report>,
    timings: StageTimings,
}

/// Orquestrador de pesquisa: Planner → Searchers → Writer → Notifier
pub struct ResearchManager {
    clarifier: Clarifier,
    planner: Planner,
    searcher: Searcher,
    writer: Writer,
    notifier: Notifier,
}

impl ResearchManager {
    /// Cria o orquestrador com um cliente LLM e um notifier
    pub fn new(llm: Arc<dyn LlmClient>, research: &ResearchConfig, notifier: Notifier) -> Self {
        Self {
            clarifier: Clarifier::new(Arc::clone(&llm)),
            planner: Planner::with_config(Arc::clone(&llm), PlannerConfig::from(research)),
            searcher: Searcher::new(Arc::clone(&llm)).with_timeout(research.search_timeout),
            writer: Writer::new(llm),
            notifier,
        }
    }

    /// Cria o orquestrador a partir da configuração da aplicação
    pub fn from_config(config: &AppConfig, llm: Arc<dyn LlmClient>) -> Result<Self, DeliveryError> {
        let notifier = Notifier::from_config(config.email.clone())?;
        Ok(Self::new(llm, &config.research, notifier))
    }

    /// Gera perguntas de esclarecimento (etapa opcional, fora da execução)
    pub async fn clarify(&self, query: &ResearchQuery) -> Result<ClarifyOutcome, ClarifyError> {
        let tracker = UsageTracker::new();
        let questions = self.clarifier.clarify(query, &tracker).await?;
        let usage = tracker.total_for(CLARIFIER_LABEL);
        log::info!(
            "❓ Clarifier: {} perguntas, {} tokens",
            questions.len(),
            usage.total_tokens
        );
        Ok(ClarifyOutcome { questions, usage })
    }

    /// Executa a pesquisa completa sem callback de progresso
    pub async fn run(&self, query: ResearchQuery) -> RunOutcome {
        self.execute(query, None).await
    }

    /// Executa a pesquisa completa emitindo eventos de progresso
    pub async fn run_with_progress(
        &self,
        query: ResearchQuery,
        progress: ProgressCallback,
    ) -> RunOutcome {
        self.execute(query, Some(progress)).await
    }

    async fn execute(&self, query: ResearchQuery, progress: Option<ProgressCallback>) -> RunOutcome {
        let run = RunTracker::new(progress);
        let started_at = Utc::now();
        let tracker = UsageTracker::new();
        let mut draft = Draft::default();

        run.status(format!("Starting research run {}", run.run_id));

        match self.pipeline(&query, &run, &tracker, &mut draft).await {
            Ok(delivery) => {
                run.transition(RunState::Done { delivery });
                run.status("Research complete");
            }
            Err(e) => {
                let stage = e.stage();
                let reason = e.to_string();
                log::error!("❌ [{}] {}", run.run_id, reason);
                run.status(reason.clone());
                run.emit(RunEvent::Error {
                    stage,
                    message: reason.clone(),
                });
                run.transition(RunState::Failed { stage, reason });
            }
        }

        let state = run.state();
        log::info!("{}", draft.timings.summary());
        run.emit(RunEvent::Finished {
            run_id: run.run_id,
            state: state.clone(),
        });

        RunOutcome {
            run_id: run.run_id,
            query: query.text().to_string(),
            started_at,
            finished_at: Utc::now(),
            state,
            status: run.status_lines(),
            plan: draft.plan,
            results: draft.results,
            report: draft.report,
            usage: StageUsage::from_tracker(&tracker),
            timings: draft.timings,
        }
    }

    async fn pipeline(
        &self,
        query: &ResearchQuery,
        run: &RunTracker,
        tracker: &UsageTracker,
        draft: &mut Draft,
    ) -> Result<DeliveryOutcome, RunError> {
        // 1. Planejamento
        run.transition(RunState::Planning);
        run.status("Planning searches...");
        let timer = ActionTimer::start("Planejamento");
        let plan = self.planner.plan(query, tracker).await?;
        draft.timings.planning_ms = timer.stop_and_log();
        run.status(format!("Will perform {} searches", plan.len()));

        // 2. Buscas concorrentes
        let total = plan.len();
        run.transition(RunState::Searching { planned: total });
        run.status("Searching...");
        let timer = ActionTimer::start("Buscas");
        let results = self.search_all(&plan, run, tracker).await;
        draft.plan = Some(plan);
        let results = results?;
        draft.timings.searching_ms = timer.stop_and_log();
        draft.timings.search_ms = results.iter().map(|(_, ms)| *ms).collect();
        let results: Vec<SearchResult> = results.into_iter().map(|(r, _)| r).collect();
        run.status("Finished searching");

        // 3. Relatório
        run.transition(RunState::Writing {
            results: results.len(),
        });
        run.status("Thinking about report...");
        let timer = ActionTimer::start("Escrita");
        let written = self.writer.write(query, &results, tracker).await;
        draft.results = results;
        let report = written?;
        draft.timings.writing_ms = timer.stop_and_log();
        run.status("Finished writing report");

        run.emit(RunEvent::Summary {
            text: report.short_summary.clone(),
        });
        run.emit(RunEvent::Report {
            markdown: report.markdown_report.clone(),
            html: markdown::render_markdown(&report.markdown_report),
            follow_up_questions: report.follow_up_questions.clone(),
        });
        let report = draft.report.insert(report);

        // 4. E-mail (best-effort)
        run.transition(RunState::Notifying);
        run.status("Sending email...");
        let timer = ActionTimer::start("Notificação");
        let delivery = match self.notifier.notify(&report.markdown_report, query).await {
            Ok(receipt) => {
                run.status("Email sent");
                DeliveryOutcome::Delivered {
                    message_id: receipt.message_id,
                }
            }
            Err(e) => {
                run.warning(format!("Email delivery failed: {}", e));
                DeliveryOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        draft.timings.notifying_ms = timer.stop_and_log();

        Ok(delivery)
    }

    /// Fan-out: uma busca por item, todas no mesmo join.
    ///
    /// Os resultados saem na ordem do plano. No primeiro erro o join
    /// retorna e as buscas restantes são descartadas.
    async fn search_all(
        &self,
        plan: &SearchPlan,
        run: &RunTracker,
        tracker: &UsageTracker,
    ) -> Result<Vec<(SearchResult, u128)>, SearchError> {
        let total = plan.len();
        let completed = AtomicUsize::new(0);
        let completed = &completed;

        let searches = plan.iter().map(move |item| async move {
            let timer = ActionTimer::start(&item.search_term);
            match self.searcher.search(item, tracker).await {
                Ok(result) => {
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    run.status(format!(
                        "Search {}/{} complete: {}",
                        done, total, item.search_term
                    ));
                    Ok((result, timer.stop()))
                }
                Err(e) => {
                    log::warn!("⚠️ [{}] Busca '{}' falhou: {}", run.run_id, item.search_term, e);
                    Err(e)
                }
            }
        });

        try_join_all(searches).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmailConfig;
    use crate::llm::{CompletionRequest, LlmError, MockLlmClient};
    use crate::notifier::{DeliveryError, DeliveryReceipt, MockEmailTransport};
    use serde_json::json;

    fn respond(request: &CompletionRequest) -> Result<String, LlmError> {
        match request.label {
            PLANNER_LABEL => Ok(json!({"searches": [
                {"query": "a", "reason": "r"},
                {"query": "b", "reason": "r"},
                {"query": "c", "reason": "r"}
            ]})
            .to_string()),
            SEARCHER_LABEL => Ok(format!("summary of {}", request.input)),
            WRITER_LABEL => Ok(json!({
                "short_summary": "Short.",
                "markdown_report": "# Report\n\nBody",
                "follow_up_questions": ["More?"]
            })
            .to_string()),
            _ => Err(LlmError::EmptyResponse),
        }
    }

    fn email_config() -> EmailConfig {
        EmailConfig {
            api_key: Some("SG.test".into()),
            base_url: "https://api.sendgrid.com".into(),
            from: Some("reports@example.com".into()),
            to: Some("reader@example.com".into()),
        }
    }

    fn manager(llm: Arc<MockLlmClient>, transport: MockEmailTransport) -> ResearchManager {
        ResearchManager::new(
            llm,
            &ResearchConfig::default(),
            Notifier::with_transport(email_config(), Arc::new(transport)),
        )
    }

    fn collect_events() -> (ProgressCallback, Arc<Mutex<Vec<RunEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let callback: ProgressCallback = Arc::new(move |event| sink.lock().unwrap().push(event));
        (callback, events)
    }

    #[tokio::test]
    async fn test_successful_run() {
        let mut transport = MockEmailTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Ok(DeliveryReceipt {
                status: 202,
                message_id: Some("m-1".into()),
            })
        });
        let llm = Arc::new(MockLlmClient::new(respond));
        let (callback, events) = collect_events();

        let outcome = manager(llm, transport)
            .run_with_progress(ResearchQuery::new("topic"), callback)
            .await;

        assert_eq!(
            outcome.state,
            RunState::Done {
                delivery: DeliveryOutcome::Delivered {
                    message_id: Some("m-1".into())
                }
            }
        );
        assert!(outcome.status[0].contains(&outcome.run_id.to_string()));
        assert!(outcome.status.iter().any(|s| s == "Search 3/3 complete: a"
            || s == "Search 3/3 complete: b"
            || s == "Search 3/3 complete: c"));
        assert_eq!(outcome.results.len(), 3);
        assert_eq!(outcome.timings.search_ms.len(), 3);
        assert!(outcome.finished_at >= outcome.started_at);
        assert!(outcome.usage.total.total_tokens > 0);
        assert_eq!(
            outcome.usage.total.total_tokens,
            outcome.usage.planning.total_tokens
                + outcome.usage.searching.total_tokens
                + outcome.usage.writing.total_tokens
        );

        let events = events.lock().unwrap();
        assert!(matches!(events.last(), Some(RunEvent::Finished { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, RunEvent::Summary { text } if text == "Short.")));
        assert!(events
            .iter()
            .any(|e| matches!(e, RunEvent::Report { html, .. } if html.contains("<h1>Report</h1>"))));
    }

    #[tokio::test]
    async fn test_planning_failure() {
        let mut transport = MockEmailTransport::new();
        transport.expect_send().times(0);
        let llm = Arc::new(MockLlmClient::new(|_| Err(LlmError::RateLimitError)));

        let outcome = manager(llm.clone(), transport)
            .run(ResearchQuery::new("topic"))
            .await;

        assert!(matches!(
            outcome.state,
            RunState::Failed {
                stage: Stage::Planning,
                ..
            }
        ));
        assert!(outcome.error().unwrap().starts_with("Planning failed"));
        assert_eq!(llm.started(SEARCHER_LABEL), 0);
        assert!(outcome.plan.is_none());
    }

    #[tokio::test]
    async fn test_writing_failure_keeps_results() {
        let mut transport = MockEmailTransport::new();
        transport.expect_send().times(0);
        let llm = Arc::new(MockLlmClient::new(|request| match request.label {
            WRITER_LABEL => Ok("not json".into()),
            _ => respond(request),
        }));

        let outcome = manager(llm, transport).run(ResearchQuery::new("topic")).await;

        assert!(matches!(
            outcome.state,
            RunState::Failed {
                stage: Stage::Writing,
                ..
            }
        ));
        assert_eq!(outcome.results.len(), 3);
        assert!(outcome.report.is_none());
    }

    #[tokio::test]
    async fn test_delivery_failure_is_degraded_done() {
        let mut transport = MockEmailTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Err(DeliveryError::RateLimited));
        let llm = Arc::new(MockLlmClient::new(respond));

        let outcome = manager(llm, transport).run(ResearchQuery::new("topic")).await;

        assert!(outcome.is_done());
        assert!(matches!(
            &outcome.state,
            RunState::Done {
                delivery: DeliveryOutcome::Failed { .. }
            }
        ));
        assert!(outcome.report.is_some());
        assert!(outcome.status.iter().any(|s| s.starts_with("Warning: Email delivery failed")));
    }

    #[tokio::test]
    async fn test_clarify_reports_usage() {
        let llm = Arc::new(MockLlmClient::new(|_| {
            Ok(json!({"questions": ["Which region?", "Which years?"]}).to_string())
        }));

        let outcome = manager(llm, MockEmailTransport::new())
            .clarify(&ResearchQuery::new("water fluoridation"))
            .await
            .unwrap();

        assert_eq!(outcome.questions, vec!["Which region?", "Which years?"]);
        assert!(outcome.usage.total_tokens > 0);
    }

    #[test]
    fn test_run_error_stage() {
        assert_eq!(RunError::from(PlanningError::EmptyQuery).stage(), Stage::Planning);
        assert_eq!(RunError::from(SearchError::EmptySummary).stage(), Stage::Searching);
        assert_eq!(RunError::from(WritingError::NoResults).stage(), Stage::Writing);
    }

    #[test]
    fn test_event_serialization() {
        let event = RunEvent::Status {
            message: "Searching...".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, json!({"type": "status", "message": "Searching..."}));
    }
}
