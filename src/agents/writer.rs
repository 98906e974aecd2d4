// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// WRITER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Sintetiza a query e TODOS os resumos em um relatório markdown longo,
// com resumo curto e perguntas de follow-up.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use super::render_clarifications;
use crate::llm::{complete_json, CompletionRequest, LlmClient, LlmError};
use crate::types::{Report, ResearchQuery, SearchResult};
use crate::utils::UsageTracker;

/// Rótulo das chamadas do writer
pub const WRITER_LABEL: &str = "writer";

const WRITER_INSTRUCTIONS: &str = "You are a senior researcher tasked with writing a cohesive \
report for a research query. You will be given the original query and summarized web search \
results gathered by a research assistant.\n\
\n\
First outline the structure of the report, then write the full report in markdown. It should \
be lengthy and detailed: aim for 5-10 pages of content, at least 1000 words. Start with a \
level-one heading that works as the report title. Use sections, lists and tables where they \
help the reader.\n\
\n\
Also return a 2-3 sentence summary of the findings and a list of suggested topics to research \
further.";

/// Erros da escrita do relatório
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WritingError {
    #[error("LLM error: {0}")]
    Llm(LlmError),

    #[error("Malformed report: {0}")]
    Malformed(String),

    #[error("No search results to write from")]
    NoResults,
}

impl From<LlmError> for WritingError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::ParseError(msg) => WritingError::Malformed(msg),
            LlmError::EmptyResponse => WritingError::Malformed("empty response".into()),
            other => WritingError::Llm(other),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReportData {
    #[serde(default)]
    short_summary: String,
    #[serde(default)]
    markdown_report: String,
    #[serde(default)]
    follow_up_questions: Vec<String>,
}

/// Agente de escrita
pub struct Writer {
    llm: Arc<dyn LlmClient>,
}

impl Writer {
    /// Cria um writer
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Escreve o relatório a partir de todos os resultados.
    pub async fn write(
        &self,
        query: &ResearchQuery,
        results: &[SearchResult],
        tracker: &UsageTracker,
    ) -> Result<Report, WritingError> {
        if results.is_empty() {
            return Err(WritingError::NoResults);
        }

        log::info!("✍️ Writer: sintetizando {} resumos", results.len());

        let request = CompletionRequest::text(
            WRITER_LABEL,
            WRITER_INSTRUCTIONS,
            build_writer_input(query, results),
        )
        .json_schema("report_data", report_schema());

        let (data, usage): (ReportData, _) = complete_json(self.llm.as_ref(), &request).await?;
        tracker.track(WRITER_LABEL, usage);

        let report = validate_report(data)?;
        log::info!(
            "✍️ Writer: relatório com {} caracteres, {} follow-ups",
            report.markdown_report.len(),
            report.follow_up_questions.len()
        );
        Ok(report)
    }
}

fn validate_report(data: ReportData) -> Result<Report, WritingError> {
    let short_summary = data.short_summary.trim();
    if short_summary.is_empty() {
        return Err(WritingError::Malformed("short_summary is empty".into()));
    }

    let markdown_report = data.markdown_report.trim();
    if markdown_report.is_empty() {
        return Err(WritingError::Malformed("markdown_report is empty".into()));
    }

    Ok(Report {
        short_summary: short_summary.to_string(),
        markdown_report: markdown_report.to_string(),
        follow_up_questions: data
            .follow_up_questions
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect(),
    })
}

/// Monta a entrada do writer com a query e cada resumo numerado.
pub(crate) fn build_writer_input(query: &ResearchQuery, results: &[SearchResult]) -> String {
    let mut input = format!("Original query: {}\n", query.text());

    let clarifications = render_clarifications(query);
    if !clarifications.is_empty() {
        input.push_str("\nClarifications from the user:\n");
        input.push_str(&clarifications);
    }

    input.push_str("\nSummarized search results:\n");
    for (i, result) in results.iter().enumerate() {
        input.push_str(&format!(
            "\n### Search {}: {}\nReason: {}\n\n{}\n",
            i + 1,
            result.item.search_term,
            result.item.reason,
            result.summary
        ));
    }

    input
}

fn report_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "short_summary": {
                "type": "string",
                "description": "A short 2-3 sentence summary of the findings."
            },
            "markdown_report": {
                "type": "string",
                "description": "The final report in markdown."
            },
            "follow_up_questions": {
                "type": "array",
                "description": "Suggested topics to research further.",
                "items": { "type": "string" }
            }
        },
        "required": ["short_summary", "markdown_report", "follow_up_questions"],
        "additionalProperties": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::types::SearchPlanItem;

    fn results(n: usize) -> Vec<SearchResult> {
        (0..n)
            .map(|i| SearchResult {
                item: SearchPlanItem::new(format!("term {}", i), "why"),
                summary: format!("summary number {}", i),
            })
            .collect()
    }

    fn report_json() -> String {
        json!({
            "short_summary": "Short.",
            "markdown_report": "# Title\n\nBody",
            "follow_up_questions": ["Next?", "  "]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_write_report() {
        let llm = Arc::new(MockLlmClient::new(|request| {
            assert!(request.input.contains("summary number 0"));
            assert!(request.input.contains("summary number 2"));
            Ok(report_json())
        }));
        let tracker = UsageTracker::new();

        let report = Writer::new(llm)
            .write(&ResearchQuery::new("q"), &results(3), &tracker)
            .await
            .unwrap();

        assert_eq!(report.short_summary, "Short.");
        assert!(report.markdown_report.starts_with("# Title"));
        assert_eq!(report.follow_up_questions, vec!["Next?".to_string()]);
        assert_eq!(tracker.calls(), 1);
    }

    #[tokio::test]
    async fn test_write_without_results() {
        let llm = Arc::new(MockLlmClient::new(|_| Ok(report_json())));
        let err = Writer::new(llm.clone())
            .write(&ResearchQuery::new("q"), &[], &UsageTracker::new())
            .await
            .unwrap_err();
        assert_eq!(err, WritingError::NoResults);
        assert_eq!(llm.started(WRITER_LABEL), 0);
    }

    #[tokio::test]
    async fn test_write_empty_report_is_malformed() {
        let llm = Arc::new(MockLlmClient::new(|_| {
            Ok(json!({"short_summary": "s", "markdown_report": " ", "follow_up_questions": []})
                .to_string())
        }));
        let err = Writer::new(llm)
            .write(&ResearchQuery::new("q"), &results(1), &UsageTracker::new())
            .await
            .unwrap_err();
        assert!(matches!(err, WritingError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_write_llm_error() {
        let llm = Arc::new(MockLlmClient::new(|_| {
            Err(LlmError::ApiError {
                status: 500,
                message: "boom".into(),
            })
        }));
        let err = Writer::new(llm)
            .write(&ResearchQuery::new("q"), &results(1), &UsageTracker::new())
            .await
            .unwrap_err();
        assert!(matches!(err, WritingError::Llm(LlmError::ApiError { status: 500, .. })));
    }

    #[test]
    fn test_writer_input_numbers_results() {
        let input = build_writer_input(&ResearchQuery::new("solar"), &results(2));
        assert!(input.starts_with("Original query: solar"));
        assert!(input.contains("### Search 1: term 0"));
        assert!(input.contains("### Search 2: term 1"));
        assert!(!input.contains("Clarifications"));
    }
}
