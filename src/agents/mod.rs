// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AGENTES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Cada agente é um wrapper fino sobre o `LlmClient`:
// - Planner: query -> plano de buscas
// - Searcher: item do plano -> resumo da web
// - Writer: query + resumos -> relatório
// - Clarifier: query -> perguntas de esclarecimento
//
// Os agentes não conhecem o orquestrador; só recebem entradas e devolvem
// saídas tipadas ou erros.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

mod clarifier;
mod planner;
mod searcher;
mod writer;

pub use clarifier::{ClarifyError, Clarifier, CLARIFIER_LABEL, MAX_QUESTIONS};
pub use planner::{Planner, PlannerConfig, PlanningError, PLANNER_LABEL};
pub use searcher::{SearchError, Searcher, SEARCHER_LABEL};
pub use writer::{Writer, WritingError, WRITER_LABEL};

use crate::types::ResearchQuery;

/// Monta o bloco "Question i / Answer i" das respostas de esclarecimento.
///
/// Retorna string vazia quando a query não tem esclarecimentos.
pub(crate) fn render_clarifications(query: &ResearchQuery) -> String {
    query
        .clarifications()
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                "Question {n}: {}\nAnswer {n}: {}\n",
                c.question.trim(),
                c.answer.trim(),
                n = i + 1
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Clarification;

    #[test]
    fn test_render_clarifications() {
        let query = ResearchQuery::new("solar panels").with_clarifications(vec![
            Clarification {
                question: "Which country?".into(),
                answer: " Brazil ".into(),
            },
            Clarification {
                question: "Residential or utility?".into(),
                answer: "Residential".into(),
            },
        ]);

        let rendered = render_clarifications(&query);
        assert!(rendered.contains("Question 1: Which country?\nAnswer 1: Brazil"));
        assert!(rendered.contains("Question 2: Residential or utility?\nAnswer 2: Residential"));
    }

    #[test]
    fn test_render_without_clarifications() {
        assert!(render_clarifications(&ResearchQuery::new("x")).is_empty());
    }
}
