// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TIPOS COMPARTILHADOS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Modelo de dados de uma execução: pergunta → plano → resultados → relatório.
// Nada aqui é persistido; tudo vive apenas durante uma execução.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use serde::{Deserialize, Serialize};

/// Pergunta de pesquisa enviada pelo usuário.
///
/// Imutável depois de criada. As clarificações são opcionais e vêm do
/// endpoint de clarificação (perguntas feitas ao usuário + respostas).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchQuery {
    text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    clarifications: Vec<Clarification>,
}

impl ResearchQuery {
    /// Cria uma pergunta sem clarificações
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into().trim().to_string(),
            clarifications: Vec::new(),
        }
    }

    /// Anexa pares pergunta/resposta de clarificação
    pub fn with_clarifications(mut self, clarifications: Vec<Clarification>) -> Self {
        self.clarifications = clarifications;
        self
    }

    /// Texto da pergunta
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Clarificações na ordem em que foram respondidas
    pub fn clarifications(&self) -> &[Clarification] {
        &self.clarifications
    }

    /// `true` se a pergunta não tem conteúdo útil
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Par pergunta/resposta coletado antes do planejamento
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clarification {
    pub question: String,
    pub answer: String,
}

/// Um item do plano de buscas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPlanItem {
    /// Termo a ser buscado na web
    pub search_term: String,
    /// Justificativa de uma linha para a busca
    pub reason: String,
}

impl SearchPlanItem {
    /// Cria um item de plano
    pub fn new(search_term: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            search_term: search_term.into(),
            reason: reason.into(),
        }
    }

    /// `true` se termo e justificativa estão preenchidos
    pub fn is_complete(&self) -> bool {
        !self.search_term.trim().is_empty() && !self.reason.trim().is_empty()
    }
}

/// Plano de buscas. A identidade de cada item é posicional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPlan {
    pub items: Vec<SearchPlanItem>,
}

impl SearchPlan {
    /// Número de buscas planejadas
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `true` se o plano não tem itens
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Itera sobre os itens do plano
    pub fn iter(&self) -> std::slice::Iter<'_, SearchPlanItem> {
        self.items.iter()
    }
}

/// Resumo de uma busca, um por item do plano
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub item: SearchPlanItem,
    pub summary: String,
}

/// Relatório final produzido pelo Writer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Resumo curto (2-3 frases)
    pub short_summary: String,
    /// Relatório completo em markdown
    pub markdown_report: String,
    /// Sugestões de pesquisa de acompanhamento
    pub follow_up_questions: Vec<String>,
}

/// Uso de tokens reportado pelo serviço de LLM
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Cria a partir de tokens de entrada/saída
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_is_trimmed() {
        let query = ResearchQuery::new("  fluoridation and cavities \n");
        assert_eq!(query.text(), "fluoridation and cavities");
        assert!(!query.is_blank());
        assert!(ResearchQuery::new("   ").is_blank());
    }

    #[test]
    fn test_plan_item_completeness() {
        assert!(SearchPlanItem::new("rust async", "core topic").is_complete());
        assert!(!SearchPlanItem::new("", "core topic").is_complete());
        assert!(!SearchPlanItem::new("rust async", "  ").is_complete());
    }

    #[test]
    fn test_token_usage_accumulates() {
        let mut total = TokenUsage::default();
        total += TokenUsage::new(100, 20);
        total += TokenUsage::new(5, 5);
        assert_eq!(total.prompt_tokens, 105);
        assert_eq!(total.completion_tokens, 25);
        assert_eq!(total.total_tokens, 130);
    }

    #[test]
    fn test_query_deserializes_without_clarifications() {
        let query: ResearchQuery = serde_json::from_str(r#"{"text":"solar storage"}"#).unwrap();
        assert_eq!(query.text(), "solar storage");
        assert!(query.clarifications().is_empty());
    }
}
