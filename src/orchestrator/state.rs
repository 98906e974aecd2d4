// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ESTADOS DA EXECUÇÃO
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Idle → Planning → Searching → Writing → Notifying → Done
//            ↘          ↘          ↘          ↘
//                        Failed
//
// Done é alcançado mesmo quando a entrega do e-mail falha.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use serde::Serialize;

/// Estágio que pode falhar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Planning,
    Searching,
    Writing,
    Notifying,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Planning => "Planning",
            Stage::Searching => "Searching",
            Stage::Writing => "Writing",
            Stage::Notifying => "Notifying",
        };
        write!(f, "{}", name)
    }
}

/// Resultado do estágio de notificação
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// Provedor aceitou a mensagem
    Delivered { message_id: Option<String> },
    /// Entrega falhou; o relatório continua válido
    Failed { reason: String },
}

impl DeliveryOutcome {
    /// Verifica se a mensagem foi entregue
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Estado de uma execução - transições explícitas
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    /// Aguardando a query
    Idle,

    /// Gerando o plano de buscas
    Planning,

    /// Buscas concorrentes em andamento
    Searching {
        /// Número de buscas do plano
        planned: usize,
    },

    /// Sintetizando o relatório
    Writing {
        /// Número de resumos entregues ao writer
        results: usize,
    },

    /// Enviando o e-mail
    Notifying,

    /// Estado terminal - relatório produzido
    Done {
        /// Resultado da entrega (pode ter falhado)
        delivery: DeliveryOutcome,
    },

    /// Estado terminal - estágio fatal falhou
    Failed {
        /// Estágio que falhou
        stage: Stage,
        /// Mensagem do erro
        reason: String,
    },
}

impl RunState {
    /// Verifica se o estado é terminal (Done ou Failed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done { .. } | RunState::Failed { .. })
    }

    /// Verifica se a execução terminou com relatório
    pub fn is_done(&self) -> bool {
        matches!(self, RunState::Done { .. })
    }

    /// Estágio ativo, se houver
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RunState::Planning => Some(Stage::Planning),
            RunState::Searching { .. } => Some(Stage::Searching),
            RunState::Writing { .. } => Some(Stage::Writing),
            RunState::Notifying => Some(Stage::Notifying),
            _ => None,
        }
    }

    /// Verifica se uma transição é válida
    pub fn can_transition_to(&self, target: &RunState) -> bool {
        // Falha a partir de qualquer estágio ativo
        if matches!(target, RunState::Failed { .. }) {
            return self.stage().is_some();
        }

        matches!(
            (self, target),
            (RunState::Idle, RunState::Planning)
                | (RunState::Planning, RunState::Searching { .. })
                | (RunState::Searching { .. }, RunState::Writing { .. })
                | (RunState::Writing { .. }, RunState::Notifying)
                | (RunState::Notifying, RunState::Done { .. })
        )
    }

    /// Nome curto do estado
    pub fn name(&self) -> &'static str {
        match self {
            RunState::Idle => "Idle",
            RunState::Planning => "Planning",
            RunState::Searching { .. } => "Searching",
            RunState::Writing { .. } => "Writing",
            RunState::Notifying => "Notifying",
            RunState::Done { .. } => "Done",
            RunState::Failed { .. } => "Failed",
        }
    }
}
