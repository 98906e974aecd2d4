// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TIMING UTILITIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Utilitários para medir tempo de execução de cada estágio.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::time::{Duration, Instant};

use serde::Serialize;

/// Timer para medir duração de operações
pub struct ActionTimer {
    start: Instant,
    action_name: String,
}

impl ActionTimer {
    /// Inicia um novo timer para uma ação
    pub fn start(action_name: &str) -> Self {
        Self {
            start: Instant::now(),
            action_name: action_name.to_string(),
        }
    }

    /// Retorna o tempo decorrido em milissegundos
    pub fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }

    /// Retorna o tempo decorrido como Duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Para o timer e loga o tempo decorrido
    pub fn stop_and_log(self) -> u128 {
        let elapsed = self.elapsed_ms();
        log::info!("⏱️  {} completado em {}ms", self.action_name, elapsed);
        elapsed
    }

    /// Para o timer e retorna o tempo sem logar
    pub fn stop(self) -> u128 {
        self.elapsed_ms()
    }
}

/// Tempos por estágio de uma execução (ms).
///
/// Estágios não alcançados ficam em zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageTimings {
    pub planning_ms: u128,
    pub searching_ms: u128,
    pub writing_ms: u128,
    pub notifying_ms: u128,
    /// Duração de cada busca individual, na ordem do plano
    pub search_ms: Vec<u128>,
}

impl StageTimings {
    /// Cria uma instância zerada
    pub fn new() -> Self {
        Self::default()
    }

    /// Média das buscas individuais
    pub fn avg_search_time(&self) -> f64 {
        if self.search_ms.is_empty() {
            0.0
        } else {
            self.search_ms.iter().sum::<u128>() as f64 / self.search_ms.len() as f64
        }
    }

    /// Tempo total de parede
    pub fn total_time(&self) -> u128 {
        self.planning_ms + self.searching_ms + self.writing_ms + self.notifying_ms
    }

    /// Formata um resumo das estatísticas
    pub fn summary(&self) -> String {
        format!(
            "Timing Stats:\n\
             - Planning: {}ms\n\
             - Searching: {}ms ({} searches, avg {:.1}ms)\n\
             - Writing: {}ms\n\
             - Notifying: {}ms\n\
             - Total: {}ms",
            self.planning_ms,
            self.searching_ms,
            self.search_ms.len(),
            self.avg_search_time(),
            self.writing_ms,
            self.notifying_ms,
            self.total_time()
        )
    }
}
