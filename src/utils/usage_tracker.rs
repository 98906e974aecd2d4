// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// USAGE TRACKER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Acumula o uso de tokens de cada chamada ao LLM durante uma execução.
// Compartilhado por referência entre as buscas concorrentes.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::sync::Mutex;

use crate::types::TokenUsage;

/// Uso de tokens de uma chamada
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallUsage {
    pub operation: String,
    pub usage: TokenUsage,
}

/// Tracker de uso de tokens de uma execução
#[derive(Debug, Default)]
pub struct UsageTracker {
    history: Mutex<Vec<CallUsage>>,
}

impl UsageTracker {
    /// Cria um tracker vazio
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra uso de tokens
    pub fn track(&self, operation: &str, usage: TokenUsage) {
        log::debug!(
            "Token usage [{}]: {} + {} = {}",
            operation,
            usage.prompt_tokens,
            usage.completion_tokens,
            usage.total_tokens
        );

        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(CallUsage {
                operation: operation.to_string(),
                usage,
            });
    }

    /// Retorna uso total
    pub fn total(&self) -> TokenUsage {
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        history.iter().fold(TokenUsage::default(), |mut acc, call| {
            acc += call.usage;
            acc
        })
    }

    /// Soma do uso de uma operação
    pub fn total_for(&self, operation: &str) -> TokenUsage {
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        history
            .iter()
            .filter(|c| c.operation == operation)
            .fold(TokenUsage::default(), |mut acc, call| {
                acc += call.usage;
                acc
            })
    }

    /// Número de chamadas registradas
    pub fn calls(&self) -> usize {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_tracking() {
        let tracker = UsageTracker::new();
        tracker.track("planner", TokenUsage::new(100, 50));
        tracker.track("searcher", TokenUsage::new(200, 100));
        tracker.track("searcher", TokenUsage::new(10, 10));

        assert_eq!(tracker.total().total_tokens, 470);
        assert_eq!(tracker.total_for("searcher").prompt_tokens, 210);
        assert_eq!(tracker.calls(), 3);
    }

    #[test]
    fn test_concurrent_tracking() {
        let tracker = Arc::new(UsageTracker::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || tracker.track("searcher", TokenUsage::new(1, 1)))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tracker.calls(), 8);
        assert_eq!(tracker.total().total_tokens, 16);
    }
}
