//! # Deep Research Mailer
//!
//! Orquestrador de pesquisa que transforma uma pergunta em um relatório
//! longo e o entrega por e-mail.
//!
//! ## Fluxo de uma execução
//!
//! 1. **Planner** decompõe a query em 3-5 buscas, cada uma com justificativa
//! 2. **Searchers** executam todas as buscas em paralelo (busca web do provedor)
//! 3. **Writer** sintetiza todos os resumos em um relatório markdown
//! 4. **Notifier** converte o relatório em HTML e envia por e-mail
//!
//! Cada transição emite uma linha de status para a interface. Falha em
//! planejamento, busca ou escrita aborta a execução; falha no e-mail só gera
//! um warning e o relatório continua visível.
//!
//! ## Máquina de Estados (`orchestrator`)
//!
//! - **Idle** → **Planning** → **Searching** → **Writing** → **Notifying** → **Done**
//! - **Failed**: alcançável a partir de qualquer estágio ativo
//!
//! ## Exemplo de Uso
//!
//! ```rust,ignore
//! use deep_research_mailer::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_app_config()?;
//!     let llm = Arc::new(OpenAiClient::from_config(&config.llm)?);
//!     let manager = ResearchManager::from_config(&config, llm)?;
//!
//!     let outcome = manager.run(ResearchQuery::new("Impact of water fluoridation")).await;
//!     println!("{}", outcome.report.map(|r| r.markdown_report).unwrap_or_default());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Tipos fundamentais compartilhados por todo o sistema.
///
/// - [`ResearchQuery`]: pergunta do usuário com esclarecimentos opcionais
/// - [`SearchPlan`]: lista ordenada de buscas planejadas
/// - [`SearchResult`]: resumo de uma busca
/// - [`Report`]: relatório final
#[allow(missing_docs)]
pub mod types;

/// Configuração via variáveis de ambiente.
pub mod config;

/// Clientes para Large Language Models (LLMs).
///
/// Define a trait `LlmClient` e implementações para:
/// - OpenAI (Responses API, com busca web hospedada)
/// - Mock para testes
pub mod llm;

/// Agentes: planner, searcher, writer e clarifier.
#[allow(missing_docs)]
pub mod agents;

/// Envio do relatório por e-mail (markdown → HTML → SendGrid).
#[allow(missing_docs)]
pub mod notifier;

/// Orquestrador e máquina de estados da execução.
///
/// - `ResearchManager`: sequencia os agentes
/// - `RunState`: estados possíveis (Planning, Searching, ..., Done, Failed)
/// - `RunEvent`: eventos de progresso para a interface
/// - `RunOutcome`: resultado final com status, relatório, uso e tempos
#[allow(missing_docs)]
pub mod orchestrator;

/// Servidor HTTP com o formulário e streaming SSE.
pub mod server;

/// Utilitários: timing por estágio e tracking de tokens.
#[allow(missing_docs)]
pub mod utils;

pub use config::{load_app_config, AppConfig, ConfigError};
pub use llm::{LlmClient, LlmError, MockLlmClient, OpenAiClient};
pub use orchestrator::{ResearchManager, RunEvent, RunOutcome, RunState};
pub use types::*;

/// Versão do crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude com os tipos mais usados.
///
/// ```rust,ignore
/// use deep_research_mailer::prelude::*;
/// ```
pub mod prelude {
    pub use crate::agents::{Clarifier, Planner, Searcher, Writer};
    pub use crate::config::{load_app_config, AppConfig};
    pub use crate::llm::{LlmClient, MockLlmClient, OpenAiClient};
    pub use crate::notifier::{EmailTransport, Notifier};
    pub use crate::orchestrator::{
        DeliveryOutcome, ProgressCallback, ResearchManager, RunEvent, RunOutcome, RunState, Stage,
    };
    pub use crate::types::*;
    pub use std::sync::Arc;
}
