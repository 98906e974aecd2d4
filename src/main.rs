// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DEEP RESEARCH MAILER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Sobe a interface web de pesquisa.
//
// Uso:
//   deep-research-mailer                       (escuta em 127.0.0.1:7860)
//   SERVER_ADDR=0.0.0.0:8080 deep-research-mailer
//   RUST_LOG=debug deep-research-mailer
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use deep_research_mailer::prelude::*;
use deep_research_mailer::server::{start_server, AppState};
use std::path::PathBuf;

/// Tenta carregar o arquivo .env de múltiplos locais possíveis
fn load_dotenv() {
    let possible_paths = [PathBuf::from(".env"), PathBuf::from("../.env")];

    for path in &possible_paths {
        if path.exists() {
            match dotenvy::from_path(path) {
                Ok(_) => {
                    eprintln!(
                        "✓ Carregado .env de: {:?}",
                        path.canonicalize().unwrap_or(path.clone())
                    );
                    return;
                }
                Err(e) => {
                    eprintln!("⚠ Erro ao carregar {:?}: {}", path, e);
                }
            }
        }
    }

    eprintln!("⚠ Nenhum arquivo .env encontrado. Usando apenas variáveis de ambiente.");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Carregar .env PRIMEIRO, antes de qualquer coisa
    load_dotenv();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    eprintln!("Deep Research Mailer v{}", deep_research_mailer::VERSION);

    let config = match load_app_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ Configuração inválida: {}", e);
            std::process::exit(1);
        }
    };

    let llm: Arc<dyn LlmClient> = Arc::new(OpenAiClient::from_config(&config.llm)?);
    let manager = ResearchManager::from_config(&config, llm)?;
    let state = Arc::new(AppState { manager });

    start_server(config.server.addr, state).await
}
