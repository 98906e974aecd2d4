// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HTTP SERVER - Formulário de pesquisa com SSE Streaming
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//!
//! Interface web da pesquisa.
//!
//! ## Endpoints
//!
//! - `GET /` - Página com o formulário
//! - `GET /health` - Health check
//! - `POST /api/research` - Pesquisa com SSE streaming ou JSON
//! - `POST /api/clarify` - Perguntas de esclarecimento
//!
//! ## Uso
//!
//! ```bash
//! SERVER_ADDR=0.0.0.0:7860 cargo run
//! ```

#[allow(missing_docs)]
pub mod types;
#[allow(missing_docs)]
pub mod handlers;
#[allow(missing_docs)]
pub mod sse;
mod page;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

pub use types::*;

use crate::orchestrator::ResearchManager;

/// Estado compartilhado entre todos os handlers
pub struct AppState {
    /// Orquestrador usado por todas as requisições
    pub manager: ResearchManager,
}

/// Monta o router com todas as rotas
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/research", post(handlers::research))
        .route("/api/clarify", post(handlers::clarify))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Inicia o servidor HTTP no endereço especificado.
pub async fn start_server(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("🌐 Deep Research UI listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
