// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// NOTIFIER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Último estágio da execução: converte o relatório markdown em e-mail
// (HTML + texto puro) e entrega via `EmailTransport` para o destinatário
// fixo da configuração.
//
// A entrega é best-effort: o orquestrador registra a falha como warning
// e a execução termina em Done mesmo assim.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod markdown;
mod sendgrid;

pub use sendgrid::SendGridTransport;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::{is_email_address, ConfigError, EmailConfig};
use crate::types::ResearchQuery;
use crate::utils::ActionTimer;

/// Tamanho máximo do assunto, em caracteres
pub const MAX_SUBJECT_CHARS: usize = 80;

/// Erros de entrega
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Email not configured: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Email provider rejected the credentials")]
    AuthFailed,

    #[error("Email provider rate limit exceeded")]
    RateLimited,

    #[error("Email provider rejected the message ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),
}

/// Mensagem pronta para envio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    /// Documento HTML completo
    pub html_body: String,
    /// Alternativa text/plain
    pub text_body: String,
}

/// Confirmação do provedor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReceipt {
    /// Status HTTP devolvido pelo provedor
    pub status: u16,
    /// Id atribuído pelo provedor, se informado
    pub message_id: Option<String>,
}

/// Capacidade externa de envio de e-mail
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Entrega a mensagem e retorna a confirmação do provedor
    async fn send(&self, message: &EmailMessage) -> Result<DeliveryReceipt, DeliveryError>;
}

/// Agente de notificação por e-mail
pub struct Notifier {
    config: EmailConfig,
    transport: Option<Arc<dyn EmailTransport>>,
}

impl Notifier {
    /// Cria o notifier com transporte SendGrid, se houver chave configurada.
    ///
    /// Sem chave o notifier é criado mesmo assim; o erro aparece no envio.
    pub fn from_config(config: EmailConfig) -> Result<Self, DeliveryError> {
        let transport = config
            .api_key
            .as_ref()
            .map(|key| SendGridTransport::new(key.clone(), config.base_url.clone()))
            .transpose()?
            .map(|t| Arc::new(t) as Arc<dyn EmailTransport>);
        Ok(Self { config, transport })
    }

    /// Cria o notifier com um transporte explícito
    pub fn with_transport(config: EmailConfig, transport: Arc<dyn EmailTransport>) -> Self {
        Self {
            config,
            transport: Some(transport),
        }
    }

    /// Envia o relatório para o destinatário configurado.
    pub async fn notify(
        &self,
        report_markdown: &str,
        query: &ResearchQuery,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let transport = self
            .transport
            .as_ref()
            .ok_or(ConfigError::Missing("SENDGRID_API_KEY"))?;
        let (from, to) = self.config.addresses()?;

        let message = compose_message(from, to, report_markdown, query.text())?;
        log::info!("📧 Notifier: enviando '{}' para {}", message.subject, message.to);

        let timer = ActionTimer::start("Envio de e-mail");
        let result = transport.send(&message).await;
        timer.stop_and_log();

        match &result {
            Ok(receipt) => log::info!(
                "📧 Notifier: entregue (status {}, id {:?})",
                receipt.status,
                receipt.message_id
            ),
            Err(e) => log::warn!("⚠️ Notifier: falha na entrega: {}", e),
        }
        result
    }
}

/// Monta a mensagem: assunto, HTML completo e alternativa em texto puro.
pub fn compose_message(
    from: &str,
    to: &str,
    report_markdown: &str,
    query: &str,
) -> Result<EmailMessage, DeliveryError> {
    for address in [from, to] {
        if !is_email_address(address) {
            return Err(DeliveryError::InvalidAddress(address.to_string()));
        }
    }

    let subject = derive_subject(report_markdown, query);
    let fragment = markdown::render_markdown(report_markdown);

    Ok(EmailMessage {
        from: from.to_string(),
        to: to.to_string(),
        text_body: markdown::html_to_text(&fragment),
        html_body: markdown::wrap_document(&subject, &fragment),
        subject,
    })
}

/// Primeiro título de nível 1 do relatório, ou "Research report: <query>".
pub fn derive_subject(report_markdown: &str, query: &str) -> String {
    let heading = report_markdown
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().trim_end_matches('#').trim().replace(['*', '`'], ""))
        .filter(|title| !title.is_empty());

    let subject = heading.unwrap_or_else(|| format!("Research report: {}", query.trim()));
    subject.chars().take(MAX_SUBJECT_CHARS).collect::<String>().trim().to_string()
}
