// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CONFIGURAÇÃO DO PROCESSO
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Configuração lida uma única vez no start-up (variáveis de ambiente ou .env)
// e compartilhada por referência com cada componente.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::net::SocketAddr;
use std::time::Duration;

/// Limite superior absoluto para o tamanho do plano de buscas.
pub const MAX_SEARCHES_CAP: usize = 10;

/// Erros de configuração
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Variável obrigatória ausente
    #[error("missing required setting {0}")]
    Missing(&'static str),

    /// Valor presente mas inválido
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        /// Nome da variável
        var: &'static str,
        /// Valor lido
        value: String,
        /// Motivo da rejeição
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Configuração do serviço de LLM (planejamento, busca e escrita)
#[derive(Clone)]
pub struct LlmConfig {
    /// Chave da API (obrigatória)
    pub api_key: String,
    /// URL base da API, sem barra final
    pub base_url: String,
    /// Modelo para planner, writer e clarifier
    pub model: String,
    /// Modelo usado nas buscas web
    pub search_model: String,
    /// Timeout HTTP por chamada
    pub request_timeout: Duration,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("search_model", &self.search_model)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Limites da execução de pesquisa
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchConfig {
    /// Mínimo de buscas aceitas de um plano
    pub min_searches: usize,
    /// Máximo de buscas; excedentes são descartados
    pub max_searches: usize,
    /// Prazo de cada busca (None = sem prazo local)
    pub search_timeout: Option<Duration>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            min_searches: 3,
            max_searches: 5,
            search_timeout: Some(Duration::from_secs(90)),
        }
    }
}

/// Configuração do envio de e-mail.
///
/// Todos os campos são opcionais no start-up: a ausência só vira erro
/// quando o estágio de notificação precisa deles.
#[derive(Clone, Default)]
pub struct EmailConfig {
    /// Chave da API SendGrid
    pub api_key: Option<String>,
    /// URL base da API SendGrid
    pub base_url: String,
    /// Remetente verificado
    pub from: Option<String>,
    /// Destinatário fixo
    pub to: Option<String>,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

impl EmailConfig {
    /// Retorna (remetente, destinatário) ou o erro de configuração correspondente
    pub fn addresses(&self) -> Result<(&str, &str), ConfigError> {
        let from = self.from.as_deref().ok_or(ConfigError::Missing("EMAIL_FROM"))?;
        let to = self.to.as_deref().ok_or(ConfigError::Missing("EMAIL_TO"))?;
        Ok((from, to))
    }
}

/// Configuração do servidor HTTP da interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Endereço de escuta
    pub addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 7860)),
        }
    }
}

/// Configuração completa do processo
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// LLM
    pub llm: LlmConfig,
    /// Limites da pesquisa
    pub research: ResearchConfig,
    /// E-mail
    pub email: EmailConfig,
    /// Servidor
    pub server: ServerConfig,
}

/// Carrega a configuração a partir das variáveis de ambiente do processo.
///
/// Variáveis suportadas:
/// - `OPENAI_API_KEY` (obrigatória), `OPENAI_BASE_URL`, `LLM_MODEL`,
///   `LLM_SEARCH_MODEL`, `LLM_TIMEOUT_SECS`
/// - `RESEARCH_MIN_SEARCHES`, `RESEARCH_MAX_SEARCHES`, `RESEARCH_SEARCH_TIMEOUT_SECS`
/// - `SENDGRID_API_KEY`, `SENDGRID_BASE_URL`, `EMAIL_FROM`, `EMAIL_TO`
/// - `SERVER_ADDR`
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    load_app_config_with(|key| std::env::var(key).ok())
}

/// Carrega a configuração usando uma função de lookup arbitrária.
///
/// Valores vazios (ou só espaços) contam como ausentes.
pub fn load_app_config_with<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| {
        lookup(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    Ok(AppConfig {
        llm: load_llm_config(&get)?,
        research: load_research_config(&get)?,
        email: load_email_config(&get)?,
        server: load_server_config(&get)?,
    })
}

fn load_llm_config(get: &dyn Fn(&str) -> Option<String>) -> Result<LlmConfig, ConfigError> {
    let api_key = get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

    let base_url = match get("OPENAI_BASE_URL") {
        Some(raw) => parse_base_url("OPENAI_BASE_URL", &raw)?,
        None => "https://api.openai.com/v1".to_string(),
    };

    let model = get("LLM_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());
    let search_model = get("LLM_SEARCH_MODEL").unwrap_or_else(|| model.clone());
    let timeout_secs = parse_number("LLM_TIMEOUT_SECS", get("LLM_TIMEOUT_SECS"), 120)?;
    if timeout_secs == 0 {
        return Err(ConfigError::invalid("LLM_TIMEOUT_SECS", "0", "must be positive"));
    }

    log::info!("📦 LLM: model={}, search_model={}, base_url={}", model, search_model, base_url);

    Ok(LlmConfig {
        api_key,
        base_url,
        model,
        search_model,
        request_timeout: Duration::from_secs(timeout_secs as u64),
    })
}

fn load_research_config(
    get: &dyn Fn(&str) -> Option<String>,
) -> Result<ResearchConfig, ConfigError> {
    let defaults = ResearchConfig::default();

    let min = parse_number("RESEARCH_MIN_SEARCHES", get("RESEARCH_MIN_SEARCHES"), defaults.min_searches)?;
    let max = parse_number("RESEARCH_MAX_SEARCHES", get("RESEARCH_MAX_SEARCHES"), defaults.max_searches)?;

    if min == 0 {
        return Err(ConfigError::invalid("RESEARCH_MIN_SEARCHES", "0", "must be at least 1"));
    }
    if max > MAX_SEARCHES_CAP {
        return Err(ConfigError::invalid(
            "RESEARCH_MAX_SEARCHES",
            &max.to_string(),
            format!("must not exceed {}", MAX_SEARCHES_CAP),
        ));
    }
    if max < min {
        return Err(ConfigError::invalid(
            "RESEARCH_MAX_SEARCHES",
            &max.to_string(),
            format!("must be >= RESEARCH_MIN_SEARCHES ({})", min),
        ));
    }

    let timeout_secs = parse_number("RESEARCH_SEARCH_TIMEOUT_SECS", get("RESEARCH_SEARCH_TIMEOUT_SECS"), 90)?;
    let search_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs as u64));

    log::info!("📦 Pesquisa: {}-{} buscas, prazo {:?}", min, max, search_timeout);

    Ok(ResearchConfig {
        min_searches: min,
        max_searches: max,
        search_timeout,
    })
}

fn load_email_config(get: &dyn Fn(&str) -> Option<String>) -> Result<EmailConfig, ConfigError> {
    let base_url = match get("SENDGRID_BASE_URL") {
        Some(raw) => parse_base_url("SENDGRID_BASE_URL", &raw)?,
        None => "https://api.sendgrid.com".to_string(),
    };

    let from = get("EMAIL_FROM")
        .map(|v| validate_address("EMAIL_FROM", v))
        .transpose()?;
    let to = get("EMAIL_TO")
        .map(|v| validate_address("EMAIL_TO", v))
        .transpose()?;
    let api_key = get("SENDGRID_API_KEY");

    if api_key.is_none() || from.is_none() || to.is_none() {
        log::warn!("⚠️  E-mail incompleto (SENDGRID_API_KEY/EMAIL_FROM/EMAIL_TO): relatórios não serão enviados");
    } else {
        log::info!("📦 E-mail: {} → {}", from.as_deref().unwrap_or_default(), to.as_deref().unwrap_or_default());
    }

    Ok(EmailConfig {
        api_key,
        base_url,
        from,
        to,
    })
}

fn load_server_config(get: &dyn Fn(&str) -> Option<String>) -> Result<ServerConfig, ConfigError> {
    match get("SERVER_ADDR") {
        Some(raw) => raw
            .parse::<SocketAddr>()
            .map(|addr| ServerConfig { addr })
            .map_err(|e| ConfigError::invalid("SERVER_ADDR", &raw, e.to_string())),
        None => Ok(ServerConfig::default()),
    }
}

fn parse_number(var: &'static str, raw: Option<String>, default: usize) -> Result<usize, ConfigError> {
    match raw {
        Some(value) => value
            .parse::<usize>()
            .map_err(|e| ConfigError::invalid(var, &value, e.to_string())),
        None => Ok(default),
    }
}

fn parse_base_url(var: &'static str, raw: &str) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(raw).map_err(|e| ConfigError::invalid(var, raw, e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(var, raw, "scheme must be http or https"));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

/// Checagem mínima de endereço: `local@dominio.tld`, sem espaços.
pub fn is_email_address(address: &str) -> bool {
    matches!(address.split_once('@'), Some((local, domain)) if !local.is_empty() && domain.contains('.'))
        && !address.contains(char::is_whitespace)
}

fn validate_address(var: &'static str, value: String) -> Result<String, ConfigError> {
    if is_email_address(&value) {
        Ok(value)
    } else {
        Err(ConfigError::invalid(var, &value, "not an email address"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_openai_key_is_fatal() {
        let err = load_app_config_with(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("OPENAI_API_KEY"));
    }

    #[test]
    fn test_blank_openai_key_counts_as_missing() {
        let err = load_app_config_with(lookup(&[("OPENAI_API_KEY", "   ")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("OPENAI_API_KEY"));
    }

    #[test]
    fn test_email_address_check() {
        assert!(is_email_address("reports@example.com"));
        assert!(!is_email_address("reports@localhost"));
        assert!(!is_email_address("@example.com"));
        assert!(!is_email_address("a b@example.com"));
        assert!(!is_email_address("a\tb@example.com"));

        let err = load_app_config_with(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("EMAIL_TO", "reader\t@example.com"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "EMAIL_TO", .. }));
    }

    #[test]
    fn test_defaults() {
        let config = load_app_config_with(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.search_model, "gpt-4o-mini");
        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
        assert_eq!(config.llm.request_timeout, Duration::from_secs(120));
        assert_eq!(config.research, ResearchConfig::default());
        assert_eq!(config.server.addr.port(), 7860);
        assert!(config.email.api_key.is_none());
        assert_eq!(config.email.base_url, "https://api.sendgrid.com");
    }

    #[test]
    fn test_email_settings_are_optional_until_used() {
        let config = load_app_config_with(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.email.addresses(), Err(ConfigError::Missing("EMAIL_FROM")));

        let config = load_app_config_with(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("EMAIL_FROM", "reports@example.com"),
            ("EMAIL_TO", "me@example.org"),
        ]))
        .unwrap();
        assert_eq!(
            config.email.addresses(),
            Ok(("reports@example.com", "me@example.org"))
        );
    }

    #[test]
    fn test_invalid_email_address() {
        let err = load_app_config_with(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("EMAIL_TO", "not-an-address"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "EMAIL_TO", .. }));
    }

    #[test]
    fn test_search_bounds_validation() {
        let err = load_app_config_with(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("RESEARCH_MIN_SEARCHES", "4"),
            ("RESEARCH_MAX_SEARCHES", "2"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "RESEARCH_MAX_SEARCHES", .. }));

        let err = load_app_config_with(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("RESEARCH_MAX_SEARCHES", "50"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "RESEARCH_MAX_SEARCHES", .. }));

        let err = load_app_config_with(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("RESEARCH_MIN_SEARCHES", "three"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "RESEARCH_MIN_SEARCHES", .. }));
    }

    #[test]
    fn test_zero_search_timeout_disables_deadline() {
        let config = load_app_config_with(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("RESEARCH_SEARCH_TIMEOUT_SECS", "0"),
        ]))
        .unwrap();
        assert!(config.research.search_timeout.is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let config = load_app_config_with(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:8080/v1/"),
        ]))
        .unwrap();
        assert_eq!(config.llm.base_url, "http://localhost:8080/v1");

        let err = load_app_config_with(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "ftp://example.com"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "OPENAI_BASE_URL", .. }));
    }

    #[test]
    fn test_debug_redacts_keys() {
        let config = load_app_config_with(lookup(&[
            ("OPENAI_API_KEY", "sk-secret"),
            ("SENDGRID_API_KEY", "SG.secret"),
        ]))
        .unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-secret"));
        assert!(!rendered.contains("SG.secret"));
    }
}
