// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CLIENTE LLM
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Interface estreita para o serviço de raciocínio delegado:
// (instruções + entrada + formato esperado) → texto estruturado | falha.
// O provedor pode ser trocado sem tocar no orquestrador.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::types::TokenUsage;

/// Erros do cliente LLM
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limit exceeded")]
    RateLimitError,

    #[error("Invalid response format: {0}")]
    ParseError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Model returned no output")]
    EmptyResponse,

    #[error("Model refused the request: {0}")]
    Refused(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else if e.is_decode() {
            LlmError::ParseError(e.to_string())
        } else {
            LlmError::NetworkError(e.to_string())
        }
    }
}

/// Formato esperado da saída
#[derive(Debug, Clone, PartialEq)]
pub enum OutputShape {
    /// Texto livre
    Text,
    /// JSON validado por um JSON Schema (modo strict)
    Json {
        /// Nome do schema (identificador para o provedor)
        name: String,
        /// O schema em si
        schema: serde_json::Value,
    },
}

/// Uma chamada ao serviço de raciocínio
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Rótulo do estágio que fez a chamada (logs e mocks)
    pub label: &'static str,
    /// Instruções de sistema
    pub instructions: String,
    /// Entrada do usuário
    pub input: String,
    /// Formato esperado
    pub output: OutputShape,
    /// Se a chamada tem acesso a busca web ao vivo
    pub web_search: bool,
}

impl CompletionRequest {
    /// Cria uma chamada com saída em texto livre
    pub fn text(label: &'static str, instructions: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            label,
            instructions: instructions.into(),
            input: input.into(),
            output: OutputShape::Text,
            web_search: false,
        }
    }

    /// Exige saída JSON conforme o schema
    pub fn json_schema(mut self, name: impl Into<String>, schema: serde_json::Value) -> Self {
        self.output = OutputShape::Json {
            name: name.into(),
            schema,
        };
        self
    }

    /// Habilita a ferramenta de busca web
    pub fn with_web_search(mut self) -> Self {
        self.web_search = true;
        self
    }
}

/// Saída bruta de uma chamada
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

/// Trait principal para clientes LLM
///
/// Única capacidade usada pelos agentes. Implementações: OpenAI (Responses API)
/// e mock para testes.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Executa uma chamada e retorna o texto produzido
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;
}

/// Executa a chamada e desserializa a saída JSON em `T`.
pub async fn complete_json<T: DeserializeOwned>(
    client: &dyn LlmClient,
    request: &CompletionRequest,
) -> Result<(T, TokenUsage), LlmError> {
    let completion = client.complete(request).await?;
    let value = parse_json_output(&completion.text)?;
    Ok((value, completion.usage))
}

/// Desserializa JSON tolerando cercas de código markdown ao redor.
pub fn parse_json_output<T: DeserializeOwned>(raw: &str) -> Result<T, LlmError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LlmError::EmptyResponse);
    }

    let body = strip_code_fence(trimmed);
    serde_json::from_str(body).map_err(|e| LlmError::ParseError(e.to_string()))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Pula o identificador de linguagem ("json", "JSON", ...)
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO OPENAI (RESPONSES API)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Cliente para a OpenAI Responses API
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    model: String,
    search_model: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Cria um cliente com os padrões (gpt-4o-mini, api.openai.com)
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            search_model: "gpt-4o-mini".into(),
            client: reqwest::Client::new(),
        }
    }

    /// Cria um cliente a partir da configuração carregada no start-up.
    ///
    /// Falha se o cliente HTTP não puder ser montado com o timeout configurado.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            search_model: config.search_model.clone(),
            client,
        })
    }

    /// Troca o modelo principal
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.into();
        self
    }

    fn build_body<'a>(&'a self, request: &'a CompletionRequest) -> ResponsesRequest<'a> {
        let (model, tools, tool_choice) = if request.web_search {
            (
                self.search_model.as_str(),
                vec![serde_json::json!({
                    "type": "web_search_preview",
                    "search_context_size": "low",
                })],
                Some("required"),
            )
        } else {
            (self.model.as_str(), Vec::new(), None)
        };

        let text = match &request.output {
            OutputShape::Text => None,
            OutputShape::Json { name, schema } => Some(serde_json::json!({
                "format": {
                    "type": "json_schema",
                    "name": name,
                    "schema": schema,
                    "strict": true,
                }
            })),
        };

        ResponsesRequest {
            model,
            instructions: &request.instructions,
            input: &request.input,
            tools,
            tool_choice,
            text,
        }
    }
}

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    usage: Option<ResponsesUsage>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    item_type: String,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    part_type: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponsesUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

/// Junta os trechos `output_text` das mensagens do assistente.
fn extract_output(response: &ResponsesResponse) -> Result<Completion, LlmError> {
    if let Some(error) = &response.error {
        return Err(LlmError::ApiError {
            status: 200,
            message: error.message.clone(),
        });
    }

    let mut text = String::new();
    let mut refusal = None;
    for item in response.output.iter().filter(|i| i.item_type == "message") {
        for part in &item.content {
            match part.part_type.as_str() {
                "output_text" => text.push_str(part.text.as_deref().unwrap_or_default()),
                "refusal" => refusal = part.refusal.clone(),
                _ => {}
            }
        }
    }

    if text.trim().is_empty() {
        if let Some(reason) = refusal {
            return Err(LlmError::Refused(reason));
        }
        if response.status.as_deref() == Some("incomplete") {
            return Err(LlmError::ParseError("response incomplete".into()));
        }
        return Err(LlmError::EmptyResponse);
    }

    let usage = response
        .usage
        .as_ref()
        .map(|u| TokenUsage::new(u.input_tokens, u.output_tokens))
        .unwrap_or_default();

    Ok(Completion { text, usage })
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let body = self.build_body(request);
        log::debug!("[llm] {} → {} (web_search={})", request.label, body.model, request.web_search);

        let response = self
            .client
            .post(format!("{}/responses", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(LlmError::RateLimitError);
        }
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&raw)
                .map(|e| e.error.message)
                .unwrap_or(raw);
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ResponsesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        extract_output(&parsed)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO MOCK PARA TESTES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

type Responder = dyn Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync;
type DelayFn = dyn Fn(&CompletionRequest) -> Option<Duration> + Send + Sync;

/// Chamada registrada pelo mock
#[derive(Debug, Clone)]
pub struct MockCall {
    pub label: &'static str,
    pub input: String,
    /// `false` se a chamada foi cancelada antes de responder
    pub finished: bool,
}

/// Cliente mock com respostas roteirizadas.
///
/// O `responder` decide a saída de cada chamada (normalmente por `label`);
/// o atraso opcional simula latência de rede.
pub struct MockLlmClient {
    responder: Box<Responder>,
    delay: Option<Box<DelayFn>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockLlmClient {
    /// Cria um mock com o responder dado
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Atraso por chamada
    pub fn with_delay<F>(mut self, delay: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Option<Duration> + Send + Sync + 'static,
    {
        self.delay = Some(Box::new(delay));
        self
    }

    /// Todas as chamadas na ordem em que começaram
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Quantas chamadas com este rótulo começaram
    pub fn started(&self, label: &str) -> usize {
        self.calls().iter().filter(|c| c.label == label).count()
    }

    /// Quantas chamadas com este rótulo chegaram a responder
    pub fn finished(&self, label: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.label == label && c.finished)
            .count()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let index = {
            let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
            calls.push(MockCall {
                label: request.label,
                input: request.input.clone(),
                finished: false,
            });
            calls.len() - 1
        };

        if let Some(delay) = self.delay.as_ref().and_then(|f| f(request)) {
            tokio::time::sleep(delay).await;
        }

        let result = (self.responder)(request);

        if let Some(call) = self
            .calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(index)
        {
            call.finished = true;
        }

        result.map(|text| Completion {
            usage: TokenUsage::new(request.input.len() as u64 / 4, text.len() as u64 / 4),
            text,
        })
    }
}
