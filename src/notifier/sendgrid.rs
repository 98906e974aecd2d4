// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SENDGRID TRANSPORT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// POST {base}/v3/mail/send com Bearer token.
// 202 = aceito; id da mensagem no header X-Message-Id.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{DeliveryError, DeliveryReceipt, EmailMessage, EmailTransport};

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Transporte via SendGrid v3 Web API
pub struct SendGridTransport {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl SendGridTransport {
    /// Cria o transporte com a chave e URL base
    pub fn new(api_key: String, base_url: String) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v3/mail/send", self.base_url)
    }
}

/// Corpo JSON do envio. A parte text/plain precisa vir antes da text/html.
fn build_body(message: &EmailMessage) -> serde_json::Value {
    json!({
        "personalizations": [{ "to": [{ "email": message.to }] }],
        "from": { "email": message.from },
        "subject": message.subject,
        "content": [
            { "type": "text/plain", "value": message.text_body },
            { "type": "text/html", "value": message.html_body }
        ]
    })
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ErrorItem {
    #[serde(default)]
    message: String,
    #[serde(default)]
    field: Option<String>,
}

/// Extrai as mensagens de erro do corpo de resposta do SendGrid.
fn describe_errors(body: &str) -> String {
    let messages: Vec<String> = serde_json::from_str::<ErrorBody>(body)
        .map(|parsed| {
            parsed
                .errors
                .into_iter()
                .filter(|e| !e.message.is_empty())
                .map(|e| match e.field {
                    Some(field) => format!("{} ({})", e.message, field),
                    None => e.message,
                })
                .collect()
        })
        .unwrap_or_default();

    if messages.is_empty() {
        body.chars().take(300).collect()
    } else {
        messages.join("; ")
    }
}

#[async_trait]
impl EmailTransport for SendGridTransport {
    async fn send(&self, message: &EmailMessage) -> Result<DeliveryReceipt, DeliveryError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&build_body(message))
            .send()
            .await
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let message_id = response
                .headers()
                .get("x-message-id")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            return Ok(DeliveryReceipt {
                status: status.as_u16(),
                message_id,
            });
        }

        match status.as_u16() {
            401 | 403 => Err(DeliveryError::AuthFailed),
            429 => Err(DeliveryError::RateLimited),
            code => {
                let body = response.text().await.unwrap_or_default();
                Err(DeliveryError::Rejected {
                    status: code,
                    message: describe_errors(&body),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> EmailMessage {
        EmailMessage {
            from: "reports@example.com".into(),
            to: "reader@example.com".into(),
            subject: "Report".into(),
            html_body: "<p>hi</p>".into(),
            text_body: "hi".into(),
        }
    }

    #[test]
    fn test_body_layout() {
        let body = build_body(&message());
        assert_eq!(body["personalizations"][0]["to"][0]["email"], "reader@example.com");
        assert_eq!(body["from"]["email"], "reports@example.com");
        assert_eq!(body["subject"], "Report");
        assert_eq!(body["content"][0]["type"], "text/plain");
        assert_eq!(body["content"][1]["type"], "text/html");
        assert_eq!(body["content"][1]["value"], "<p>hi</p>");
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let transport =
            tokio_test::assert_ok!(SendGridTransport::new("k".into(), "https://api.sendgrid.com/".into()));
        assert_eq!(transport.endpoint(), "https://api.sendgrid.com/v3/mail/send");
    }

    #[test]
    fn test_describe_errors() {
        let body = r#"{"errors":[{"message":"The from address does not match a verified Sender Identity.","field":"from"},{"message":"Bad subject"}]}"#;
        assert_eq!(
            describe_errors(body),
            "The from address does not match a verified Sender Identity. (from); Bad subject"
        );
        assert_eq!(describe_errors("plain failure"), "plain failure");
    }

    #[tokio::test]
    #[ignore = "requer SENDGRID_API_KEY, EMAIL_FROM e EMAIL_TO reais"]
    async fn test_real_send() {
        let _ = dotenvy::dotenv();
        let key = std::env::var("SENDGRID_API_KEY").unwrap();
        let mut msg = message();
        msg.from = std::env::var("EMAIL_FROM").unwrap();
        msg.to = std::env::var("EMAIL_TO").unwrap();

        let transport = SendGridTransport::new(key, "https://api.sendgrid.com".into()).unwrap();
        let receipt = transport.send(&msg).await.unwrap();
        assert_eq!(receipt.status, 202);
    }
}
