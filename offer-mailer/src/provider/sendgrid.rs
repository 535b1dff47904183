//! SendGrid v3 `mail/send` transport.
//!
//! Click, open and subscription tracking are switched off so SendGrid does
//! not rewrite the offer HTML.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::{DeliveryProvider, Envelope, SendError};

/// Default SendGrid endpoint.
pub const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Longest provider error body kept in a status record.
const MAX_ERROR_BODY: usize = 500;

/// Delivery provider that posts to the SendGrid HTTP API.
#[derive(Clone)]
pub struct SendGridProvider {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl SendGridProvider {
    /// Create a provider. A missing or blank key makes every send fail with
    /// [`SendError::NotConfigured`].
    pub fn new(
        api_url: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SendError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Build the SendGrid JSON payload for an envelope.
pub fn build_payload(envelope: &Envelope) -> Value {
    let headers: Map<String, Value> = envelope
        .headers
        .iter()
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect();

    let mut payload = json!({
        "personalizations": [{ "to": [{ "email": envelope.to }] }],
        "from": { "email": envelope.from.email, "name": envelope.from.name },
        "subject": envelope.subject,
        "content": [{ "type": "text/html", "value": envelope.html }],
        "headers": headers,
        "tracking_settings": {
            "click_tracking": { "enable": false },
            "open_tracking": { "enable": false },
            "subscription_tracking": { "enable": false }
        },
        "mail_settings": {
            "sandbox_mode": { "enable": false },
            "bypass_list_management": { "enable": false }
        }
    });

    if let Some(reply_to) = &envelope.reply_to {
        payload["reply_to"] = json!({ "email": reply_to });
    }

    payload
}

#[async_trait]
impl DeliveryProvider for SendGridProvider {
    fn name(&self) -> &'static str {
        "sendgrid"
    }

    async fn send(&self, envelope: &Envelope) -> Result<(), SendError> {
        let api_key = self.api_key.as_deref().ok_or(SendError::NotConfigured)?;

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&build_payload(envelope))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!(
                to = %envelope.to,
                status_code = status.as_u16(),
                "sendgrid_accepted"
            );
            return Ok(());
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }

        warn!(
            to = %envelope.to,
            status_code = status.as_u16(),
            body = %body,
            "sendgrid_rejected"
        );

        Err(SendError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Sender;

    use axum::{
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use tokio::net::TcpListener;

    fn envelope() -> Envelope {
        Envelope {
            from: Sender {
                name: "ACME".to_string(),
                email: "offers@acme.test".to_string(),
                reply_to: Some("sales@acme.test".to_string()),
            },
            to: "a@x.com".to_string(),
            subject: "Offer".to_string(),
            html: "<p>Hi</p>".to_string(),
            reply_to: Some("sales@acme.test".to_string()),
            headers: vec![("Precedence".to_string(), "bulk".to_string())],
        }
    }

    /// Serve `app` on an ephemeral local port and return its mail/send URL.
    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/v3/mail/send", addr)
    }

    #[test]
    fn test_build_payload() {
        let payload = build_payload(&envelope());

        assert_eq!(payload["personalizations"][0]["to"][0]["email"], "a@x.com");
        assert_eq!(payload["from"]["email"], "offers@acme.test");
        assert_eq!(payload["from"]["name"], "ACME");
        assert_eq!(payload["reply_to"]["email"], "sales@acme.test");
        assert_eq!(payload["content"][0]["type"], "text/html");
        assert_eq!(payload["headers"]["Precedence"], "bulk");
        assert_eq!(payload["tracking_settings"]["click_tracking"]["enable"], false);
    }

    #[test]
    fn test_build_payload_without_reply_to() {
        let mut envelope = envelope();
        envelope.reply_to = None;
        assert!(build_payload(&envelope).get("reply_to").is_none());
    }

    #[tokio::test]
    async fn test_send_without_key_is_configuration_failure() {
        let provider =
            SendGridProvider::new(SENDGRID_API_URL.to_string(), Some("  ".to_string()), Duration::from_secs(1))
                .unwrap();
        assert!(!provider.is_configured());

        let err = provider.send(&envelope()).await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_send_accepted() {
        let app = Router::new().route(
            "/v3/mail/send",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if auth == "Bearer test-key" && body["subject"] == "Offer" {
                    StatusCode::ACCEPTED
                } else {
                    StatusCode::UNAUTHORIZED
                }
            }),
        );
        let url = serve(app).await;

        let provider =
            SendGridProvider::new(url, Some("test-key".to_string()), Duration::from_secs(5)).unwrap();
        provider.send(&envelope()).await.unwrap();
    }

    #[tokio::test]
    async fn test_send_rejected() {
        let app = Router::new().route(
            "/v3/mail/send",
            post(|| async { (StatusCode::BAD_REQUEST, "invalid from address") }),
        );
        let url = serve(app).await;

        let provider =
            SendGridProvider::new(url, Some("test-key".to_string()), Duration::from_secs(5)).unwrap();
        match provider.send(&envelope()).await {
            Err(SendError::Rejected { status, body }) => {
                assert_eq!(status, 400);
                assert_eq!(body, "invalid from address");
            }
            other => panic!("Expected Rejected, got {:?}", other),
        }
    }
}
