//! Web server module for campaign submission and status queries.
//!
//! Routes:
//! - `GET  /health`
//! - `POST /send-offer-emails`: validate and enqueue a campaign
//! - `GET  /email-status`: every tracked recipient
//! - `GET  /email-status/:email`: one recipient

pub mod handlers;
pub mod rate_limit;
pub mod recipients;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

pub use handlers::{
    email_status, email_statuses, health, send_offer_emails, AppState, ErrorResponse,
    HealthResponse, SendOfferRequest, SendOfferResponse,
};
pub use rate_limit::RateLimiter;
pub use recipients::{is_valid_email, normalize_recipients};

/// Origins allowed when none are configured.
const DEFAULT_ORIGINS: &[&str] = &["http://localhost:5173", "http://localhost:8080"];

/// Build the CORS layer from the configured origins.
pub fn cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let origins: Vec<HeaderValue> = match origins {
        Some(list) if !list.is_empty() => list
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "cors_origin_invalid");
                    None
                }
            })
            .collect(),
        _ => DEFAULT_ORIGINS
            .iter()
            .copied()
            .map(HeaderValue::from_static)
            .collect(),
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_allowed_origins.as_deref());

    Router::new()
        .route("/health", get(health))
        .route("/send-offer-emails", post(send_offer_emails))
        .route("/email-status", get(email_statuses))
        .route("/email-status/:email", get(email_status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    use super::*;
    use crate::dispatch::{Campaign, Dispatcher, Pacer, Pacing, RetryPolicy};
    use crate::html::Renderer;
    use crate::provider::{DeliveryProvider, Envelope, SendError, SENDGRID_API_URL};
    use crate::Config;

    struct AcceptAll;

    #[async_trait]
    impl DeliveryProvider for AcceptAll {
        fn name(&self) -> &'static str {
            "accept-all"
        }

        async fn send(&self, _envelope: &Envelope) -> Result<(), SendError> {
            Ok(())
        }
    }

    struct NoDelay;

    #[async_trait]
    impl Pacer for NoDelay {
        async fn wait(&self, _duration: Duration) {}
    }

    struct Plain;

    impl Renderer for Plain {
        fn render(&self, campaign: &Campaign, _recipient: &str) -> String {
            campaign.description.clone()
        }
    }

    fn config() -> Config {
        Config {
            port: 0,
            sendgrid_api_key: None,
            sendgrid_api_url: SENDGRID_API_URL.to_string(),
            request_timeout_ms: 1000,
            company_name: "ACME".to_string(),
            sender_email: "offers@acme.test".to_string(),
            reply_to: None,
            contact_url: "https://acme.test/contact".to_string(),
            unsubscribe_base_url: "https://acme.test/unsubscribe".to_string(),
            list_id: "offers.acme.test".to_string(),
            intra_batch_delay_ms: 30_000,
            inter_batch_delay_ms: 60_000,
            max_attempts: 3,
            rate_limit_per_minute: 2,
            cors_allowed_origins: None,
        }
    }

    /// Serve the full router on an ephemeral port and return its base URL.
    async fn spawn_app() -> (String, Dispatcher) {
        let config = config();
        let dispatcher = Dispatcher::new(
            Arc::new(AcceptAll),
            Arc::new(Plain),
            config.identity(),
            Arc::new(NoDelay),
            Pacing::from_millis(30_000, 60_000),
            RetryPolicy::default(),
        );
        let app = router(AppState::new(config, dispatcher.clone()));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        (format!("http://{}", addr), dispatcher)
    }

    fn offer(recipients: Value) -> Value {
        json!({
            "recipients": recipients,
            "subject": "Offer",
            "title": "Windows",
            "description": "Double glazing",
            "price": "120",
            "imageUrl": "https://img.example.com/a.jpg"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (base, _) = spawn_app().await;
        let body: Value = reqwest::get(format!("{}/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_submit_and_query_status() {
        let (base, dispatcher) = spawn_app().await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/send-offer-emails", base))
            .json(&offer(json!(["a@x.com", "not-an-email", "b@x.com"])))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["validEmails"], 2);
        assert_eq!(body["totalEmails"], 3);
        assert_eq!(body["estimatedTime"], "1 minutes");

        dispatcher.wait_idle().await;

        let status: Value = client
            .get(format!("{}/email-status/a@x.com", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(status["status"], "SENT");
        assert_eq!(status["attempts"], 1);

        let all: Value = client
            .get(format!("{}/email-status", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(all.as_array().unwrap().len(), 2);

        let missing = client
            .get(format!("{}/email-status/nobody@x.com", base))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), 404);
    }

    #[tokio::test]
    async fn test_submit_rejections_and_rate_limit() {
        let (base, _) = spawn_app().await;
        let client = reqwest::Client::new();
        let url = format!("{}/send-offer-emails", base);

        let response = client
            .post(&url)
            .json(&offer(json!(["broken", "also broken"])))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["success"], false);

        let mut no_image = offer(json!(["a@x.com"]));
        no_image["imageUrl"] = Value::Null;
        let response = client.post(&url).json(&no_image).send().await.unwrap();
        assert_eq!(response.status(), 400);

        // The limit is 2 per minute and both requests above counted
        let response = client
            .post(&url)
            .json(&offer(json!(["a@x.com"])))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 429);
    }

    #[test]
    fn test_cors_layer_skips_invalid_origins() {
        let origins = vec!["http://ok.test".to_string(), "bad\norigin".to_string()];
        // Building the layer must not panic on an invalid header value
        let _ = cors_layer(Some(&origins));
        let _ = cors_layer(None);
    }
}
