//! Configuration module for environment variable parsing.
//!
//! Everything is read once at start-up. Missing or malformed values fall
//! back to defaults; malformed ones are logged.

use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::dispatch::{MailIdentity, Pacing, RetryPolicy, DEFAULT_MAX_ATTEMPTS};
use crate::html::OfferTemplate;
use crate::provider::{Sender, SENDGRID_API_URL};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    // =========================================================================
    // Delivery provider
    // =========================================================================
    /// SendGrid API key; sending is disabled without it
    pub sendgrid_api_key: Option<String>,

    /// SendGrid mail/send endpoint
    pub sendgrid_api_url: String,

    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,

    // =========================================================================
    // Sender identity and template
    // =========================================================================
    /// Display name used in the From header and the template footer
    pub company_name: String,

    /// Sending address
    pub sender_email: String,

    /// Reply-To address (falls back to the sender address)
    pub reply_to: Option<String>,

    /// Target of the call-to-action button
    pub contact_url: String,

    /// Base URL of the unsubscribe page
    pub unsubscribe_base_url: String,

    /// Value of the List-ID header
    pub list_id: String,

    // =========================================================================
    // Dispatch pacing
    // =========================================================================
    /// Delay between recipients of the same campaign
    pub intra_batch_delay_ms: u64,

    /// Delay after a campaign and between retried sends
    pub inter_batch_delay_ms: u64,

    /// Total attempts per recipient, including the first
    pub max_attempts: u32,

    // =========================================================================
    // Web surface
    // =========================================================================
    /// Submissions allowed per client IP per minute
    pub rate_limit_per_minute: u32,

    /// Optional list of origins allowed by CORS
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let sender_email =
            env::var("COMPANY_SENDER_EMAIL").unwrap_or_else(|_| "noreply@localhost".to_string());

        Config {
            port: parse_or("PORT", 10000),

            sendgrid_api_key: env::var("SENDGRID_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),

            sendgrid_api_url: env::var("SENDGRID_API_URL")
                .unwrap_or_else(|_| SENDGRID_API_URL.to_string()),

            request_timeout_ms: parse_or("REQUEST_TIMEOUT_MS", 15000),

            company_name: env::var("COMPANY_NAME")
                .unwrap_or_else(|_| "AKROGONOS INTERNATIONAL GROUP".to_string()),

            reply_to: env::var("COMPANY_REPLY_TO").ok(),

            sender_email,

            contact_url: env::var("CONTACT_URL")
                .unwrap_or_else(|_| "https://example.com/contact".to_string()),

            unsubscribe_base_url: env::var("UNSUBSCRIBE_BASE_URL")
                .unwrap_or_else(|_| "https://example.com/unsubscribe".to_string()),

            list_id: env::var("LIST_ID").unwrap_or_else(|_| "offers.example.com".to_string()),

            intra_batch_delay_ms: parse_or("INTRA_BATCH_DELAY_MS", 30_000),

            inter_batch_delay_ms: parse_or("INTER_BATCH_DELAY_MS", 60_000),

            max_attempts: parse_or("MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS).max(1),

            rate_limit_per_minute: parse_or("RATE_LIMIT_PER_MINUTE", 3),

            cors_allowed_origins: parse_csv("CORS_ALLOWED_ORIGINS"),
        }
    }

    /// Reply-To address, defaulting to the sender address.
    pub fn reply_to(&self) -> &str {
        self.reply_to.as_deref().unwrap_or(&self.sender_email)
    }

    pub fn sender(&self) -> Sender {
        Sender {
            name: self.company_name.clone(),
            email: self.sender_email.clone(),
            reply_to: Some(self.reply_to().to_string()),
        }
    }

    pub fn identity(&self) -> MailIdentity {
        MailIdentity {
            sender: self.sender(),
            list_id: self.list_id.clone(),
            unsubscribe_base_url: self.unsubscribe_base_url.clone(),
        }
    }

    pub fn template(&self) -> OfferTemplate {
        OfferTemplate {
            company_name: self.company_name.clone(),
            reply_to: self.reply_to().to_string(),
            contact_url: self.contact_url.clone(),
            unsubscribe_base_url: self.unsubscribe_base_url.clone(),
        }
    }

    pub fn pacing(&self) -> Pacing {
        Pacing::from_millis(self.intra_batch_delay_ms, self.inter_batch_delay_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts)
    }
}

/// Parse an environment variable, falling back to `default` when it is
/// missing or invalid.
fn parse_or<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(env_var = name, value = %raw, "Invalid value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// Parse a comma-separated list of strings.
fn parse_csv(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}
