//! Delivery provider capability.
//!
//! The dispatcher hands a fully composed [`Envelope`] to a single injected
//! [`DeliveryProvider`]. Which transport sits behind it is decided once at
//! start-up; delivery code never branches on it.
//!
//! ```text
//! Campaign + recipient → Renderer → Envelope → DeliveryProvider::send()
//! ```

pub mod sendgrid;

use async_trait::async_trait;
use thiserror::Error;

pub use sendgrid::{SendGridProvider, SENDGRID_API_URL};

/// Errors reported by a delivery provider.
///
/// The dispatcher treats every variant as a failed attempt; the distinction
/// only matters for logging.
#[derive(Debug, Error)]
pub enum SendError {
    /// No credentials are available, so nothing can be sent
    #[error("SendGrid API key not configured - email sending disabled for safety")]
    NotConfigured,

    /// The request never produced a response
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("provider rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl SendError {
    /// True for failures that no retry can fix.
    pub fn is_configuration(&self) -> bool {
        matches!(self, SendError::NotConfigured)
    }
}

/// Identity offers are sent from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    /// Display name, usually the company name
    pub name: String,
    /// Sending address
    pub email: String,
    /// Address replies go to
    pub reply_to: Option<String>,
}

/// A fully composed message ready for the provider.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub from: Sender,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub reply_to: Option<String>,
    pub headers: Vec<(String, String)>,
}

/// External transport that delivers one envelope.
///
/// Implementations are not assumed to be idempotent.
#[async_trait]
pub trait DeliveryProvider: Send + Sync {
    /// Short transport name used in logs.
    fn name(&self) -> &'static str;

    async fn send(&self, envelope: &Envelope) -> Result<(), SendError>;
}
