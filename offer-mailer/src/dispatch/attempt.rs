//! A single delivery attempt for one recipient.
//!
//! Each attempt:
//! 1. Marks the recipient `SENDING` (or `RETRYING`)
//! 2. Renders the body and hands the envelope to the provider
//! 3. Records `SENT` or `FAILED` and decides whether a retry is due

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::html::Renderer;
use crate::provider::{DeliveryProvider, Envelope, Sender};
use crate::util::headers::{build_headers, unsubscribe_url};

use super::retry::RetryPolicy;
use super::status::StatusTracker;
use super::types::{DeliveryStatus, RecipientAttempt, RetryItem};

/// Sender-side settings stamped onto every envelope.
#[derive(Debug, Clone)]
pub struct MailIdentity {
    pub sender: Sender,
    /// Value of the `List-ID` header
    pub list_id: String,
    /// Base of the per-recipient unsubscribe link
    pub unsubscribe_base_url: String,
}

/// Runs delivery attempts and records their outcome.
#[derive(Clone)]
pub struct Deliverer {
    provider: Arc<dyn DeliveryProvider>,
    renderer: Arc<dyn Renderer>,
    identity: MailIdentity,
    policy: RetryPolicy,
    statuses: StatusTracker,
}

impl Deliverer {
    pub fn new(
        provider: Arc<dyn DeliveryProvider>,
        renderer: Arc<dyn Renderer>,
        identity: MailIdentity,
        policy: RetryPolicy,
        statuses: StatusTracker,
    ) -> Self {
        Self {
            provider,
            renderer,
            identity,
            policy,
            statuses,
        }
    }

    /// Compose the envelope for one recipient.
    pub fn envelope(&self, attempt: &RecipientAttempt) -> Envelope {
        let campaign = &attempt.campaign;
        let recipient = attempt.recipient.as_str();
        let unsubscribe = unsubscribe_url(&self.identity.unsubscribe_base_url, recipient);
        let sender = &self.identity.sender;

        Envelope {
            from: sender.clone(),
            to: recipient.to_string(),
            subject: campaign.subject.clone(),
            html: self.renderer.render(campaign, recipient),
            reply_to: sender.reply_to.clone(),
            headers: build_headers(&sender.email, &self.identity.list_id, &unsubscribe),
        }
    }

    /// Send once and record the outcome.
    ///
    /// Never fails: provider errors end up in the status record. Returns the
    /// retry item to queue when the policy allows another attempt.
    pub async fn attempt(&self, attempt: RecipientAttempt) -> Option<RetryItem> {
        let recipient = attempt.recipient.as_str();
        let attempt_number = attempt.attempt_number;
        let max_attempts = self.policy.max_attempts;

        self.statuses
            .set(recipient, DeliveryStatus::in_flight(recipient, attempt_number))
            .await;

        info!(
            recipient = %recipient,
            attempt = attempt_number + 1,
            max_attempts = max_attempts,
            provider = self.provider.name(),
            "delivery_attempt_started"
        );

        let envelope = self.envelope(&attempt);

        match self.provider.send(&envelope).await {
            Ok(()) => {
                self.statuses
                    .set(recipient, DeliveryStatus::sent(recipient, attempt_number))
                    .await;

                info!(
                    recipient = %recipient,
                    attempt = attempt_number + 1,
                    "delivery_attempt_sent"
                );
                None
            }
            Err(e) => {
                let configuration_error = e.is_configuration();
                self.record_failure(attempt, e.to_string(), configuration_error)
                    .await
            }
        }
    }

    /// Run [`attempt`](Self::attempt) on its own task.
    ///
    /// A renderer or provider that panics is recorded as a failed attempt
    /// and goes through the same retry decision as a provider error.
    pub async fn attempt_isolated(&self, attempt: RecipientAttempt) -> Option<RetryItem> {
        let fallback = attempt.clone();
        let deliverer = self.clone();

        match tokio::spawn(async move { deliverer.attempt(attempt).await }).await {
            Ok(retry) => retry,
            Err(e) => {
                let message = if e.is_panic() {
                    "delivery attempt panicked"
                } else {
                    "delivery attempt cancelled"
                };
                error!(
                    recipient = %fallback.recipient,
                    attempt = fallback.attempt_number + 1,
                    error = %e,
                    "delivery_attempt_aborted"
                );
                self.record_failure(fallback, message.to_string(), false)
                    .await
            }
        }
    }

    async fn record_failure(
        &self,
        attempt: RecipientAttempt,
        message: String,
        configuration_error: bool,
    ) -> Option<RetryItem> {
        let recipient = attempt.recipient.as_str();
        let attempt_number = attempt.attempt_number;
        let max_attempts = self.policy.max_attempts;

        self.statuses
            .set(
                recipient,
                DeliveryStatus::failed(recipient, attempt_number, message.clone()),
            )
            .await;

        warn!(
            recipient = %recipient,
            attempt = attempt_number + 1,
            max_attempts = max_attempts,
            configuration_error = configuration_error,
            error = %message,
            "delivery_attempt_failed"
        );

        if self.policy.should_retry(attempt_number) {
            info!(
                recipient = %recipient,
                next_attempt = attempt_number + 2,
                max_attempts = max_attempts,
                "delivery_retry_queued"
            );
            Some(RetryItem {
                campaign: attempt.campaign,
                recipient: attempt.recipient,
                attempts: attempt_number + 1,
            })
        } else {
            error!(
                recipient = %recipient,
                attempts = attempt_number + 1,
                "delivery_gave_up"
            );
            None
        }
    }
}
