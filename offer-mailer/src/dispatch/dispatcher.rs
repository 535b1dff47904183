//! Campaign queue and the single dispatch loop.
//!
//! The loop:
//! 1. Drains the campaign queue, one recipient at a time, with the
//!    intra-batch delay between recipients
//! 2. Drains the retry queue, with the inter-batch delay between items
//! 3. Goes idle only when both queues are empty under the same lock
//!
//! Each attempt runs on its own task, so a panicking renderer or provider
//! costs that attempt only and the loop keeps its Running flag honest.
//!
//! `enqueue` is the only way in. It never touches the network; it records
//! `PENDING` statuses, appends, and starts the loop if it is idle.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use crate::html::Renderer;
use crate::provider::DeliveryProvider;

use super::attempt::{Deliverer, MailIdentity};
use super::pacer::{Pacer, Pacing};
use super::retry::{RetryPolicy, RetryQueue};
use super::status::StatusTracker;
use super::types::{Campaign, DeliveryStatus, RecipientAttempt, RetryItem};

/// Handle to the process-wide dispatch queue.
///
/// Construct one at start-up and clone the handle wherever campaigns are
/// submitted or statuses are read.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    queues: Mutex<Queues>,
    statuses: StatusTracker,
    deliverer: Deliverer,
    pacer: Arc<dyn Pacer>,
    pacing: Pacing,
    policy: RetryPolicy,
    running: watch::Sender<bool>,
}

#[derive(Default)]
struct Queues {
    campaigns: VecDeque<Arc<Campaign>>,
    retries: RetryQueue,
    running: bool,
}

impl Queues {
    fn has_work(&self) -> bool {
        !self.campaigns.is_empty() || !self.retries.is_empty()
    }
}

impl Dispatcher {
    pub fn new(
        provider: Arc<dyn DeliveryProvider>,
        renderer: Arc<dyn Renderer>,
        identity: MailIdentity,
        pacer: Arc<dyn Pacer>,
        pacing: Pacing,
        policy: RetryPolicy,
    ) -> Self {
        let statuses = StatusTracker::new();
        let deliverer = Deliverer::new(provider, renderer, identity, policy, statuses.clone());
        let (running, _) = watch::channel(false);

        Self {
            inner: Arc::new(DispatcherInner {
                queues: Mutex::new(Queues::default()),
                statuses,
                deliverer,
                pacer,
                pacing,
                policy,
                running,
            }),
        }
    }

    /// Accept a campaign for delivery and return how many recipients it has.
    ///
    /// Every recipient is reset to `PENDING` before this returns. Must be
    /// called from within a tokio runtime.
    pub async fn enqueue(&self, campaign: Campaign) -> usize {
        let campaign = Arc::new(campaign);
        let recipients = campaign.recipients.len();

        self.inner.statuses.reset_pending(&campaign.recipients).await;

        let start = {
            let mut queues = self.inner.queues.lock().await;
            queues.campaigns.push_back(campaign);
            let start = !queues.running;
            if start {
                queues.running = true;
                self.inner.running.send_replace(true);
            }
            info!(
                recipients = recipients,
                queued_campaigns = queues.campaigns.len(),
                loop_started = start,
                "dispatch_campaign_enqueued"
            );
            start
        };

        if start {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move { inner.run().await });
        }

        recipients
    }

    /// Latest status for one address.
    pub async fn get(&self, address: &str) -> Option<DeliveryStatus> {
        self.inner.statuses.get(address).await
    }

    /// Snapshot of every tracked address.
    pub async fn get_all(&self) -> Vec<DeliveryStatus> {
        self.inner.statuses.get_all().await
    }

    pub fn is_running(&self) -> bool {
        *self.inner.running.borrow()
    }

    /// Queued campaigns and retry items not yet picked up by the loop.
    pub async fn backlog(&self) -> (usize, usize) {
        let queues = self.inner.queues.lock().await;
        (queues.campaigns.len(), queues.retries.len())
    }

    /// Resolve once the loop is idle.
    pub async fn wait_idle(&self) {
        let mut running = self.inner.running.subscribe();
        // The sender lives as long as `self`, so this cannot observe a close.
        let _ = running.wait_for(|running| !*running).await;
    }

    pub fn pacing(&self) -> Pacing {
        self.inner.pacing
    }
}

impl DispatcherInner {
    async fn run(self: Arc<Self>) {
        info!("dispatch_loop_started");

        loop {
            while let Some(campaign) = self.next_campaign().await {
                self.send_campaign(&campaign).await;

                if self.has_work().await {
                    self.pacer.wait(self.pacing.inter_batch).await;
                }
            }

            while let Some(item) = self.next_retry().await {
                if self.policy.is_exhausted(item.attempts) {
                    warn!(
                        recipient = %item.recipient,
                        attempts = item.attempts,
                        "dispatch_retry_skipped_exhausted"
                    );
                    continue;
                }

                info!(
                    recipient = %item.recipient,
                    attempt = item.attempts + 1,
                    max_attempts = self.policy.max_attempts,
                    "dispatch_retry_started"
                );

                let retry = self.deliverer.attempt_isolated(item.into_attempt()).await;
                if let Some(retry) = retry {
                    self.push_retry(retry).await;
                }

                if self.has_work().await {
                    self.pacer.wait(self.pacing.inter_batch).await;
                }
            }

            if self.try_idle().await {
                break;
            }
        }

        info!("dispatch_loop_idle");
    }

    async fn send_campaign(&self, campaign: &Arc<Campaign>) {
        let total = campaign.recipients.len();
        info!(
            recipients = total,
            subject = %campaign.subject,
            "dispatch_campaign_started"
        );

        for (index, recipient) in campaign.recipients.iter().enumerate() {
            let attempt = RecipientAttempt {
                campaign: Arc::clone(campaign),
                recipient: recipient.clone(),
                attempt_number: 0,
            };

            if let Some(retry) = self.deliverer.attempt_isolated(attempt).await {
                self.push_retry(retry).await;
            }

            if index + 1 < total {
                self.pacer.wait(self.pacing.intra_batch).await;
            }
        }

        info!(recipients = total, "dispatch_campaign_finished");
    }

    async fn next_campaign(&self) -> Option<Arc<Campaign>> {
        self.queues.lock().await.campaigns.pop_front()
    }

    async fn next_retry(&self) -> Option<RetryItem> {
        self.queues.lock().await.retries.pop()
    }

    async fn push_retry(&self, item: RetryItem) {
        self.queues.lock().await.retries.push(item);
    }

    async fn has_work(&self) -> bool {
        self.queues.lock().await.has_work()
    }

    /// Go idle if both queues are empty; otherwise keep running.
    async fn try_idle(&self) -> bool {
        let mut queues = self.queues.lock().await;
        if queues.has_work() {
            return false;
        }
        queues.running = false;
        self.running.send_replace(false);
        true
    }
}
