//! Value types shared by the dispatch queue.
//!
//! This module defines:
//! - `Campaign`: one submitted offer plus its ordered recipient list
//! - `DeliveryStatus`: the per-address record exposed to status queries
//! - `RecipientAttempt` / `RetryItem`: the units of work the loop consumes

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Campaign
// =============================================================================

/// An image previously uploaded and stored by the UI.
///
/// Only `url` is used when rendering; the remaining fields are carried
/// through so the UI can round-trip what it sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub upload_date: String,
    #[serde(default)]
    pub size: u64,
}

/// One submitted batch of offer content and the addresses it goes to.
///
/// A campaign is never mutated after it is enqueued; the dispatcher shares
/// it between the first pass and any retries through an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    /// Recipient addresses in send order
    pub recipients: Vec<String>,
    /// Email subject line
    pub subject: String,
    /// Headline rendered at the top of the offer
    pub title: String,
    /// Free-form body text; newlines become line breaks
    pub description: String,
    /// Price without VAT, rendered verbatim after a euro sign
    #[serde(default)]
    pub price: Option<String>,
    /// Call-to-action button label
    #[serde(default)]
    pub cta: Option<String>,
    /// Freshly uploaded image
    #[serde(default)]
    pub image_url: Option<String>,
    /// Images picked from the stored image library
    #[serde(default, rename = "storedImagesData")]
    pub stored_images: Vec<StoredImage>,
}

impl Campaign {
    /// All image URLs in display order: the uploaded image first, then stored ones.
    pub fn image_urls(&self) -> Vec<&str> {
        self.image_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .into_iter()
            .chain(self.stored_images.iter().map(|img| img.url.as_str()))
            .collect()
    }
}

// =============================================================================
// Delivery status
// =============================================================================

/// Delivery state of a single recipient address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Pending,
    Sending,
    Retrying,
    Sent,
    Failed,
}

/// Full status record for one address.
///
/// Records are always written whole; see [`StatusTracker::set`](super::StatusTracker::set).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStatus {
    pub email: String,
    pub status: Status,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_tried: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryStatus {
    /// Initial record written when a campaign is enqueued.
    pub fn pending(email: &str) -> Self {
        Self {
            email: email.to_string(),
            status: Status::Pending,
            attempts: 0,
            last_tried: None,
            error: None,
        }
    }

    /// Record for an attempt that is about to call the provider.
    pub fn in_flight(email: &str, attempt_number: u32) -> Self {
        let status = if attempt_number > 0 {
            Status::Retrying
        } else {
            Status::Sending
        };
        Self {
            email: email.to_string(),
            status,
            attempts: attempt_number + 1,
            last_tried: Some(Utc::now()),
            error: None,
        }
    }

    pub fn sent(email: &str, attempt_number: u32) -> Self {
        Self {
            email: email.to_string(),
            status: Status::Sent,
            attempts: attempt_number + 1,
            last_tried: Some(Utc::now()),
            error: None,
        }
    }

    pub fn failed(email: &str, attempt_number: u32, error: String) -> Self {
        Self {
            email: email.to_string(),
            status: Status::Failed,
            attempts: attempt_number + 1,
            last_tried: Some(Utc::now()),
            error: Some(error),
        }
    }
}

// =============================================================================
// Work items
// =============================================================================

/// One send of one recipient, consumed immediately by the delivery attempt.
#[derive(Debug, Clone)]
pub struct RecipientAttempt {
    pub campaign: Arc<Campaign>,
    pub recipient: String,
    /// Zero-based attempt number
    pub attempt_number: u32,
}

/// A failed send waiting in the retry queue.
#[derive(Debug, Clone)]
pub struct RetryItem {
    pub campaign: Arc<Campaign>,
    pub recipient: String,
    /// Attempts already made for this recipient
    pub attempts: u32,
}

impl RetryItem {
    /// The attempt this item turns into when the retry phase picks it up.
    pub fn into_attempt(self) -> RecipientAttempt {
        RecipientAttempt {
            campaign: self.campaign,
            recipient: self.recipient,
            attempt_number: self.attempts,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_campaign(recipients: &[&str]) -> Campaign {
    Campaign {
        recipients: recipients.iter().map(|r| r.to_string()).collect(),
        subject: "Spring offer".to_string(),
        title: "PVC windows".to_string(),
        description: "Double glazing\nFree measurement".to_string(),
        price: Some("120".to_string()),
        cta: Some("Contact us".to_string()),
        image_url: Some("https://img.example.com/a.jpg".to_string()),
        stored_images: Vec::new(),
    }
}
