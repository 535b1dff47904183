//! HTTP endpoint handlers.
//!
//! Submission handlers only validate and enqueue; delivery happens in the
//! background dispatch loop and is observed through the status endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dispatch::{Campaign, DeliveryStatus, Dispatcher, Pacing, StoredImage};
use crate::web::rate_limit::RateLimiter;
use crate::web::recipients::normalize_recipients;
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dispatcher: Dispatcher,
    pub limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: Config, dispatcher: Dispatcher) -> Self {
        let limiter = RateLimiter::new(config.rate_limit_per_minute);
        Self {
            config: Arc::new(config),
            dispatcher,
            limiter,
        }
    }
}

/// Failure body shared by all endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

fn error_response(status: StatusCode, error: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: error.to_string(),
        }),
    )
        .into_response()
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "offer-mailer",
    })
}

// =============================================================================
// Campaign submission
// =============================================================================

/// Offer submission sent by the UI.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOfferRequest {
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub cta: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub stored_images_data: Vec<StoredImage>,
}

/// Immediate acknowledgment of a submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOfferResponse {
    pub success: bool,
    pub message: &'static str,
    pub valid_emails: usize,
    pub total_emails: usize,
    pub estimated_time: String,
}

/// Rough time for the first pass over `recipients` at the intra-batch pace.
pub fn estimated_minutes(recipients: usize, pacing: Pacing) -> u64 {
    let per_recipient = u64::try_from(pacing.intra_batch.as_millis()).unwrap_or(u64::MAX);
    let recipients = u64::try_from(recipients).unwrap_or(u64::MAX);
    per_recipient.saturating_mul(recipients).div_ceil(60_000)
}

/// Campaign submission endpoint.
///
/// This endpoint:
/// 1. Applies the per-IP rate limit
/// 2. Filters the recipient list down to valid, unique addresses
/// 3. Enqueues the campaign and returns without waiting for delivery
pub async fn send_offer_emails(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(request): Json<SendOfferRequest>,
) -> Response {
    let client_ip = addr.ip();
    if !state.limiter.check(client_ip).await {
        return error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests. Please wait one minute.",
        );
    }

    let total = request.recipients.len();
    let recipients = normalize_recipients(&request.recipients);

    info!(
        client_ip = %client_ip,
        total_recipients = total,
        valid_recipients = recipients.len(),
        has_image_url = request.image_url.is_some(),
        stored_images = request.stored_images_data.len(),
        "send_offer_received"
    );

    if recipients.is_empty() {
        warn!(client_ip = %client_ip, "send_offer_no_valid_recipients");
        return error_response(StatusCode::BAD_REQUEST, "No valid email addresses found");
    }

    let campaign = Campaign {
        recipients,
        subject: request.subject,
        title: request.title,
        description: request.description,
        price: request.price,
        cta: request.cta,
        image_url: request.image_url,
        stored_images: request.stored_images_data,
    };

    if campaign.image_urls().is_empty() {
        warn!(client_ip = %client_ip, "send_offer_missing_image");
        return error_response(StatusCode::BAD_REQUEST, "Image URL is required");
    }

    let accepted = state.dispatcher.enqueue(campaign).await;
    let minutes = estimated_minutes(accepted, state.dispatcher.pacing());

    info!(
        client_ip = %client_ip,
        accepted = accepted,
        estimated_minutes = minutes,
        "send_offer_enqueued"
    );

    (
        StatusCode::OK,
        Json(SendOfferResponse {
            success: true,
            message: "Emails added to queue successfully",
            valid_emails: accepted,
            total_emails: total,
            estimated_time: format!("{} minutes", minutes),
        }),
    )
        .into_response()
}

// =============================================================================
// Status queries
// =============================================================================

/// Every tracked delivery status.
pub async fn email_statuses(State(state): State<AppState>) -> Json<Vec<DeliveryStatus>> {
    Json(state.dispatcher.get_all().await)
}

/// Delivery status of one address.
pub async fn email_status(State(state): State<AppState>, Path(email): Path<String>) -> Response {
    match state.dispatcher.get(email.trim()).await {
        Some(status) => Json(status).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Unknown email address"),
    }
}
