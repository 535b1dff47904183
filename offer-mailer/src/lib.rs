//! Offer Mailer - paced marketing-offer email dispatch.
//!
//! This library provides the modules behind the `offer-mailer` binary:
//! - `dispatch`: campaign queue, delivery attempts, retries and pacing
//! - `provider`: the delivery provider capability and its SendGrid transport
//! - `html`: the offer email template
//! - `web`: the HTTP API for submitting campaigns and reading statuses
//!
//! ## Architecture
//!
//! ```text
//! POST /send-offer-emails → Dispatcher::enqueue → dispatch loop → SendGrid
//!                                                      ↓
//!                     GET /email-status ←──── status tracker
//! ```

pub mod config;
pub mod dispatch;
pub mod html;
pub mod provider;
pub mod util;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use dispatch::{Campaign, DeliveryStatus, Dispatcher, Status};
pub use provider::{DeliveryProvider, SendError, SendGridProvider};
pub use web::AppState;
