//! Paced, retrying dispatch queue.
//!
//! This module provides:
//! - The campaign queue and single dispatch loop (`Dispatcher`)
//! - Delivery attempts and their status bookkeeping
//! - The retry policy, retry queue and send pacing
//!
//! ## Flow
//!
//! ```text
//! enqueue() → campaign queue → Dispatch loop → Deliverer::attempt() → status tracker
//!                                   ↑                   │ (failed, below ceiling)
//!                                   └── retry queue ←───┘
//! ```

pub mod attempt;
pub mod dispatcher;
pub mod pacer;
pub mod retry;
pub mod status;
pub mod types;

pub use attempt::{Deliverer, MailIdentity};
pub use dispatcher::Dispatcher;
pub use pacer::{Pacer, Pacing, TokioPacer};
pub use retry::{should_retry, RetryPolicy, RetryQueue, DEFAULT_MAX_ATTEMPTS};
pub use status::StatusTracker;
pub use types::{Campaign, DeliveryStatus, RecipientAttempt, RetryItem, Status, StoredImage};
