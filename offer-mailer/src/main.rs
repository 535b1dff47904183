//! Offer Mailer - HTTP API and in-process dispatch loop.
//!
//! Campaigns submitted over HTTP are queued in memory and sent one
//! recipient at a time through SendGrid, with pacing delays between sends.
//! Queue state is not persisted; anything still queued at shutdown is lost.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use offermail::dispatch::TokioPacer;
use offermail::web::{router, AppState};
use offermail::{Config, DeliveryProvider, Dispatcher, SendGridProvider};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("offer_mailer_starting");

    // Load configuration from environment
    let config = Config::from_env();
    info!(
        port = config.port,
        company_name = %config.company_name,
        sender_email = %config.sender_email,
        reply_to = %config.reply_to(),
        intra_batch_delay_ms = config.intra_batch_delay_ms,
        inter_batch_delay_ms = config.inter_batch_delay_ms,
        max_attempts = config.max_attempts,
        rate_limit_per_minute = config.rate_limit_per_minute,
        "config_loaded"
    );

    let provider = SendGridProvider::new(
        config.sendgrid_api_url.clone(),
        config.sendgrid_api_key.clone(),
        Duration::from_millis(config.request_timeout_ms),
    )
    .context("Failed to create SendGrid client")?;

    if provider.is_configured() {
        info!(provider = provider.name(), "provider_ready");
    } else {
        error!(provider = provider.name(), "sendgrid_api_key_missing");
    }

    let dispatcher = Dispatcher::new(
        Arc::new(provider),
        Arc::new(config.template()),
        config.identity(),
        Arc::new(TokioPacer),
        config.pacing(),
        config.retry_policy(),
    );
    info!("dispatcher_created");

    let port = config.port;
    let app = router(AppState::new(config, dispatcher.clone()));

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    let (campaigns, retries) = dispatcher.backlog().await;
    if dispatcher.is_running() || campaigns > 0 || retries > 0 {
        warn!(
            queued_campaigns = campaigns,
            queued_retries = retries,
            "dispatch_work_abandoned"
        );
    }

    info!("offer_mailer_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("offer_mailer_shutting_down");
}
