//! Room mirror binary: reads transport signals as JSON lines on stdin and feeds
//! them to a single room session.

use std::sync::Arc;

use anyhow::Context;
use room_mirror::{
    config::AppConfig,
    dto::frame::TransportSignal,
    services::actions::{LoggingActions, ServiceHandles},
    state::{RoomSession, SharedSession},
};
use serde_json::{Value, json};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tokio_stream::{StreamExt, wrappers::LinesStream};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Arc::new(AppConfig::load());
    let services = build_services(&config).context("building room services")?;
    info!(room = %config.room_uuid, bot = %config.bot_user_uuid, "starting room mirror");

    tokio::select! {
        result = run(config, services) => result,
        _ = shutdown_signal() => {
            info!("shutdown requested");
            Ok(())
        }
    }
}

/// Pump stdin signals into the session until the input closes.
///
/// The session is created from the first `reconnect` snapshot; any other first
/// signal starts the session from an empty document.
async fn run(config: Arc<AppConfig>, services: ServiceHandles) -> anyhow::Result<()> {
    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    let mut session: Option<SharedSession> = None;

    while let Some(line) = lines.next().await {
        let line = line.context("reading transport input")?;
        if line.trim().is_empty() {
            continue;
        }
        let signal = match TransportSignal::from_json_str(&line) {
            Ok(signal) => signal,
            Err(err) => {
                warn!(error = %err, "skipping undecodable transport signal");
                continue;
            }
        };

        if let Some(session) = &session {
            session.handle_signal(signal);
            continue;
        }
        let opened = match signal {
            TransportSignal::Reconnect { state } => open_session(&config, &services, state),
            signal => {
                let opened = open_session(&config, &services, json!({}));
                opened.handle_signal(signal);
                opened
            }
        };
        session = Some(opened);
    }

    info!("transport input closed");
    Ok(())
}

fn open_session(config: &Arc<AppConfig>, services: &ServiceHandles, snapshot: Value) -> SharedSession {
    let session = RoomSession::new(Arc::clone(config), services.clone(), snapshot);
    tokio::spawn(log_notices(Arc::clone(&session)));
    info!(room = %session.room(), "room session opened");
    session
}

/// Mirror session notices into the log.
async fn log_notices(session: SharedSession) {
    let mut notices = session.subscribe();
    drop(session);
    loop {
        match notices.recv().await {
            Ok(notice) => match serde_json::to_string(&notice) {
                Ok(line) => info!(notice = %line, "room notice"),
                Err(err) => warn!(error = %err, "failed to encode room notice"),
            },
            Err(RecvError::Lagged(skipped)) => debug!(skipped, "notice logger lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(feature = "http-actions")]
fn build_services(config: &AppConfig) -> anyhow::Result<ServiceHandles> {
    use room_mirror::services::http_actions::HttpRoomActions;

    match &config.actions_base_url {
        Some(url) => {
            let backend = HttpRoomActions::new(url, config.actions_token.clone())
                .with_context(|| format!("configuring chat backend at {url}"))?;
            info!(%url, "using HTTP chat backend");
            Ok(ServiceHandles::from_backend(Arc::new(backend)))
        }
        None => Ok(dry_run_services()),
    }
}

#[cfg(not(feature = "http-actions"))]
fn build_services(config: &AppConfig) -> anyhow::Result<ServiceHandles> {
    if config.actions_base_url.is_some() {
        warn!("chat backend configured but http-actions feature is disabled");
    }
    Ok(dry_run_services())
}

fn dry_run_services() -> ServiceHandles {
    info!("no chat backend configured; actions are only logged");
    ServiceHandles::from_backend(Arc::new(LoggingActions))
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "SIGTERM handler unavailable; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
