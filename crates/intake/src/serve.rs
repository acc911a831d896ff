// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `intake serve` command implementation.
//!
//! Opens SQLite storage, connects the bridge channel, starts the engine
//! with its maintenance scheduler and serves the gateway until a shutdown
//! signal arrives.

use std::sync::Arc;

use qrcode::QrCode;
use qrcode::render::unicode;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use intake_config::IntakeConfig;
use intake_core::{ChannelAdapter, ChannelStatus, IntakeError, PluginAdapter, SystemClock};
use intake_engine::{Engine, shutdown};
use intake_gateway::{AuthConfig, BridgeChannel, GatewayState, ServerConfig, start_server};
use intake_storage::SqliteStorage;

/// Run the engine until shutdown.
pub async fn run_serve(config: IntakeConfig) -> Result<(), IntakeError> {
    info!(bot = config.bot.name.as_str(), "starting intake serve");

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    info!(path = config.storage.database_path.as_str(), "storage initialized");

    let bridge = Arc::new(BridgeChannel::new(config.bridge.clone())?);
    let engine = Engine::new(
        &config,
        bridge.clone(),
        storage.clone(),
        storage.clone(),
        Arc::new(SystemClock),
    );

    let cancel = shutdown::install_signal_handler();

    let pairing = tokio::spawn(watch_pairing(bridge.status(), cancel.clone()));

    let gateway = if config.gateway.enabled {
        let state = GatewayState::new(
            engine.clone(),
            AuthConfig {
                bearer_token: config.gateway.bearer_token.clone(),
            },
            config.bot.name.clone(),
        )
        .with_ingress(bridge.ingress())
        .with_health_source(storage.clone());
        if config.gateway.bearer_token.is_none() {
            warn!("gateway.bearer_token not set, every gateway request will be rejected");
        }
        let server_config = ServerConfig::from(&config.gateway);
        let gateway_cancel = cancel.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = start_server(&server_config, state, gateway_cancel.clone()).await {
                error!(error = %e, "gateway server failed");
                gateway_cancel.cancel();
            }
        }))
    } else {
        warn!("gateway disabled, bridge events cannot reach the engine");
        None
    };

    let result = engine.run(cancel.clone()).await;
    cancel.cancel();

    if let Some(gateway) = gateway
        && let Err(e) = gateway.await
    {
        warn!(error = %e, "gateway task ended abnormally");
    }
    let _ = pairing.await;

    if let Err(e) = bridge.shutdown().await {
        warn!(error = %e, "bridge shutdown failed");
    }
    if let Err(e) = storage.shutdown().await {
        warn!(error = %e, "storage shutdown failed");
    }

    info!("intake serve shutdown complete");
    result
}

/// Log transport status changes and print the pairing code as a terminal QR.
async fn watch_pairing(mut status: watch::Receiver<ChannelStatus>, cancel: CancellationToken) {
    loop {
        let current = status.borrow_and_update().clone();
        match &current {
            ChannelStatus::Connecting => debug!("transport connecting"),
            ChannelStatus::PairingRequired { code } => {
                info!("transport pairing required, scan the code below");
                match render_pairing_code(code) {
                    Some(qr) => eprintln!("{qr}"),
                    None => warn!(code = code.as_str(), "pairing code could not be rendered"),
                }
            }
            ChannelStatus::Ready => info!("transport ready"),
            ChannelStatus::Disconnected { reason } => {
                warn!(reason = reason.as_str(), "transport disconnected")
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}

/// Render a pairing code as a block-character QR code.
pub(crate) fn render_pairing_code(code: &str) -> Option<String> {
    let qr = QrCode::new(code.as_bytes()).ok()?;
    Some(
        qr.render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Light)
            .light_color(unicode::Dense1x2::Dark)
            .build(),
    )
}

/// Initialize tracing, with `RUST_LOG` taking precedence over `bot.log_level`.
pub(crate) fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "intake={log_level},intake_engine={log_level},intake_gateway={log_level},intake_storage={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
