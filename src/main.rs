//! WinKeyer GW - cwdaemon to WinKeyer gateway
//!
//! Opens the keyer in host mode, applies the configured registers and then
//! keys whatever cwdaemon clients send on UDP.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use winkeyer_gw::cli::Args;
use winkeyer_gw::config::watcher::apply_reload;
use winkeyer_gw::config::{AppConfig, ConfigWatcher};
use winkeyer_gw::interpreter::CommandInterpreter;
use winkeyer_gw::ports;
use winkeyer_gw::server::{AccessPolicy, CwdaemonListener};
use winkeyer_gw::transport::{SerialTransport, Transport};
use winkeyer_gw::winkeyer::WinKeyer;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(args.effective_log_level())?;

    if args.list_ports {
        ports::list_ports_formatted();
        return Ok(());
    }

    let config = AppConfig::resolve(&args).await?;
    let device_config = config.device_config();

    info!("Starting WinKeyer GW v{}...", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &args.config {
        info!("Configuration file: {}", path);
    }

    let transport = SerialTransport::open(&config.device)
        .await
        .with_context(|| format!("Failed to open serial device {}", config.device))?;
    let mut keyer = WinKeyer::new(transport);

    keyer
        .host_open()
        .await
        .context("Failed to open WinKeyer host mode")?;

    keyer
        .apply_config(&device_config)
        .await
        .context("Failed to configure WinKeyer")?;

    let mut interpreter = CommandInterpreter::new(keyer, device_config);

    let policy = AccessPolicy::from_accept_remote(config.accept_remote_hosts);
    let listener = match CwdaemonListener::bind(config.port, policy).await {
        Ok(listener) => listener,
        Err(e) => {
            release_keyer(&mut interpreter).await;
            return Err(e).with_context(|| format!("Failed to listen on UDP port {}", config.port));
        }
    };

    let config_watcher = match &args.config {
        Some(path) => match ConfigWatcher::new(path.clone()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!("Config hot-reload disabled: {:#}", e);
                None
            }
        },
        None => None,
    };

    let result = run_loop(
        &mut interpreter,
        &listener,
        &args,
        &config,
        config_watcher,
        shutdown_signal(),
    )
    .await;

    info!("Shutting down...");
    release_keyer(&mut interpreter).await;

    result?;
    info!("WinKeyer GW shutdown complete");
    Ok(())
}

/// Serve frames until shutdown or a keyer link failure.
async fn run_loop<T: Transport>(
    interpreter: &mut CommandInterpreter<T>,
    listener: &CwdaemonListener,
    args: &Args,
    config: &AppConfig,
    mut config_watcher: Option<ConfigWatcher>,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    info!("Ready for cwdaemon clients on {}", listener.local_addr());

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            received = listener.recv_frame() => {
                let (frame, client) = match received {
                    Ok(received) => received,
                    Err(e) => {
                        warn!("UDP receive failed: {}", e);
                        continue;
                    }
                };
                debug!(client = %client, bytes = frame.len(), "cwdaemon frame");

                interpreter
                    .handle_frame(&frame)
                    .await
                    .context("Lost the WinKeyer link")?;
            }

            Some(new_config) = next_config(&mut config_watcher) => {
                info!("Configuration file changed, re-applying keyer settings...");
                if let Err(e) = apply_reload(interpreter, args, config, new_config).await {
                    if e.downcast_ref::<winkeyer_gw::Error>().is_some() {
                        return Err(e.context("Lost the WinKeyer link"));
                    }
                    warn!("Failed to reload config (keeping old config): {:#}", e);
                }
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping event loop");
                break;
            }
        }
    }

    Ok(())
}

async fn next_config(watcher: &mut Option<ConfigWatcher>) -> Option<AppConfig> {
    match watcher {
        Some(watcher) => watcher.next_config().await,
        None => std::future::pending().await,
    }
}

/// Best-effort PTT release and host close.
async fn release_keyer<T: Transport>(interpreter: &mut CommandInterpreter<T>) {
    if let Err(e) = interpreter.shutdown().await {
        error!("Failed to close WinKeyer host mode: {}", e);
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
}
