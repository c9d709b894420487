//! Patchbay - Main Entry Point
//!
//! Connects to a patchbay server (or the built-in demo graph) and opens the
//! routing graph editor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use patchbay_rs::{
    config::{AppConfig, LoggingConfig, TransportMode},
    frontend::PatchbayApp,
    transport::{HttpTransport, MemoryTransport, Transport, TransportBridge, TransportWorker},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize logging. The returned guard flushes the log file on drop.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.filter));

    let (file_layer, guard) = match logging.log_to_file.then(|| logging.resolved_log_dir()).flatten() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "patchbay.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

fn main() -> anyhow::Result<()> {
    let config = AppConfig::load_or_default();
    let _log_guard = init_logging(&config.logging);

    tracing::info!("Starting patchbay ({} transport)", config.transport);

    let transport: Box<dyn Transport> = match config.transport {
        TransportMode::Http => {
            tracing::info!("Server at {}", config.server.http_base());
            Box::new(HttpTransport::new(&config.server).context("Creating HTTP transport")?)
        }
        TransportMode::Demo => Box::new(MemoryTransport::demo()),
    };

    // Create the transport bridge and spawn the worker thread
    let (bridge, cmd_rx, msg_tx) = TransportBridge::new();
    let running = Arc::new(AtomicBool::new(true));
    let mut worker = TransportWorker::new(
        transport,
        &config.server,
        cmd_rx,
        msg_tx,
        Arc::clone(&running),
    );
    let worker_handle = std::thread::Builder::new()
        .name("transport".into())
        .spawn(move || worker.run())
        .context("Spawning transport worker")?;

    let [width, height] = config.ui.window_size;
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([width, height])
            .with_min_inner_size([640.0, 480.0])
            .with_title("Patchbay"),
        ..Default::default()
    };

    let result = eframe::run_native(
        "Patchbay",
        native_options,
        Box::new(|cc| Ok(Box::new(PatchbayApp::new(cc, bridge, config)))),
    );

    // Signal the worker to stop and wait for it
    tracing::info!("Shutting down...");
    running.store(false, Ordering::SeqCst);
    if worker_handle.join().is_err() {
        tracing::error!("Transport worker panicked");
    }

    result.map_err(|e| anyhow::anyhow!("UI error: {}", e))
}
