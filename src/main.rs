//! Lumen: live color feed with operator gain control.
//!
//! One capture worker owns the device and publishes into a single-slot frame
//! relay; the UI thread reads the relay on a 30 ms tick and feeds gain
//! requests back through the control channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use color_eyre::{eyre::eyre, Result};
use tracing::{error, info};

use lumen::capture::{CaptureWorker, V4l2ColorCamera};
use lumen::display::UiShell;
use lumen::pipeline::{FrameRelay, GainControl};
use lumen::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter("lumen=debug")
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("Lumen launching...");

    let config = Config::default();
    lumen::CONFIG.store(Arc::new(config.clone()));

    // Relay and gain channel exist before the worker spawns and outlive it.
    let relay = Arc::new(FrameRelay::new());
    let gain = Arc::new(GainControl::new());
    let shutdown = Arc::new(AtomicBool::new(false));
    let (event_tx, event_rx) = flume::bounded(16);

    // Open before spawning so a start failure is a DeviceNotFound the UI can
    // surface, not a crash-looping worker.
    let (worker_handle, startup_error) = match V4l2ColorCamera::open(&config.capture) {
        Ok(camera) => {
            let worker = CaptureWorker::new(
                camera,
                Arc::clone(&relay),
                Arc::clone(&gain),
                event_tx,
                Arc::clone(&shutdown),
            );
            (Some(tokio::task::spawn_blocking(move || worker.run())), None)
        }
        Err(e) => {
            error!(error = %e, "capture path unavailable");
            (None, Some(e))
        }
    };

    let sdl_context = sdl2::init().map_err(|e| eyre!(e))?;
    let mut shell = UiShell::new(&sdl_context, &config.display)?;
    shell.run(
        &sdl_context,
        Arc::clone(&relay),
        gain,
        event_rx,
        startup_error,
    )?;

    // Window closed: raise the flag and give the worker one cycle to stop
    // the device session.
    shutdown.store(true, Ordering::Relaxed);
    if let Some(handle) = worker_handle {
        let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
    }

    info!("Lumen shutting down");
    Ok(())
}
