use std::{io, path::PathBuf, sync::Arc};

mod backend_bridge;
mod capability;
mod controller;
mod settings;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use client_core::HttpServiceClient;
use crossbeam_channel::bounded;
use tracing_subscriber::EnvFilter;

use crate::{
    backend_bridge::runtime,
    capability::FileSystemCapability,
    controller::{events::UiEvent, orchestration::PresentationAdapter},
    settings::{load_settings, Settings},
    ui::terminal,
};

#[derive(Parser, Debug)]
#[command(about = "Control a SmartCam stream and enroll faces")]
struct Args {
    /// Base address of the camera service, e.g. http://192.168.1.20:5000
    #[arg(long)]
    base_url: Option<String>,
    /// Settings file (defaults to ./smartcam.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Enrollment endpoint path, /add_face or /add_person
    #[arg(long)]
    enrollment_path: Option<String>,
    #[arg(long)]
    library_dir: Option<PathBuf>,
    #[arg(long)]
    capture_dir: Option<PathBuf>,
}

impl Args {
    fn apply(self, settings: &mut Settings) {
        if let Some(base_url) = self.base_url {
            settings.base_url = Some(base_url);
        }
        if let Some(timeout_secs) = self.timeout_secs {
            settings.request_timeout_secs = timeout_secs;
        }
        if let Some(enrollment_path) = self.enrollment_path {
            settings.enrollment_path = enrollment_path;
        }
        if let Some(library_dir) = self.library_dir {
            settings.library_dir = Some(library_dir);
        }
        if let Some(capture_dir) = self.capture_dir {
            settings.capture_dir = Some(capture_dir);
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let mut args = Args::parse();
    let mut settings = load_settings(args.config.take().as_deref())?;
    args.apply(&mut settings);

    let config = settings
        .service_config()
        .context("invalid service configuration; pass --base-url or set SMARTCAM_BASE_URL")?;
    let service = Arc::new(HttpServiceClient::new(config)?);
    tracing::info!(
        base_url = service.config().base_url(),
        enrollment_path = service.config().enrollment_path(),
        timeout_secs = service.config().request_timeout().as_secs(),
        "using camera service"
    );
    let capability = Arc::new(FileSystemCapability::new(
        settings.library_dir.clone(),
        settings.capture_dir.clone(),
    ));

    let (cmd_tx, cmd_rx) = tokio::sync::mpsc::channel(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    let backend = runtime::launch(service, capability, cmd_rx, ui_tx);

    let lines = terminal::spawn_stdin_reader();
    let mut adapter = PresentationAdapter::new(cmd_tx);
    let mut stdout = io::stdout().lock();
    terminal::run(&mut adapter, lines, ui_rx, &mut stdout)?;

    drop(adapter);
    if backend.join().is_err() {
        tracing::error!("backend worker panicked");
    }
    Ok(())
}
