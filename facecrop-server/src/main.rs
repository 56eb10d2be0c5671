use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use facecrop_core::{CropperOptions, FaceCropper};
use facecrop_server::{AppState, LISTEN_ADDR_ENV, create_router, resolve_listen_addr};
use facecrop_utils::{
    AppSettings, DetectorKind, configure_telemetry, init_logging, normalize_path,
};
use log::{info, warn};
use tokio::net::TcpListener;

/// Serve face crops over HTTP.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct ServerArgs {
    /// Address to bind, e.g. `127.0.0.1:8080`. Falls back to `FACECROP_LISTEN_ADDR`.
    #[arg(long)]
    listen: Option<String>,

    /// Optional settings JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Face detector: `cascade` or `yunet`.
    #[arg(long, value_name = "KIND")]
    detector: Option<DetectorKind>,

    /// Detector model file.
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Named output size.
    #[arg(long)]
    preset: Option<String>,

    /// Maximum request body in bytes.
    #[arg(long)]
    body_limit: Option<usize>,

    /// Enable telemetry timing logs.
    #[arg(long, action = ArgAction::SetTrue)]
    telemetry: bool,
}

fn load_settings(args: &ServerArgs) -> Result<AppSettings> {
    let mut settings = match args.config.as_ref() {
        Some(path) => {
            let resolved = normalize_path(path)?;
            let settings = AppSettings::load_from_path(&resolved)?;
            info!("Loaded settings from {}", resolved.display());
            settings
        }
        None => AppSettings::default(),
    };
    if let Some(kind) = args.detector {
        if kind != settings.detector.kind {
            settings.detector.model_path = None;
        }
        settings.detector.kind = kind;
    }
    if let Some(model) = args.model.as_ref() {
        settings.detector.model_path = Some(model.display().to_string());
    }
    if let Some(preset) = args.preset.as_ref() {
        settings.crop.preset = Some(preset.clone());
        settings.crop.output_width = None;
        settings.crop.output_height = None;
    }
    if let Some(limit) = args.body_limit {
        settings.server.body_limit_bytes = limit;
    }
    if args.telemetry {
        settings.telemetry.enabled = true;
    }
    Ok(settings)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections...");
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(log::LevelFilter::Info)?;
    let args = ServerArgs::parse();
    info!("Starting facecrop-server v{}", env!("CARGO_PKG_VERSION"));

    let settings = load_settings(&args)?;
    configure_telemetry(
        settings.telemetry.enabled,
        settings.telemetry.level_filter(),
    );

    let options = CropperOptions::from_settings(&settings)?;
    let model_path = settings.detector.resolved_model_path();
    info!(
        "Loading {} detector from {} ({}x{} output)",
        settings.detector.kind, model_path, options.output_width, options.output_height
    );
    let cropper = Arc::new(FaceCropper::new(model_path, options)?);

    let env_addr = std::env::var(LISTEN_ADDR_ENV).ok();
    let addr = resolve_listen_addr(
        args.listen.as_deref(),
        env_addr.as_deref(),
        &settings.server,
    );
    let router = create_router(
        Arc::new(AppState::new(cropper)),
        settings.server.body_limit_bytes,
    );

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on http://{addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Goodbye!");
    Ok(())
}
