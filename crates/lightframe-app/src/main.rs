// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lightframe: capture-to-notification image pipeline
//
// Entry point. Initialises logging, loads the configuration, and replays the
// image files given on the command line as capture events: each one is
// transformed into the cache, reduced to an attachment, reported on, and
// handed to a notifier.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use lightframe_bridge::{
    CaptureSource, DirectoryNotifier, LogNotifier, Notifier, SidecarCaptureSource,
};
use lightframe_pipeline::cancellation;

use services::app_services::{AppServices, cancel_on_interrupt};

#[derive(Parser, Debug)]
#[command(name = "lightframe")]
#[command(version)]
#[command(about = "Stretch, cache, and report on astrophotography captures")]
struct Args {
    /// Captured image files, processed in order. Each may have a
    /// `<image>.json` sidecar with metadata, statistics, and analysis.
    images: Vec<PathBuf>,

    /// Configuration file (default: config.json in the data directory).
    #[arg(long, env = "LIGHTFRAME_CONFIG")]
    config: Option<PathBuf>,

    /// Write each attachment and its report into this directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Save the effective configuration to the config path.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    write_config: bool,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    tracing::info!("Lightframe starting");

    let services = AppServices::init(args.config.clone());
    let config = services.config();
    tracing::info!(
        format = ?config.image_format,
        resize_percent = config.resize_percent,
        attachment_scale = config.attachment_scale,
        debayer = config.debayer_image,
        "configuration loaded"
    );
    if args.write_config {
        match services.persist_config() {
            Ok(()) => tracing::info!(path = %services.config_path().display(), "configuration written"),
            Err(e) => {
                tracing::error!(error = %e, "failed to write configuration");
                return ExitCode::FAILURE;
            }
        }
    }

    let notifier: Box<dyn Notifier> = match &args.output_dir {
        Some(dir) => match DirectoryNotifier::new(dir) {
            Ok(notifier) => Box::new(notifier),
            Err(e) => {
                tracing::error!(error = %e, "output directory unusable");
                return ExitCode::FAILURE;
            }
        },
        None => Box::new(LogNotifier),
    };

    // Ctrl-C abandons the wait for the current capture.
    let (cancel_handle, mut cancel) = cancellation();
    tokio::spawn(cancel_on_interrupt(tokio::signal::ctrl_c(), cancel_handle));

    let mut source = SidecarCaptureSource::new(args.images);
    let mut status = ExitCode::SUCCESS;
    loop {
        let event = match source.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "capture source failed");
                status = ExitCode::FAILURE;
                break;
            }
        };

        let path = event.path.clone();
        tracing::info!(path = %path.display(), "capture received");
        if let Err(e) = services
            .handle_capture(event, notifier.as_ref(), &mut cancel)
            .await
        {
            if e.is_cancellation() {
                tracing::warn!(remaining = source.remaining(), "interrupted");
            } else {
                tracing::error!(path = %path.display(), error = %e, "capture handling failed");
            }
            status = ExitCode::FAILURE;
            break;
        }
    }

    for (category, count) in services.sorted_counters() {
        tracing::info!(%category, count, "category total");
    }
    tracing::info!(total = services.cache().total_count(), "Lightframe finished");
    status
}
