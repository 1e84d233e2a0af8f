//! # murmur-agent
//!
//! Murmur relay binary: loads settings, wires the generator, session store,
//! event bus, and coordinator together, and serves the HTTP surface until
//! SIGINT or SIGTERM.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use murmur_core::logging::init_subscriber;
use murmur_llm::{Generator, create_generator};
use murmur_runtime::{
    BusConfig, CoordinatorConfig, EventBus, SessionStore, StaticPromptProvider, StreamCoordinator,
};
use murmur_server::MurmurServer;
use murmur_settings::{GeneratorMode, MurmurSettings};
use tracing::{info, warn};

/// Murmur streaming chat relay.
#[derive(Parser, Debug)]
#[command(name = "murmur", about = "Streaming chat relay server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Generator backend: remote-http (colab), local-inference (gcp), or managed-api (api).
    #[arg(long)]
    mode: Option<GeneratorMode>,

    /// Settings file (defaults to `~/.murmur/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level filter, e.g. `info` or `murmur_runtime=debug`.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Apply flags over loaded settings.
    fn apply(&self, settings: &mut MurmurSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(mode) = self.mode {
            settings.generator.mode = mode;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
    }
}

/// Build the relay around `generator`.
fn build_server(settings: &MurmurSettings, generator: Arc<dyn Generator>) -> Result<MurmurServer> {
    let prompt = StaticPromptProvider::from_settings(&settings.prompt)
        .context("Failed to load prompt preamble")?;
    let sessions = Arc::new(SessionStore::new(settings.session.capacity));
    let bus = Arc::new(EventBus::new(BusConfig::from(&settings.bus)));
    let coordinator = StreamCoordinator::new(
        sessions,
        bus,
        generator,
        CoordinatorConfig::from(&settings.coordinator),
    )
    .with_prompt(Arc::new(prompt));

    Ok(MurmurServer::new(settings.server.clone(), Arc::new(coordinator))
        .with_keep_alive(Duration::from_secs(settings.bus.keep_alive_secs.max(1))))
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                let _ = sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received ctrl-c"),
        () = terminate => info!("received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings_path = args
        .config
        .clone()
        .unwrap_or_else(murmur_settings::settings_path);
    let mut settings = murmur_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;
    args.apply(&mut settings);

    init_subscriber(&settings.logging.level, settings.logging.format);
    info!(
        path = %settings_path.display(),
        mode = settings.generator.mode.as_str(),
        "settings loaded"
    );

    let metrics = murmur_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;
    let generator = create_generator(&settings.generator).context("Failed to create generator")?;
    info!(
        backend = generator.backend(),
        model = generator.model(),
        "generator ready"
    );

    let server = build_server(&settings, generator)?.with_metrics(metrics);
    let listener = server.bind().await.with_context(|| {
        format!(
            "Failed to bind {}:{}",
            settings.server.host, settings.server.port
        )
    })?;
    server
        .serve(listener, shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}
