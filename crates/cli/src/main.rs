//! rtcall sandbox
//!
//! Runs one session end to end against a simulated engine:
//! 1. Loads `sandbox_config.json` (or `--config`)
//! 2. Initializes the engine and joins the configured channel
//! 3. Publishes local camera and microphone, binds a render surface per remote peer
//! 4. Lets simulated peers stream frames with optional latency and frame loss
//! 5. Leaves and tears down after `runSeconds` or Ctrl-C

mod config;
mod engine;
mod peers;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use rtcall_client_core::{
    BroadcastEventSink, LoopbackEngine, RenderPlacement, RenderSurface, Session, SessionEvent,
    SessionEventSink,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::SandboxConfig;
use crate::engine::SimulatedEngine;
use crate::peers::{FrameCounter, PeerSimulator};

const FRAME_INTERVAL: Duration = Duration::from_millis(66);
const EVENT_BUFFER: usize = 256;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run an rtcall session against simulated peers", long_about = None)]
struct Args {
    /// Sandbox configuration file
    #[arg(short, long, default_value = "sandbox_config.json", env = "RTCALL_SANDBOX_CONFIG")]
    config: PathBuf,

    /// Override the configured run time in seconds
    #[arg(long)]
    run_secs: Option<u64>,

    /// Debug-level logging for the session library
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let loaded = SandboxConfig::load(&args.config)?;
    let mut config = loaded.config;
    if let Some(secs) = args.run_secs {
        config.run_seconds = secs;
    }

    let _guard = init_logging(config.log_file_path.as_deref(), args.verbose)?;
    if !loaded.from_file {
        warn!(path = %args.config.display(), "Sandbox config file empty or not found, using defaults");
    }
    if let Err(e) = config.validate() {
        error!("{e}");
        return Err(e);
    }

    run(config).await
}

fn init_logging(log_file: Option<&str>, verbose: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("rtcall_sandbox={level},rtcall_client_core={level}"))
    })?;

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("Log file path has no file name: {}", path.display()))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            let file_appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

/// Remote peer with the surface bound to it
type BoundPeer = (String, Arc<dyn RenderSurface>, Arc<FrameCounter>);

async fn run(config: SandboxConfig) -> anyhow::Result<()> {
    info!(channel = %config.channel_name, "Sandbox starting");

    let session = Session::builder()
        .engine(SimulatedEngine::new(
            LoopbackEngine::new(),
            config.engine_latency(),
        ))
        .build()?;

    let sink = BroadcastEventSink::new(EVENT_BUFFER);
    let events = sink.subscribe();
    let event_logger = tokio::spawn(log_events(events));

    // session calls block for the simulated network latency
    let surfaces = {
        let session = session.clone();
        let config = config.clone();
        blocking(move || connect(&session, &config, Arc::new(sink))).await?
    };
    let peers: Vec<String> = surfaces.iter().map(|(peer, _, _)| peer.clone()).collect();

    let simulator = PeerSimulator::start(
        session.notifier(),
        peers.clone(),
        config.frame_loss(),
        FRAME_INTERVAL,
    )?;

    info!(
        run_seconds = config.run_seconds,
        remote_users = peers.len(),
        "Sandbox running... press Ctrl+C to exit"
    );
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(config.run_seconds)) => {
            info!("Run time elapsed");
        }
        res = tokio::signal::ctrl_c() => {
            match res {
                Ok(()) => info!("Ctrl-C received, shutting down"),
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
            }
        }
    }

    let stats = {
        let session = session.clone();
        blocking(move || {
            let stats = simulator.stop();
            disconnect(&session, &peers)?;
            Ok(stats)
        })
        .await?
    };

    if let Err(e) = event_logger.await {
        warn!(error = %e, "Event logger task failed");
    }

    for (peer, _, counter) in &surfaces {
        info!(
            user_id = %peer,
            presented = counter.presented(),
            placement = ?counter.placement(),
            "Peer summary"
        );
    }
    info!(
        sent = stats.sent,
        dropped = stats.dropped,
        presented = stats.presented,
        "Sandbox finished"
    );
    Ok(())
}

/// Run synchronous session work on the blocking pool
async fn blocking<T, F>(work: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .context("Session task panicked")?
}

/// Initialize, join, publish and bind one surface per remote peer
fn connect(
    session: &Session,
    config: &SandboxConfig,
    sink: Arc<dyn SessionEventSink>,
) -> anyhow::Result<Vec<BoundPeer>> {
    session.initialize(&config.app_id, true, Some(sink))?;
    session
        .join_channel(&config.channel_name, &config.local_user_id, "")
        .context("Failed to join sandbox channel")?;

    session.request_camera_permission()?;
    session.request_microphone_permission()?;
    session.enable_local_camera(true)?;
    session.enable_local_microphone(true)?;

    let count = config.remote_user_count() as usize;
    let mut surfaces = Vec::with_capacity(count);
    for slot in 0..count {
        let peer = format!("peer-{}", slot + 1);
        let counter = Arc::new(FrameCounter::default());
        let surface: Arc<dyn RenderSurface> = counter.clone();
        session.init_renderer(Some(&surface), &peer)?;
        session.set_render_params(&peer, tile(slot))?;
        session.subscribe_remote_video(&peer, true)?;
        session.subscribe_remote_audio(&peer, true)?;
        // the registry only holds the surface weakly
        surfaces.push((peer, surface, counter));
    }
    Ok(surfaces)
}

/// Leave the channel, unbind every surface and destroy the engine
fn disconnect(session: &Session, peers: &[String]) -> anyhow::Result<()> {
    debug!(online = ?session.online_users(), "Membership before leave");

    if let Err(e) = session.leave_channel() {
        warn!(error = %e, "Leave reported an error");
    }
    for peer in peers {
        session.destroy_renderer(peer)?;
    }
    session.destroy()?;
    Ok(())
}

/// Grid position for the n-th remote view
fn tile(slot: usize) -> RenderPlacement {
    const COLUMNS: usize = 3;
    const WIDTH: f32 = 320.0;
    const HEIGHT: f32 = 180.0;
    let column = (slot % COLUMNS) as f32;
    let row = (slot / COLUMNS) as f32;
    RenderPlacement::new(column * WIDTH, row * HEIGHT, WIDTH, HEIGHT, 255)
}

async fn log_events(mut events: tokio::sync::broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let done = matches!(event, SessionEvent::EngineDestroyed);
                log_event(&event);
                if done {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event logger fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::Error { code, message } => {
            error!(code, message = %message, "Session error");
        }
        SessionEvent::RemoteUserJoined { user_id } => {
            info!(user_id = %user_id, "Remote user joined");
        }
        SessionEvent::RemoteUserLeft { user_id, reason } => {
            info!(user_id = %user_id, reason, "Remote user left");
        }
        other if other.is_error() => {
            warn!(event = other.name(), code = ?other.code(), "Operation failed");
        }
        other => {
            info!(event = other.name(), code = ?other.code(), "Session event");
        }
    }
}
