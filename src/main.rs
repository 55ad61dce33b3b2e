use anyhow::{Context, Result};
use clap::Parser;
use peercall::{
    create_router, run_event_loop, AppState, ChatSession, Config, DirectoryDownloads,
    HeadlessDevices, Notifier, RelayClient, SessionParts, WebRtcConnector,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "peercall", version, about = "Two-party video chat client")]
struct Args {
    /// Config file, without extension
    #[arg(long, default_value = "config/peercall")]
    config: String,

    /// Join this room right away
    #[arg(long)]
    room: Option<String>,

    /// Relay URL, overrides the config
    #[arg(long)]
    relay: Option<String>,

    /// Do not serve the control API
    #[arg(long)]
    no_http: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config)?;
    if let Some(relay) = args.relay {
        cfg.relay.url = relay;
    }

    info!("peercall v{}", env!("CARGO_PKG_VERSION"));
    info!("Relay: {}", cfg.relay.url);

    let downloads_dir = cfg.downloads_dir()?;
    info!("Downloads go to {}", downloads_dir.display());

    let (relay, relay_rx) = RelayClient::connect(&cfg.relay.url).await?;
    let relay = Arc::new(relay);

    // No capture devices or recording backend on a headless host:
    // the client joins receive-only.
    let notifier = Notifier::new();
    let (session, peer_rx) = ChatSession::new(SessionParts {
        devices: Arc::new(HeadlessDevices),
        connector: Arc::new(WebRtcConnector::new()),
        signaling: relay.clone(),
        capture: None,
        downloads: Arc::new(DirectoryDownloads::new(downloads_dir)),
        peer_config: cfg.peer_config(),
        recording: cfg.recording_settings(),
        notifier,
    });
    let session = Arc::new(Mutex::new(session));

    let event_loop = tokio::spawn(run_event_loop(Arc::clone(&session), relay_rx, peer_rx));

    if let Some(room) = args.room {
        let mut session = session.lock().await;
        if let Err(e) = session.join(&room).await {
            warn!("Could not join room {}: {}", room, e);
        }
    }

    if args.no_http {
        tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
    } else {
        let addr = cfg.http_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        info!("Control API listening on http://{}", addr);

        let app = create_router(AppState::new(Arc::clone(&session)));
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                }
            })
            .await
            .context("Control API failed")?;
    }

    info!("Shutting down");
    session.lock().await.shutdown().await;

    event_loop.abort();
    let _ = event_loop.await;
    drop(session);

    match Arc::try_unwrap(relay) {
        Ok(relay) => relay.close().await?,
        Err(_) => warn!("Relay still in use, not waiting for it to close"),
    }

    Ok(())
}
