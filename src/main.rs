use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use voice_avatar::presentation::STATUS_PROCESSING;
use voice_avatar::{
    probe_transport, BackendClient, Config, DecodingPlayer, PresentationMode, SessionController,
    SessionEvent, SessionHandle, WavFileProvider, WavFileSink,
};

#[derive(Parser)]
#[command(name = "voice-avatar")]
#[command(about = "Push-to-talk voice avatar client")]
struct Cli {
    /// Config file (TOML, extension optional)
    #[arg(short, long, default_value = "config/voice-avatar")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the voice backend is up
    Health,
    /// Send each WAV file as one push-to-talk exchange
    Talk {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Interactive session: say <wav>, connect, stop, log, quit
    Repl,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Voice Avatar v{}", env!("CARGO_PKG_VERSION"));
    info!("Backend: {} ({:?} profile)", cfg.backend.base_url, cfg.backend.profile);

    let backend = BackendClient::new(&cfg.backend).context("Failed to create backend client")?;

    match cli.command {
        Command::Health => health(&backend).await,
        Command::Talk { files } => {
            let (handle, provider) = start_session(cfg, backend)?;
            for file in &files {
                exchange(&handle, &provider, file).await?;
            }
            print_log(&handle).await;
            handle.shutdown().await
        }
        Command::Repl => {
            let (handle, provider) = start_session(cfg, backend)?;
            repl(&handle, &provider).await?;
            handle.shutdown().await
        }
    }
}

async fn health(backend: &BackendClient) -> Result<()> {
    let report = backend
        .health()
        .await
        .with_context(|| format!("Backend at {} is unreachable", backend.base_url()))?;

    println!("status: {}", report.status);
    if let Some(timestamp) = &report.timestamp {
        println!("timestamp: {}", timestamp);
    }
    let mut services: Vec<_> = report.services.iter().collect();
    services.sort();
    for (name, up) in services {
        println!("  {}: {}", name, if *up { "up" } else { "down" });
    }
    Ok(())
}

fn start_session(cfg: Config, backend: BackendClient) -> Result<(SessionHandle, Arc<WavFileProvider>)> {
    let provider = Arc::new(WavFileProvider::new());
    let transport = probe_transport(&cfg, &backend);
    let output_dir = cfg.playback.output_path()?;
    let realtime = cfg.playback.realtime;

    let controller = SessionController::new(cfg, backend, provider.clone()).with_transport(transport);
    let sink = WavFileSink::new(output_dir, controller.session_id().as_str(), realtime);
    let controller = controller.with_player(Arc::new(DecodingPlayer::new(sink)));

    info!("Session: {}", controller.session_id());
    Ok((controller.spawn(), provider))
}

/// Press, "speak" the file, release, and wait until the reply is presented
async fn exchange(handle: &SessionHandle, provider: &WavFileProvider, file: &Path) -> Result<()> {
    let mut events = handle.events();
    provider.enqueue(file);

    handle.press().await?;
    handle.release().await?;

    loop {
        match events.recv().await {
            Ok(SessionEvent::ExchangeCompleted { .. }) => break,
            Ok(SessionEvent::ExchangeFailed(e)) => {
                warn!("{}: {}", file.display(), e);
                return Ok(());
            }
            Ok(SessionEvent::CaptureEmpty) => {
                warn!("{}: no audio", file.display());
                return Ok(());
            }
            Ok(SessionEvent::CaptureFailed(e)) => {
                return Err(e).with_context(|| format!("Failed to capture {}", file.display()));
            }
            Ok(_) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => bail!("Session stopped"),
        }
    }

    let mut view = handle.view();
    view.wait_for(|v| v.status != STATUS_PROCESSING && v.mode != PresentationMode::AudioPlayback)
        .await
        .context("Session stopped")?;
    Ok(())
}

async fn print_log(handle: &SessionHandle) {
    for entry in handle.conversation().await {
        println!("[{}] {}: {}", entry.timestamp.format("%H:%M:%S"), entry.speaker, entry.text);
    }
}

async fn repl(handle: &SessionHandle, provider: &WavFileProvider) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Commands: say <wav>, connect, stop, status, log, quit");

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "" => {}
            "say" if !arg.is_empty() => {
                let file = PathBuf::from(shellexpand::tilde(arg.trim()).as_ref());
                if let Err(e) = exchange(handle, provider, &file).await {
                    warn!("{:#}", e);
                }
                if let Some(last) = handle.conversation().await.last() {
                    println!("{}: {}", last.speaker, last.text);
                }
            }
            "connect" => handle.connect_live().await?,
            "stop" => handle.disconnect().await?,
            "status" => {
                let view = handle.view().borrow().clone();
                println!("{} [{} / {}]", view.status, view.mode, view.connection);
            }
            "log" => print_log(handle).await,
            "quit" | "exit" => break,
            _ => println!("Unknown command: {}", line),
        }
    }
    Ok(())
}
