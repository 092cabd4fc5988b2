use std::io::{self, BufRead};
use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, Subcommand};
use pacman_duo::config::MatchConfig;
use pacman_duo::engine::MatchEngine;
use pacman_duo::input::{resolve, InputEvent, Key, MetaCommand};
use pacman_duo::net::session::{run_client, run_local, HostListener, SessionIo};
use pacman_duo::report::JsonLineSink;
use pacman_duo::types::{Difficulty, RenderView, Role};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    #[arg(long, global = true, default_value = "normal")]
    difficulty: String,
    #[arg(long, global = true)]
    seed: Option<u32>,
    /// Start the match without waiting for ENTER (ignored by `join`).
    #[arg(long, global = true)]
    autostart: bool,
    /// Seconds between status lines; 0 disables them.
    #[arg(long, global = true, default_value_t = 5)]
    status_secs: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// One player, no network.
    Solo,
    /// Two players sharing this keyboard (arrows and WASD).
    Local,
    /// Host a networked duo match; player one plays here.
    Host {
        #[arg(long, default_value = "0.0.0.0:0")]
        bind: SocketAddr,
        #[arg(long, default_value = "0.0.0.0:0")]
        udp: SocketAddr,
    },
    /// Join a host as player two.
    Join { host: SocketAddr },
}

impl Command {
    fn role(&self) -> Role {
        match self {
            Self::Solo => Role::Solo,
            Self::Local => Role::LocalDuo,
            Self::Host { .. } => Role::Host,
            Self::Join { .. } => Role::Client,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let difficulty = Difficulty::parse(&cli.difficulty)
        .ok_or_else(|| anyhow::anyhow!("unknown difficulty: {}", cli.difficulty))?;
    let role = cli.command.role();
    let seed = cli.seed.unwrap_or_else(rand::random::<u32>);
    let config = MatchConfig::new(difficulty, role, seed);

    let (controls_tx, controls) = mpsc::channel(64);
    let (views_tx, views) = watch::channel(MatchEngine::new(config).render_view());
    spawn_keyboard(role, controls_tx.clone());
    if cli.status_secs > 0 {
        spawn_status(views, Duration::from_secs(cli.status_secs));
    }
    if cli.autostart && role != Role::Client {
        controls_tx.send(InputEvent::Meta(MetaCommand::Start)).await?;
    }
    let quit_tx = controls_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = quit_tx.send(InputEvent::Meta(MetaCommand::Quit)).await;
        }
    });
    drop(controls_tx);

    let session_io = SessionIo {
        controls,
        views: Some(views_tx),
        results: JsonLineSink::new(io::stdout()),
    };
    match cli.command {
        Command::Solo | Command::Local => run_local(config, session_io).await?,
        Command::Host { bind, udp } => {
            let listener = HostListener::bind(bind, udp).await?;
            info!(
                stream = %listener.local_addr()?,
                datagram = %listener.datagram_addr()?,
                seed,
                "hosting"
            );
            listener.run(config, session_io).await?;
        }
        Command::Join { host } => run_client(config, host, session_io).await?,
    }
    Ok(())
}

/// Reads whitespace-separated key names from stdin on a plain thread and
/// feeds the resulting events to the session.
fn spawn_keyboard(role: Role, controls: mpsc::Sender<InputEvent>) {
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            for token in line.split_whitespace() {
                let Some(key) = Key::parse(token) else {
                    warn!(%token, "unknown key");
                    continue;
                };
                let Some(event) = resolve(role, key) else {
                    debug!(?key, "key not mapped for this role");
                    continue;
                };
                if controls.blocking_send(event).is_err() {
                    return;
                }
            }
        }
    });
}

fn spawn_status(mut views: watch::Receiver<RenderView>, period: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if views.has_changed().is_err() {
                break;
            }
            let view = views.borrow_and_update().clone();
            let scores: Vec<i32> = view.players.iter().map(|p| p.score).collect();
            let alive: Vec<bool> = view.players.iter().map(|p| p.alive).collect();
            info!(
                tick = view.tick,
                phase = ?view.phase,
                mode = ?view.mode,
                pellets = view.pellets_eaten,
                ?scores,
                ?alive,
                "status"
            );
        }
    });
}
