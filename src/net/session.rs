use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::MatchConfig;
use crate::constants::{BROADCAST_PERIOD, TICK_DURATION};
use crate::engine::MatchEngine;
use crate::error::SessionError;
use crate::input::{InputEvent, MetaCommand};
use crate::report::ResultSink;
use crate::types::{MatchPhase, PlayerSlot, RenderView, Role};

use super::protocol::Message;
use super::snapshot::Snapshot;
use super::transport::{
    spawn_line_reader, spawn_line_writer, DatagramLink, Inbound, Outbound, QueuePolicy,
};

const INBOUND_CAPACITY: usize = 256;
const OUTBOUND_CAPACITY: usize = 256;
/// Ticks a session keeps running after its result so the last frames reach
/// the peer.
const LINGER_TICKS: u32 = 30;

/// What a front-end plugs into a session.
pub struct SessionIo<S> {
    pub controls: mpsc::Receiver<InputEvent>,
    /// Latest renderable frame, refreshed every tick when present.
    pub views: Option<watch::Sender<RenderView>>,
    pub results: S,
}

enum Link {
    Offline,
    Host(Outbound),
    Client(Outbound),
}

/// Runs a solo or local duo match with no network.
pub async fn run_local<S: ResultSink>(
    config: MatchConfig,
    io: SessionIo<S>,
) -> Result<(), SessionError> {
    info!(
        difficulty = config.difficulty.label(),
        role = ?config.role,
        seed = config.seed,
        "starting local session"
    );
    let (_, inbound) = mpsc::channel(1);
    simulate(MatchEngine::new(config), Link::Offline, inbound, None, io).await;
    Ok(())
}

/// Host side before the client has connected.
pub struct HostListener {
    listener: TcpListener,
    datagram: DatagramLink,
}

impl HostListener {
    pub async fn bind(stream: SocketAddr, datagram: SocketAddr) -> Result<Self, SessionError> {
        let listener = TcpListener::bind(stream).await?;
        let datagram = DatagramLink::bind(datagram).await?;
        Ok(Self { listener, datagram })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SessionError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn datagram_addr(&self) -> Result<SocketAddr, SessionError> {
        self.datagram.local_addr()
    }

    /// Waits for one client, announces the datagram port and runs the
    /// authoritative match until it ends or is quit.
    pub async fn run<S: ResultSink>(
        self,
        config: MatchConfig,
        io: SessionIo<S>,
    ) -> Result<(), SessionError> {
        let config = MatchConfig {
            role: Role::Host,
            ..config
        };
        info!(addr = %self.local_addr()?, "waiting for client");
        let (stream, peer) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        info!(%peer, "client connected");

        let (read, write) = stream.into_split();
        let (out_tx, out_rx) = mpsc::channel::<String>(OUTBOUND_CAPACITY);
        let writer = spawn_line_writer(write, out_rx);
        let port = self.datagram.local_addr()?.port();
        out_tx
            .try_send(Message::UdpPort(port).encode())
            .map_err(|_| SessionError::ConnectionLost)?;

        let (in_tx, in_rx) = mpsc::channel(INBOUND_CAPACITY);
        let stream_reader = spawn_line_reader(read, in_tx.clone());
        let datagram_reader = self.datagram.spawn_reader(in_tx);

        let engine = MatchEngine::new(config);
        let (frames_tx, frames_rx) = watch::channel(engine.capture_snapshot());
        let outbound = Outbound::new(out_tx, self.datagram);
        let broadcaster = spawn_broadcaster(frames_rx, outbound.clone());

        simulate(engine, Link::Host(outbound), in_rx, Some(frames_tx), io).await;

        broadcaster.abort();
        stream_reader.abort();
        datagram_reader.abort();
        let _ = writer.await;
        info!("host session closed");
        Ok(())
    }
}

/// Connects to a host and runs the predicting client until the match ends
/// or is quit.
pub async fn run_client<S: ResultSink>(
    config: MatchConfig,
    host: SocketAddr,
    io: SessionIo<S>,
) -> Result<(), SessionError> {
    let config = MatchConfig {
        role: Role::Client,
        ..config
    };
    let stream = TcpStream::connect(host).await?;
    stream.set_nodelay(true)?;
    info!(%host, "connected to host");

    let (read, write) = stream.into_split();
    let (out_tx, out_rx) = mpsc::channel::<String>(OUTBOUND_CAPACITY);
    let writer = spawn_line_writer(write, out_rx);
    let (in_tx, mut in_rx) = mpsc::channel(INBOUND_CAPACITY);
    let stream_reader = spawn_line_reader(read, in_tx.clone());

    let port = loop {
        match in_rx.recv().await {
            Some(Inbound {
                message: Message::UdpPort(port),
                ..
            }) => break port,
            Some(other) => debug!(ignored = ?other.message, "message before handshake"),
            None => return Err(SessionError::ConnectionLost),
        }
    };
    let bind: SocketAddr = if host.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let datagram = DatagramLink::bind(bind).await?;
    datagram.set_peer(SocketAddr::new(host.ip(), port));
    info!(port, "datagram channel ready");
    let datagram_reader = datagram.spawn_reader(in_tx);

    let outbound = Outbound::new(out_tx, datagram);
    simulate(
        MatchEngine::new(config),
        Link::Client(outbound),
        in_rx,
        None,
        io,
    )
    .await;

    stream_reader.abort();
    datagram_reader.abort();
    let _ = writer.await;
    info!("client session closed");
    Ok(())
}

/// Sends the newest published frame at a fixed cadence, stamping each with
/// the next sequence number.
fn spawn_broadcaster(mut frames: watch::Receiver<Snapshot>, outbound: Outbound) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(BROADCAST_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut seq: u64 = 0;
        loop {
            ticker.tick().await;
            if frames.has_changed().is_err() {
                break;
            }
            let mut snapshot = frames.borrow_and_update().clone();
            seq += 1;
            snapshot.seq = seq;
            let line = Message::State(Box::new(snapshot)).encode();
            if outbound.send(line, QueuePolicy::DropOnFull).is_err() {
                debug!("broadcast stopped, stream gone");
                break;
            }
        }
    })
}

/// The simulation task. Sole owner of the engine; everything else reaches
/// it through channels.
async fn simulate<S: ResultSink>(
    mut engine: MatchEngine,
    link: Link,
    mut inbound: mpsc::Receiver<Inbound>,
    frames: Option<watch::Sender<Snapshot>>,
    mut io: SessionIo<S>,
) {
    let mut ticker = interval(TICK_DURATION);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut linger: Option<u32> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                engine.step();
                if let Some(frames) = &frames {
                    frames.send_replace(engine.capture_snapshot());
                }
                if let Some(views) = &io.views {
                    views.send_replace(engine.render_view());
                }
                if let Some(result) = engine.take_result() {
                    io.results.deliver(result);
                    linger = Some(LINGER_TICKS);
                }
                if let Some(remaining) = linger.as_mut() {
                    if *remaining == 0 {
                        break;
                    }
                    *remaining -= 1;
                }
            }
            Some(event) = io.controls.recv() => {
                if !handle_control(&mut engine, &link, event) {
                    info!(tick = engine.sim_tick(), "quit requested");
                    break;
                }
            }
            Some(received) = inbound.recv() => {
                handle_inbound(&mut engine, &link, received);
            }
        }
    }
}

/// Returns false when the session should stop.
fn handle_control(engine: &mut MatchEngine, link: &Link, event: InputEvent) -> bool {
    match event {
        InputEvent::Meta(MetaCommand::Quit) => return false,
        InputEvent::Meta(MetaCommand::Start) => match link {
            Link::Client(_) => debug!("client waits for the host to start"),
            Link::Host(outbound) => {
                engine.start();
                if outbound
                    .send(Message::GameStart.encode(), QueuePolicy::FailOnFull)
                    .is_err()
                {
                    debug!("could not announce game start");
                }
            }
            Link::Offline => engine.start(),
        },
        InputEvent::Meta(command) => engine.handle_meta(command),
        InputEvent::Move { slot, dir } => {
            engine.set_input(slot, dir);
            if let Link::Client(outbound) = link {
                let line = Message::Input {
                    dir,
                    tick: Some(engine.sim_tick()),
                }
                .encode();
                if outbound.send(line, QueuePolicy::DropOnFull).is_err() {
                    debug!("input relay failed, stream gone");
                }
            }
        }
    }
    true
}

fn handle_inbound(engine: &mut MatchEngine, link: &Link, received: Inbound) {
    match (link, received.message) {
        (Link::Host(_), Message::Input { dir, tick }) => {
            debug!(?dir, ?tick, channel = ?received.channel, "remote input");
            engine.set_input(PlayerSlot::Two, dir);
        }
        (Link::Client(_), Message::State(snapshot)) => {
            engine.apply_snapshot(&snapshot);
        }
        (Link::Client(_), Message::GameStart) => {
            if engine.phase() == MatchPhase::Menu {
                info!(channel = ?received.channel, "host started the match");
            }
            engine.start();
        }
        (_, message) => debug!(?message, "ignoring message"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::AsyncWriteExt;
    use tokio::net::UdpSocket;
    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::report::ChannelSink;
    use crate::types::{Difficulty, Direction};

    const WAIT: Duration = Duration::from_secs(5);

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().expect("loopback addr")
    }

    struct Front {
        controls: mpsc::Sender<InputEvent>,
        views: watch::Receiver<RenderView>,
    }

    fn front(config: MatchConfig) -> (Front, SessionIo<ChannelSink>) {
        let (controls_tx, controls) = mpsc::channel(16);
        let (views_tx, views) = watch::channel(MatchEngine::new(config).render_view());
        let (results, _) = ChannelSink::new();
        (
            Front {
                controls: controls_tx,
                views,
            },
            SessionIo {
                controls,
                views: Some(views_tx),
                results,
            },
        )
    }

    #[tokio::test]
    async fn local_session_runs_until_quit() {
        let config = MatchConfig::new(Difficulty::Easy, Role::Solo, 5);
        let (mut front, io) = front(config);
        let session = tokio::spawn(run_local(config, io));

        front
            .controls
            .send(InputEvent::Meta(MetaCommand::Start))
            .await
            .expect("start");
        timeout(WAIT, front.views.wait_for(|view| view.tick >= 10))
            .await
            .expect("ticks advance")
            .expect("view channel open");
        assert_eq!(front.views.borrow().phase, MatchPhase::Running);

        front
            .controls
            .send(InputEvent::Meta(MetaCommand::Quit))
            .await
            .expect("quit");
        timeout(WAIT, session)
            .await
            .expect("session ends")
            .expect("join")
            .expect("session ok");
    }

    #[tokio::test]
    async fn client_skips_truncated_state_and_keeps_playing() {
        let config = MatchConfig::new(Difficulty::Easy, Role::Client, 21);
        let listener = TcpListener::bind(loopback()).await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let datagram = UdpSocket::bind(loopback()).await.expect("udp bind");
        let port = datagram.local_addr().expect("udp addr").port();

        let (mut client_front, client_io) = front(config);
        let client_task = tokio::spawn(run_client(config, addr, client_io));
        let (mut stream, _) = timeout(WAIT, listener.accept())
            .await
            .expect("client connects")
            .expect("accept");

        let mut host = MatchEngine::new(MatchConfig {
            role: Role::Host,
            ..config
        });
        host.start();
        host.step();
        let mut snapshot = host.capture_snapshot();
        snapshot.seq = 1;
        snapshot.scores = [40, 250];
        let script = [
            Message::UdpPort(port).encode(),
            Message::GameStart.encode(),
            "STATE:1,2,3".to_string(),
            Message::State(Box::new(snapshot)).encode(),
        ];
        for line in script {
            stream
                .write_all(format!("{line}\n").as_bytes())
                .await
                .expect("write");
        }

        timeout(
            WAIT,
            client_front.views.wait_for(|view| {
                view.phase == MatchPhase::Running
                    && view.players.get(1).is_some_and(|player| player.score == 250)
            }),
        )
        .await
        .expect("valid state applied after the malformed one")
        .expect("view channel open");
        let tick = client_front.views.borrow().tick;
        timeout(WAIT, client_front.views.wait_for(|view| view.tick > tick + 5))
            .await
            .expect("client keeps ticking")
            .expect("view channel open");

        client_front
            .controls
            .send(InputEvent::Meta(MetaCommand::Quit))
            .await
            .expect("quit");
        timeout(WAIT, client_task)
            .await
            .expect("client ends")
            .expect("join")
            .expect("client ok");
    }

    #[tokio::test]
    async fn client_follows_host_start_and_state() {
        let config = MatchConfig::new(Difficulty::Normal, Role::Host, 17);
        let host = HostListener::bind(loopback(), loopback())
            .await
            .expect("host bind");
        let addr = host.local_addr().expect("host addr");

        let (host_front, host_io) = front(config);
        let host_task = tokio::spawn(host.run(config, host_io));

        let client_config = MatchConfig {
            role: Role::Client,
            ..config
        };
        let (mut client_front, client_io) = front(client_config);
        let client_task = tokio::spawn(run_client(client_config, addr, client_io));

        // Give the handshake a moment before starting.
        sleep(Duration::from_millis(100)).await;
        host_front
            .controls
            .send(InputEvent::Meta(MetaCommand::Start))
            .await
            .expect("start");

        timeout(
            WAIT,
            client_front
                .views
                .wait_for(|view| view.phase == MatchPhase::Running && view.tick >= 30),
        )
        .await
        .expect("client runs")
        .expect("view channel open");

        client_front
            .controls
            .send(InputEvent::Move {
                slot: PlayerSlot::Two,
                dir: Direction::Left,
            })
            .await
            .expect("move");
        {
            let view = client_front.views.borrow();
            assert_eq!(view.players.len(), 2);
            assert_eq!(view.ghosts.len(), 4);
            assert!(view.ghosts.iter().all(|ghost| ghost.path.is_empty()));
        }

        for side in [&host_front, &client_front] {
            side.controls
                .send(InputEvent::Meta(MetaCommand::Quit))
                .await
                .expect("quit");
        }
        timeout(WAIT, client_task)
            .await
            .expect("client ends")
            .expect("join")
            .expect("client ok");
        timeout(WAIT, host_task)
            .await
            .expect("host ends")
            .expect("join")
            .expect("host ok");
    }
}
