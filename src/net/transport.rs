use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::{ProtocolError, SessionError};

use super::protocol::{Message, STATE_LAYOUT_VERSION};

const DATAGRAM_BUFFER: usize = 4_096;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Stream,
    Datagram,
}

impl Channel {
    fn label(self) -> &'static str {
        match self {
            Self::Stream => "tcp",
            Self::Datagram => "udp",
        }
    }
}

/// A decoded message together with the channel it arrived on.
#[derive(Clone, Debug, PartialEq)]
pub struct Inbound {
    pub channel: Channel,
    pub message: Message,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueuePolicy {
    DropOnFull,
    FailOnFull,
}

fn report_undecodable(channel: Channel, raw: &str, err: &ProtocolError) {
    match err {
        ProtocolError::UnknownMessage(_) => {
            debug!(channel = channel.label(), %err, "ignoring unknown line");
        }
        _ if raw.trim_start().starts_with("STATE:") => {
            warn!(
                channel = channel.label(),
                layout = STATE_LAYOUT_VERSION,
                %err,
                "dropping malformed snapshot"
            );
        }
        _ => {
            warn!(channel = channel.label(), %err, "dropping malformed message");
        }
    }
}

fn forward(
    inbound: &mpsc::Sender<Inbound>,
    channel: Channel,
    raw: &str,
) -> Result<(), mpsc::error::SendError<Inbound>> {
    match Message::decode(raw) {
        Ok(message) => inbound.try_send(Inbound { channel, message }).or_else(|err| match err {
            mpsc::error::TrySendError::Full(dropped) => {
                trace!(channel = channel.label(), ?dropped, "inbound queue full");
                Ok(())
            }
            mpsc::error::TrySendError::Closed(dropped) => Err(mpsc::error::SendError(dropped)),
        }),
        Err(err) => {
            report_undecodable(channel, raw, &err);
            Ok(())
        }
    }
}

/// Reads newline-terminated messages until the stream closes or fails. Read
/// failures end the task quietly; undecodable lines are logged and skipped.
pub fn spawn_line_reader(read: OwnedReadHalf, inbound: mpsc::Sender<Inbound>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(read).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("stream closed by peer");
                    break;
                }
                Err(err) => {
                    debug!(%err, "stream read failed");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            if forward(&inbound, Channel::Stream, &line).is_err() {
                break;
            }
        }
    })
}

/// Writes each queued line followed by a newline; stops on the first write
/// failure or once every sender is dropped.
pub fn spawn_line_writer(
    mut write: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(mut line) = outbound.recv().await {
            line.push('\n');
            if let Err(err) = write.write_all(line.as_bytes()).await {
                debug!(%err, "stream write failed");
                break;
            }
        }
        let _ = write.shutdown().await;
    })
}

/// Best-effort datagram endpoint. The peer is either set up front or
/// learned from the first datagram received.
#[derive(Clone, Debug)]
pub struct DatagramLink {
    socket: Arc<UdpSocket>,
    peer: Arc<watch::Sender<Option<SocketAddr>>>,
}

impl DatagramLink {
    pub async fn bind(addr: SocketAddr) -> Result<Self, SessionError> {
        let socket = UdpSocket::bind(addr).await?;
        let (peer, _) = watch::channel(None);
        Ok(Self {
            socket: Arc::new(socket),
            peer: Arc::new(peer),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SessionError> {
        Ok(self.socket.local_addr()?)
    }

    pub fn set_peer(&self, addr: SocketAddr) {
        self.peer.send_replace(Some(addr));
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        *self.peer.borrow()
    }

    /// Sends one line without waiting for socket readiness; a datagram that
    /// cannot go out right away is simply lost.
    pub fn send_line(&self, line: &str) -> Result<(), SessionError> {
        let peer = self.peer().ok_or(SessionError::NotConnected)?;
        match self.socket.try_send_to(line.as_bytes(), peer) {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                trace!("datagram dropped, socket busy");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn spawn_reader(&self, inbound: mpsc::Sender<Inbound>) -> JoinHandle<()> {
        let socket = Arc::clone(&self.socket);
        let peer = Arc::clone(&self.peer);
        tokio::spawn(async move {
            let mut buf = vec![0u8; DATAGRAM_BUFFER];
            loop {
                let (len, from) = match socket.recv_from(&mut buf).await {
                    Ok(received) => received,
                    Err(err) => {
                        debug!(%err, "datagram receive failed");
                        break;
                    }
                };
                peer.send_if_modified(|current| {
                    if current.is_some() {
                        return false;
                    }
                    debug!(%from, "learned datagram peer");
                    *current = Some(from);
                    true
                });
                let text = String::from_utf8_lossy(&buf[..len]);
                if forward(&inbound, Channel::Datagram, &text).is_err() {
                    break;
                }
            }
        })
    }
}

/// Both outbound channels of a connected session.
#[derive(Clone, Debug)]
pub struct Outbound {
    stream: mpsc::Sender<String>,
    datagram: DatagramLink,
}

impl Outbound {
    pub fn new(stream: mpsc::Sender<String>, datagram: DatagramLink) -> Self {
        Self { stream, datagram }
    }

    /// Sends the line over both channels. Fails only when the stream writer
    /// is gone, or its queue is full under `FailOnFull`.
    pub fn send(&self, line: String, policy: QueuePolicy) -> Result<(), SessionError> {
        match self.datagram.send_line(&line) {
            Ok(()) | Err(SessionError::NotConnected) => {}
            Err(err) => debug!(%err, "datagram send failed"),
        }
        match self.stream.try_send(line) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) if policy == QueuePolicy::DropOnFull => {
                trace!("stream queue full, dropping line");
                Ok(())
            }
            Err(_) => Err(SessionError::ConnectionLost),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::timeout;

    use super::*;
    use crate::types::Direction;

    const WAIT: Duration = Duration::from_secs(2);

    async fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let client = TcpStream::connect(addr).await.expect("connect");
        let (server, _) = listener.accept().await.expect("accept");
        (server, client)
    }

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().expect("loopback addr")
    }

    #[tokio::test]
    async fn line_reader_forwards_decoded_lines_and_skips_garbage() {
        let (server, mut client) = connected_pair().await;
        let (read, _write) = server.into_split();
        let (tx, mut rx) = mpsc::channel(8);
        let reader = spawn_line_reader(read, tx);

        client
            .write_all(b"GAMESTART\nHELLO THERE\n\nINPUT:UP:4\n")
            .await
            .expect("write");
        let first = timeout(WAIT, rx.recv()).await.expect("first line");
        assert_eq!(
            first,
            Some(Inbound {
                channel: Channel::Stream,
                message: Message::GameStart
            })
        );
        let second = timeout(WAIT, rx.recv()).await.expect("second line");
        assert_eq!(
            second.map(|inbound| inbound.message),
            Some(Message::Input {
                dir: Direction::Up,
                tick: Some(4)
            })
        );

        drop(client);
        timeout(WAIT, reader).await.expect("reader exits").expect("join");
    }

    #[tokio::test]
    async fn line_writer_terminates_each_line() {
        let (server, client) = connected_pair().await;
        let (_read, write) = server.into_split();
        let (tx, rx) = mpsc::channel(8);
        let writer = spawn_line_writer(write, rx);

        tx.send("UDPPORT:5556".to_string()).await.expect("queue");
        tx.send("GAMESTART".to_string()).await.expect("queue");
        drop(tx);
        timeout(WAIT, writer).await.expect("writer exits").expect("join");

        let mut lines = BufReader::new(client).lines();
        assert_eq!(
            lines.next_line().await.expect("read").as_deref(),
            Some("UDPPORT:5556")
        );
        assert_eq!(
            lines.next_line().await.expect("read").as_deref(),
            Some("GAMESTART")
        );
        assert_eq!(lines.next_line().await.expect("read"), None);
    }

    #[tokio::test]
    async fn datagram_link_learns_peer_from_first_datagram() {
        let host = DatagramLink::bind(loopback()).await.expect("host bind");
        let client = DatagramLink::bind(loopback()).await.expect("client bind");
        assert!(matches!(
            host.send_line("GAMESTART"),
            Err(SessionError::NotConnected)
        ));

        let (host_tx, mut host_rx) = mpsc::channel(8);
        let _host_reader = host.spawn_reader(host_tx);
        let (client_tx, mut client_rx) = mpsc::channel(8);
        let _client_reader = client.spawn_reader(client_tx);

        client.set_peer(host.local_addr().expect("host addr"));
        client.send_line("INPUT:LEFT:9").expect("client send");
        let received = timeout(WAIT, host_rx.recv()).await.expect("host receives");
        assert_eq!(
            received,
            Some(Inbound {
                channel: Channel::Datagram,
                message: Message::Input {
                    dir: Direction::Left,
                    tick: Some(9)
                }
            })
        );
        assert_eq!(host.peer(), Some(client.local_addr().expect("client addr")));

        host.send_line("GAMESTART").expect("host send");
        let reply = timeout(WAIT, client_rx.recv()).await.expect("client receives");
        assert_eq!(reply.map(|inbound| inbound.message), Some(Message::GameStart));
    }

    #[tokio::test]
    async fn outbound_queue_policy_decides_full_stream_handling() {
        let datagram = DatagramLink::bind(loopback()).await.expect("bind");
        let (tx, rx) = mpsc::channel(1);
        let outbound = Outbound::new(tx, datagram);
        outbound
            .send("GAMESTART".to_string(), QueuePolicy::FailOnFull)
            .expect("first line fits");
        outbound
            .send("GAMESTART".to_string(), QueuePolicy::DropOnFull)
            .expect("full queue drops");
        assert!(matches!(
            outbound.send("GAMESTART".to_string(), QueuePolicy::FailOnFull),
            Err(SessionError::ConnectionLost)
        ));
        drop(rx);
    }
}
