//! UDP link to the authority. One connected socket, one background task
//! that turns datagrams into channel events for the session.

use log::{debug, warn};
use shared::transport::{Channel, ChannelError, ChannelEvent};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Send half of the authority link handed to the session inside the
/// `Connected` event. Sends are best-effort; a full send buffer drops the
/// datagram rather than blocking.
pub struct UdpChannel {
    label: String,
    socket: Arc<UdpSocket>,
    open: Arc<AtomicBool>,
}

impl Channel for UdpChannel {
    fn send(&self, bytes: &[u8]) -> Result<(), ChannelError> {
        if !self.open.load(Ordering::Relaxed) {
            return Err(ChannelError::Closed);
        }
        match self.socket.try_send(bytes) {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => Ok(()),
            Err(err) => {
                self.open.store(false, Ordering::Relaxed);
                Err(ChannelError::Io(err.to_string()))
            }
        }
    }

    fn peer(&self) -> &str {
        &self.label
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }
}

/// Binds an ephemeral port, connects it to the authority, and spawns the
/// receive loop. The session sees `Connected` first, then `Data` per
/// datagram, then `Disconnected` once the authority stays silent past
/// `timeout`.
pub async fn connect_udp(
    server: &str,
    events: mpsc::Sender<ChannelEvent>,
    timeout: Duration,
) -> std::io::Result<JoinHandle<()>> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(server).await?;
    let peer = socket.peer_addr()?;
    let socket = Arc::new(socket);
    Ok(tokio::spawn(run_link(socket, peer, events, timeout)))
}

async fn run_link(
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
    events: mpsc::Sender<ChannelEvent>,
    timeout: Duration,
) {
    let label = peer.to_string();
    let open = Arc::new(AtomicBool::new(true));
    let channel = Box::new(UdpChannel {
        label: label.clone(),
        socket: socket.clone(),
        open: open.clone(),
    });
    let connected = ChannelEvent::Connected {
        peer: label.clone(),
        channel,
    };
    if events.send(connected).await.is_err() {
        return;
    }

    let mut buf = vec![0u8; 2048];
    let mut last_heard = Instant::now();
    let mut sweep = time::interval(timeout / 4);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            received = socket.recv(&mut buf) => {
                match received {
                    Ok(len) => {
                        last_heard = Instant::now();
                        let event = ChannelEvent::Data {
                            peer: label.clone(),
                            bytes: buf[..len].to_vec(),
                        };
                        if events.send(event).await.is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        // A connected socket surfaces ICMP unreachable as a
                        // recv error; back off instead of spinning on it.
                        debug!("Receive error on authority link: {}", err);
                        time::sleep(Duration::from_millis(50)).await;
                    }
                }
            }
            _ = sweep.tick() => {
                if last_heard.elapsed() > timeout {
                    warn!("Authority silent for {:?}, closing link", timeout);
                    open.store(false, Ordering::Relaxed);
                    let _ = events.send(ChannelEvent::Disconnected { peer: label }).await;
                    return;
                }
            }
        }
    }
}
