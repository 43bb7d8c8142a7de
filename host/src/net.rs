//! UDP adapter: datagrams in, channel events out. The session never sees a
//! socket.

use log::{debug, warn};
use shared::transport::{Channel, ChannelError, ChannelEvent};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;

/// Fire-and-forget channel to one remote address. A full socket buffer
/// counts as sent; only a dead socket reports an error.
pub struct UdpChannel {
    label: String,
    addr: SocketAddr,
    socket: Arc<UdpSocket>,
    open: Arc<AtomicBool>,
}

impl UdpChannel {
    fn new(addr: SocketAddr, socket: Arc<UdpSocket>, open: Arc<AtomicBool>) -> Self {
        Self {
            label: addr.to_string(),
            addr,
            socket,
            open,
        }
    }
}

impl Channel for UdpChannel {
    fn send(&self, bytes: &[u8]) -> Result<(), ChannelError> {
        if !self.is_open() {
            return Err(ChannelError::Closed);
        }
        match self.socket.try_send_to(bytes, self.addr) {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(()),
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

/// Receives datagrams and translates them to session events. The first
/// datagram from an address synthesizes `Connected` with a channel back to
/// it; an address silent past `timeout` gets a synthesized `Disconnected`.
/// The task ends when the session drops its event receiver.
pub fn spawn_udp_listener(
    socket: Arc<UdpSocket>,
    events: mpsc::Sender<ChannelEvent>,
    timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = vec![0u8; 2048];
        let mut peers: HashMap<SocketAddr, (Instant, Arc<AtomicBool>)> = HashMap::new();
        let mut sweep = time::interval(timeout / 4);

        loop {
            tokio::select! {
                received = socket.recv_from(&mut buf) => {
                    match received {
                        Ok((len, addr)) => {
                            match peers.get_mut(&addr) {
                                Some((seen, _)) => *seen = Instant::now(),
                                None => {
                                    debug!("First datagram from {}", addr);
                                    let open = Arc::new(AtomicBool::new(true));
                                    let channel = Box::new(UdpChannel::new(
                                        addr,
                                        socket.clone(),
                                        open.clone(),
                                    ));
                                    let connected = ChannelEvent::Connected {
                                        peer: addr.to_string(),
                                        channel,
                                    };
                                    if events.send(connected).await.is_err() {
                                        return;
                                    }
                                    peers.insert(addr, (Instant::now(), open));
                                }
                            }
                            let data = ChannelEvent::Data {
                                peer: addr.to_string(),
                                bytes: buf[..len].to_vec(),
                            };
                            if events.send(data).await.is_err() {
                                return;
                            }
                        }
                        Err(err) => warn!("UDP receive error: {}", err),
                    }
                }
                _ = sweep.tick() => {
                    let expired: Vec<SocketAddr> = peers
                        .iter()
                        .filter(|(_, (seen, _))| seen.elapsed() > timeout)
                        .map(|(addr, _)| *addr)
                        .collect();
                    for addr in expired {
                        if let Some((_, open)) = peers.remove(&addr) {
                            open.store(false, Ordering::Relaxed);
                            debug!("Peer {} timed out", addr);
                            let gone = ChannelEvent::Disconnected {
                                peer: addr.to_string(),
                            };
                            if events.send(gone).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_datagram_synthesizes_connected_then_data() {
        let server = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let server_addr = server.local_addr().unwrap();
        let (tx, mut rx) = mpsc::channel(32);
        spawn_udp_listener(server, tx, Duration::from_secs(5));

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(b"hello", server_addr).await.unwrap();
        let client_addr = client.local_addr().unwrap().to_string();

        match rx.recv().await.unwrap() {
            ChannelEvent::Connected { peer, channel } => {
                assert_eq!(peer, client_addr);
                assert!(channel.is_open());
            }
            _ => panic!("Expected Connected first"),
        }
        match rx.recv().await.unwrap() {
            ChannelEvent::Data { peer, bytes } => {
                assert_eq!(peer, client_addr);
                assert_eq!(bytes, b"hello".to_vec());
            }
            _ => panic!("Expected Data second"),
        }
    }

    #[tokio::test]
    async fn test_channel_sends_back_to_the_peer() {
        let server = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let server_addr = server.local_addr().unwrap();
        let (tx, mut rx) = mpsc::channel(32);
        spawn_udp_listener(server, tx, Duration::from_secs(5));

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(b"hello", server_addr).await.unwrap();

        let channel = match rx.recv().await.unwrap() {
            ChannelEvent::Connected { channel, .. } => channel,
            _ => panic!("Expected Connected first"),
        };
        channel.send(b"welcome").unwrap();

        let mut buf = [0u8; 64];
        let (len, from) = client.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"welcome");
        assert_eq!(from, server_addr);
    }

    #[tokio::test]
    async fn test_silent_peer_times_out() {
        let server = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let server_addr = server.local_addr().unwrap();
        let (tx, mut rx) = mpsc::channel(32);
        spawn_udp_listener(server, tx, Duration::from_millis(200));

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(b"ping", server_addr).await.unwrap();
        let client_addr = client.local_addr().unwrap().to_string();

        let channel = match rx.recv().await.unwrap() {
            ChannelEvent::Connected { channel, .. } => channel,
            _ => panic!("Expected Connected first"),
        };
        rx.recv().await.unwrap();

        // No further traffic; the sweep retires the peer.
        match rx.recv().await.unwrap() {
            ChannelEvent::Disconnected { peer } => assert_eq!(peer, client_addr),
            _ => panic!("Expected Disconnected"),
        }
        assert!(!channel.is_open());
    }
}
