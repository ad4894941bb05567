//! A named I/O role: a read framing mode, optional heartbeat, zero or more
//! listening sockets and the clients currently attached to them
//! (spec.md §3.6, §4.7).

use super::framing::{Frame, Framer, FramingMode};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

/// The writer side of one connected client, as seen by the rest of the
/// system (maintenance loop, encoders broadcasting forwarded traffic).
pub struct OutboundHandle {
    pub tx: mpsc::Sender<Vec<u8>>,
    pub receiver_id: u64,
    pub positions_forwarded: Arc<AtomicU64>,
}

pub struct Service {
    pub name: String,
    pub framing: FramingMode,
    pub separator: u8,
    pub heartbeat_interval: Option<Duration>,
    pub sendq_max: usize,
    pub clients: Arc<RwLock<HashMap<u64, OutboundHandle>>>,
    next_client_id: AtomicU64,
}

impl Service {
    pub fn new(
        name: impl Into<String>,
        framing: FramingMode,
        separator: u8,
        heartbeat_interval: Option<Duration>,
        sendq_max: usize,
    ) -> Arc<Self> {
        Arc::new(Service {
            name: name.into(),
            framing,
            separator,
            heartbeat_interval,
            sendq_max,
            clients: Arc::new(RwLock::new(HashMap::new())),
            next_client_id: AtomicU64::new(1),
        })
    }

    /// Binds a listening socket and accepts connections forever, spawning
    /// one task per client. Decoded frames are forwarded on `frame_tx`
    /// tagged with the originating client id.
    pub async fn listen(
        self: Arc<Self>,
        addr: SocketAddr,
        frame_tx: mpsc::Sender<(u64, Frame)>,
    ) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!("service {}: listening on {addr}", self.name);
        loop {
            let (stream, peer) = listener.accept().await?;
            let service = self.clone();
            let frame_tx = frame_tx.clone();
            tokio::spawn(async move {
                service.handle_connection(stream, peer, frame_tx).await;
            });
        }
    }

    async fn handle_connection(
        self: Arc<Self>,
        stream: TcpStream,
        peer: SocketAddr,
        frame_tx: mpsc::Sender<(u64, Frame)>,
    ) {
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        debug!("service {}: client {id} connected from {peer}", self.name);

        let (mut reader, mut writer) = stream.into_split();
        let (out_tx, mut out_rx) = mpsc::channel::<Vec<u8>>(self.sendq_max.max(1));
        self.clients.write().await.insert(
            id,
            OutboundHandle {
                tx: out_tx,
                receiver_id: build_receiver_id(peer),
                positions_forwarded: Arc::new(AtomicU64::new(0)),
            },
        );

        let writer_task = tokio::spawn(async move {
            while let Some(bytes) = out_rx.recv().await {
                if writer.write_all(&bytes).await.is_err() {
                    break;
                }
            }
        });

        let mut framer = Framer::with_separator(self.framing, self.separator);
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    let frames = framer.push(&buf[..n]);
                    for frame in frames {
                        if frame_tx.send((id, frame)).await.is_err() {
                            break;
                        }
                    }
                    if framer.garbage_exceeded() {
                        warn!(
                            "service {}: client {id} exceeded garbage threshold, disconnecting",
                            self.name
                        );
                        break;
                    }
                }
                Err(e) => {
                    debug!("service {}: client {id} read error: {e}", self.name);
                    break;
                }
            }
        }

        writer_task.abort();
        self.clients.write().await.remove(&id);
        debug!("service {}: client {id} disconnected", self.name);
    }

    /// Broadcasts `bytes` to every currently connected client, dropping
    /// (and logging) any whose send queue is full rather than blocking the
    /// whole service on one slow peer.
    pub async fn broadcast(&self, bytes: &[u8]) {
        let clients = self.clients.read().await;
        for (id, handle) in clients.iter() {
            if handle.tx.try_send(bytes.to_vec()).is_err() {
                debug!("service {}: client {id} send queue full, dropping", self.name);
            }
        }
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }
}

fn build_receiver_id(peer: SocketAddr) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    peer.hash(&mut hasher);
    hasher.finish()
}

/// Parses a leading PROXY v1 header (`PROXY TCP4 src dst sport dport\r\n`)
/// sniffed on new "ingest" connections (spec.md §4.7), returning the source
/// address/port to fold into the client's receiver-id hash.
pub fn parse_proxy_v1(line: &str) -> Option<(String, u16)> {
    let mut parts = line.trim().split_whitespace();
    if parts.next()? != "PROXY" {
        return None;
    }
    let _proto = parts.next()?; // TCP4/TCP6
    let src_ip = parts.next()?;
    let _dst_ip = parts.next()?;
    let src_port: u16 = parts.next()?.parse().ok()?;
    Some((src_ip.to_string(), src_port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_proxy_v1_header() {
        let line = "PROXY TCP4 192.168.1.1 192.168.1.2 34000 51820\r\n";
        let (ip, port) = parse_proxy_v1(line).unwrap();
        assert_eq!(ip, "192.168.1.1");
        assert_eq!(port, 34000);
    }

    #[test]
    fn rejects_non_proxy_line() {
        assert!(parse_proxy_v1("*8D4840D6;\n").is_none());
    }
}
