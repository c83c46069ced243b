//! UDP transport speaking OSC via `rosc`

use async_trait::async_trait;
use parking_lot::Mutex;
use rosc::{OscMessage, OscPacket};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::{from_osc, to_osc, Transport, WireMessage};
use crate::error::{MixerError, Result};
use crate::value::MixerValue;

/// Largest datagram we accept
const MAX_DATAGRAM: usize = 65_535;

/// Back-off after a socket error (e.g. ICMP port unreachable)
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Connected UDP socket plus a background receive task
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    target: SocketAddr,
    receiver: Mutex<Option<JoinHandle<()>>>,
}

impl UdpTransport {
    /// Open a socket towards `host:port` and start receiving.
    ///
    /// Returns the transport and the channel inbound messages arrive on.
    pub async fn connect(
        host: &str,
        port: u16,
    ) -> Result<(Self, mpsc::UnboundedReceiver<WireMessage>)> {
        let target = tokio::net::lookup_host((host, port))
            .await?
            .next()
            .ok_or_else(|| MixerError::Connection(format!("could not resolve {}", host)))?;

        let bind_addr = if target.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(target).await?;
        let socket = Arc::new(socket);

        info!("🔌 OSC socket {} -> {}", socket.local_addr()?, target);

        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(receive_loop(Arc::clone(&socket), tx));

        Ok((
            Self {
                socket,
                target,
                receiver: Mutex::new(Some(task)),
            },
            rx,
        ))
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

/// Forward every message of a packet, unwrapping bundles.
/// Returns false once nobody is listening any more.
fn forward_packet(packet: OscPacket, tx: &mpsc::UnboundedSender<WireMessage>) -> bool {
    match packet {
        OscPacket::Message(msg) => {
            let args = msg.args.iter().map(from_osc).collect::<Vec<_>>();
            trace!(address = %msg.addr, ?args, "received");
            tx.send(WireMessage::new(msg.addr, args)).is_ok()
        },
        OscPacket::Bundle(bundle) => bundle
            .content
            .into_iter()
            .all(|inner| forward_packet(inner, tx)),
    }
}

async fn receive_loop(socket: Arc<UdpSocket>, tx: mpsc::UnboundedSender<WireMessage>) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        match socket.recv(&mut buf).await {
            Ok(n) => match rosc::decoder::decode_udp(&buf[..n]) {
                Ok((_, packet)) => {
                    if !forward_packet(packet, &tx) {
                        debug!("Inbound channel closed, stopping receiver");
                        return;
                    }
                },
                Err(e) => debug!("Ignoring malformed OSC packet ({} bytes): {:?}", n, e),
            },
            Err(e) => {
                warn!("⚠️  UDP receive failed: {}", e);
                tokio::time::sleep(RECV_ERROR_BACKOFF).await;
            },
        }
    }
}

#[async_trait]
impl Transport for UdpTransport {
    fn name(&self) -> &str {
        "udp"
    }

    async fn send(&self, address: &str, args: &[MixerValue]) -> Result<()> {
        let packet = OscPacket::Message(OscMessage {
            addr: address.to_string(),
            args: args.iter().map(to_osc).collect(),
        });
        let buf = rosc::encoder::encode(&packet)
            .map_err(|e| MixerError::Transport(format!("cannot encode {}: {:?}", address, e)))?;
        self.socket
            .send(&buf)
            .await
            .map_err(|e| MixerError::Transport(format!("send to {} failed: {}", self.target, e)))?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if let Some(task) = self.receiver.lock().take() {
            task.abort();
            debug!("OSC receiver for {} stopped", self.target);
        }
        Ok(())
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        if let Some(task) = self.receiver.get_mut().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosc::OscType;

    #[tokio::test]
    async fn test_round_trip_over_loopback() {
        // Fake console: answer every read with a fixed fader value
        let console = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = console.local_addr().unwrap().port();

        let (transport, mut inbound) = UdpTransport::connect("127.0.0.1", port).await.unwrap();
        transport.send("/ch/01/mix/fader", &[]).await.unwrap();

        let mut buf = [0u8; 1024];
        let (n, from) = console.recv_from(&mut buf).await.unwrap();
        let (_, packet) = rosc::decoder::decode_udp(&buf[..n]).unwrap();
        let OscPacket::Message(request) = packet else {
            panic!("expected a message");
        };
        assert_eq!(request.addr, "/ch/01/mix/fader");
        assert!(request.args.is_empty());

        let reply = rosc::encoder::encode(&OscPacket::Message(OscMessage {
            addr: "/ch/01/mix/fader".into(),
            args: vec![OscType::Float(0.75)],
        }))
        .unwrap();
        console.send_to(&reply, from).await.unwrap();

        let msg = inbound.recv().await.unwrap();
        assert_eq!(msg, WireMessage::new("/ch/01/mix/fader", vec![MixerValue::Float(0.75)]));

        transport.close().await.unwrap();
    }
}
