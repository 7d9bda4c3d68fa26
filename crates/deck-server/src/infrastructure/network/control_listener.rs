//! UDP listener for the OSC control protocol.
//!
//! One socket serves both directions:
//!
//! - **Inbound**: each datagram is decoded, bundles are flattened, and every
//!   message is handed to the [`ControlService`] in order.  Anything that
//!   fails to decode or route is dropped and logged at `debug`; the port is
//!   open and unauthenticated, so garbage is expected.
//! - **Outbound**: the engine queues messages and time-tagged bundles through
//!   a [`ControlHandle`].  They are sent fire-and-forget from the same socket.
//!
//! If the port cannot be bound the failure is logged and the handle returned
//! is inert: outbound requests are dropped and no control input arrives.  The
//! rest of the process keeps running.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use deck_core::protocol::{
    bundle_packet, decode_datagram, encode_packet, message_packet, OscMessage, OscPacket, OscType,
};

use crate::application::ControlService;

/// Default UDP port of the control protocol.
pub const DEFAULT_CONTROL_PORT: u16 = 12321;

/// How long the loop may sit idle before the shutdown flag is checked again.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// Largest UDP payload.  A smaller buffer silently truncates long text
/// arguments and bundles.
pub const MAX_DATAGRAM_SIZE: usize = 65_535;

#[derive(Debug, Error)]
pub enum ListenerError {
    /// The socket could not be bound or configured for broadcast.
    #[error("failed to bind control listener on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// A packet queued for transmission.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub host: String,
    pub port: u16,
    pub packet: OscPacket,
}

// ── ControlHandle ─────────────────────────────────────────────────────────────

/// Cloneable handle for outbound control messages.
///
/// All sends are fire-and-forget: no confirmation, no retry.
#[derive(Debug, Clone, Default)]
pub struct ControlHandle {
    outbound: Option<mpsc::UnboundedSender<OutboundRequest>>,
    local_addr: Option<SocketAddr>,
}

impl ControlHandle {
    /// A handle with no socket behind it.
    pub fn inert() -> Self {
        Self::default()
    }

    /// `true` while a listener task owns a bound socket.
    pub fn is_active(&self) -> bool {
        self.outbound.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Address the listener is bound to, if any.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Sends one message to `host:port` now.
    pub fn send(&self, host: &str, port: u16, address: &str, args: Vec<OscType>) {
        self.enqueue(OutboundRequest {
            host: host.to_string(),
            port,
            packet: message_packet(address, args),
        });
    }

    /// Sends `messages` as one bundle tagged for execution `delay_secs` from
    /// now.  The datagram leaves immediately; the receiver does the waiting.
    pub fn send_bundle(&self, host: &str, port: u16, delay_secs: f64, messages: Vec<OscMessage>) {
        self.enqueue(OutboundRequest {
            host: host.to_string(),
            port,
            packet: bundle_packet(delay_secs, messages, SystemTime::now()),
        });
    }

    fn enqueue(&self, req: OutboundRequest) {
        match &self.outbound {
            Some(tx) => {
                if tx.send(req).is_err() {
                    debug!("control listener stopped; outbound packet dropped");
                }
            }
            None => debug!(
                "control listener inert; outbound packet to {}:{} dropped",
                req.host, req.port
            ),
        }
    }
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

/// Binds a UDP socket on `addr` with broadcast enabled.
///
/// # Errors
///
/// Returns [`ListenerError::BindFailed`] if binding or enabling broadcast
/// fails.
pub async fn bind_socket(addr: SocketAddr) -> Result<UdpSocket, ListenerError> {
    let socket = UdpSocket::bind(addr)
        .await
        .map_err(|source| ListenerError::BindFailed { addr, source })?;
    socket
        .set_broadcast(true)
        .map_err(|source| ListenerError::BindFailed { addr, source })?;
    Ok(socket)
}

/// Binds `addr` and starts the listener, or returns an inert handle if the
/// port is unavailable.
pub async fn start_control_listener(
    addr: SocketAddr,
    service: ControlService,
    running: Arc<AtomicBool>,
) -> ControlHandle {
    match bind_socket(addr).await {
        Ok(socket) => spawn_listener(socket, service, running),
        Err(e) => {
            error!("{e}; control protocol unavailable");
            ControlHandle::inert()
        }
    }
}

/// Starts the listener task on an already bound socket.
pub fn spawn_listener(
    socket: UdpSocket,
    service: ControlService,
    running: Arc<AtomicBool>,
) -> ControlHandle {
    let local_addr = socket.local_addr().ok();
    let (tx, rx) = mpsc::unbounded_channel();

    if let Some(addr) = local_addr {
        info!("control listener on UDP {addr}");
    }
    tokio::spawn(listen_loop(socket, service, rx, running));

    ControlHandle {
        outbound: Some(tx),
        local_addr,
    }
}

async fn listen_loop(
    socket: UdpSocket,
    service: ControlService,
    mut outbound: mpsc::UnboundedReceiver<OutboundRequest>,
    running: Arc<AtomicBool>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping control listener");
            break;
        }

        tokio::select! {
            received = socket.recv_from(&mut buf) => match received {
                Ok((len, peer)) => handle_datagram(&buf[..len], peer, &service),
                // ICMP port-unreachable from an earlier send surfaces here on
                // some platforms; the socket is still usable.
                Err(e) => warn!("control recv error: {e}"),
            },
            Some(req) = outbound.recv() => send_request(&socket, req).await,
            _ = tokio::time::sleep(SHUTDOWN_POLL) => {}
        }
    }
}

fn handle_datagram(datagram: &[u8], peer: SocketAddr, service: &ControlService) {
    match decode_datagram(datagram) {
        Ok(messages) => {
            for msg in &messages {
                service.handle_message(msg);
            }
        }
        Err(e) => debug!("datagram from {peer} dropped: {e}"),
    }
}

async fn send_request(socket: &UdpSocket, req: OutboundRequest) {
    let bytes = match encode_packet(&req.packet) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("{e}");
            return;
        }
    };
    if let Err(e) = socket.send_to(&bytes, (req.host.as_str(), req.port)).await {
        debug!("send to {}:{} failed: {e}", req.host, req.port);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inert_handle_is_not_active() {
        let handle = ControlHandle::inert();
        assert!(!handle.is_active());
        assert_eq!(handle.local_addr(), None);
    }

    #[test]
    fn test_inert_handle_drops_sends_without_panicking() {
        let handle = ControlHandle::inert();
        handle.send("127.0.0.1", 9, "/x", vec![OscType::Int(1)]);
        handle.send_bundle("127.0.0.1", 9, 1.0, vec![]);
    }

    #[test]
    fn test_handle_with_closed_listener_is_not_active() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ControlHandle {
            outbound: Some(tx),
            local_addr: None,
        };
        assert!(handle.is_active());

        drop(rx);

        assert!(!handle.is_active());
        handle.send("127.0.0.1", 9, "/x", vec![]);
    }

    #[test]
    fn test_bind_failed_message_names_address() {
        let err = ListenerError::BindFailed {
            addr: "0.0.0.0:12321".parse().unwrap(),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        assert!(err.to_string().contains("0.0.0.0:12321"));
    }
}
