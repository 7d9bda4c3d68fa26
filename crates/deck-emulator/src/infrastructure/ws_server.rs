//! WebSocket server: accept loop and per-session tasks.
//!
//! Each accepted connection becomes one client session of the virtual device:
//!
//! 1. The WebSocket handshake completes and the session gets a fresh UUID.
//! 2. A writer task drains the session's outbound channel into the socket.
//!    The sender half of that channel is registered with the device as the
//!    session's [`DeviceTransport`](crate::application::DeviceTransport).
//! 3. The reader loop parses JSON frames and forwards them to the device.
//! 4. When either side ends, the session is disconnected from the device.
//!
//! Shutdown is triggered by clearing the shared `running` flag (set by the
//! Ctrl+C handler in the binary) or by stopping the device.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use deck_core::SessionId;

use crate::application::DeviceHandle;
use crate::domain::messages::{ClientToDeviceMsg, DeviceToClientMsg};

/// How long one `accept()` may wait before the shutdown flag is checked again.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `bind_addr` and serves client sessions until `running` is cleared
/// or the device stops.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot be bound.
pub async fn run_server(
    bind_addr: SocketAddr,
    device: DeviceHandle,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind emulator WebSocket listener on {bind_addr}"))?;

    info!("emulator WebSocket listening on {bind_addr}");
    serve(listener, device, running).await;
    Ok(())
}

/// Accept loop over an already bound listener.
pub async fn serve(listener: TcpListener, device: DeviceHandle, running: Arc<AtomicBool>) {
    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping emulator accept loop");
            break;
        }
        if !device.is_running() {
            info!("virtual device stopped; stopping emulator accept loop");
            break;
        }

        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new client connection from {peer_addr}");
                let device = device.clone();
                tokio::spawn(async move {
                    handle_client_session(stream, peer_addr, device).await;
                });
            }
            Ok(Err(e)) => {
                // Transient (e.g. out of file descriptors); keep accepting.
                error!("accept error: {e}");
            }
            Err(_) => {}
        }
    }
}

// ── Per-session handler ───────────────────────────────────────────────────────

async fn handle_client_session(stream: TcpStream, peer_addr: SocketAddr, device: DeviceHandle) {
    match run_session(stream, peer_addr, device).await {
        Ok(()) => debug!("client {peer_addr} closed"),
        Err(e) => warn!("client {peer_addr} closed with error: {e:#}"),
    }
}

async fn run_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    device: DeviceHandle,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let session: SessionId = Uuid::new_v4();
    info!("session {session} established with {peer_addr}");

    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<DeviceToClientMsg>();
    device
        .connect_client(session, out_tx)
        .context("virtual device is not running")?;

    // ── Writer: device → client ───────────────────────────────────────────────
    //
    // Ends when the device drops the transport (disconnect or quit) or the
    // socket refuses a write.
    let mut writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    error!("session {session}: JSON serialization error: {e}");
                    continue;
                }
            };
            if ws_tx.send(WsMessage::Text(json)).await.is_err() {
                debug!("session {session}: WebSocket send failed (client gone)");
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    // ── Reader: client → device ───────────────────────────────────────────────
    let reader = async {
        loop {
            let frame = match ws_rx.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) => {
                    debug!("session {session}: WebSocket closed");
                    break;
                }
                Some(Err(e)) => {
                    warn!("session {session}: WebSocket error: {e}");
                    break;
                }
                None => break,
            };

            match frame {
                WsMessage::Text(text) => match serde_json::from_str::<ClientToDeviceMsg>(&text) {
                    Ok(msg) => {
                        debug!("session {session}: client → device: {msg:?}");
                        if device.client_message(session, msg).is_err() {
                            break;
                        }
                    }
                    Err(e) => debug!("session {session}: unparseable frame ignored: {e}"),
                },
                WsMessage::Binary(data) => {
                    debug!(
                        "session {session}: binary frame ({} bytes) ignored",
                        data.len()
                    );
                }
                WsMessage::Close(_) => break,
                WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
            }
        }
    };

    tokio::select! {
        _ = reader => debug!("session {session}: client stream ended"),
        _ = &mut writer => debug!("session {session}: device ended the session"),
    }

    let _ = device.disconnect_client(session);
    writer.abort();
    info!("session {session} disconnected");
    Ok(())
}
