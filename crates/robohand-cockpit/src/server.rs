//! [`CockpitServer`] – HTTP + WebSocket server for the dashboard.
//!
//! * Regular HTTP requests → 200 OK with the embedded dashboard HTML.
//! * WebSocket upgrades → one-way stream of state updates from the
//!   [`EventBus`].

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use robohand_middleware::EventBus;
use robohand_types::HandError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Default listening address.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default TCP port for the dashboard.
pub const DEFAULT_PORT: u16 = 5000;

const DASHBOARD_HTML: &str = include_str!("dashboard.html");

// ---------------------------------------------------------------------------
// CockpitServer
// ---------------------------------------------------------------------------

/// Serves the dashboard and relays the [`EventBus`] to every browser.
///
/// # Example
///
/// ```rust,no_run
/// use robohand_middleware::EventBus;
/// use robohand_cockpit::CockpitServer;
///
/// # async fn demo() -> Result<(), robohand_types::HandError> {
/// let bus = EventBus::default();
/// CockpitServer::new(bus).with_port(8000).run().await
/// # }
/// ```
pub struct CockpitServer {
    bus: EventBus,
    host: String,
    port: u16,
}

impl CockpitServer {
    /// Create a server backed by `bus` on [`DEFAULT_HOST`]:[`DEFAULT_PORT`].
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Bind the configured address and serve until the task is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`HandError::Server`] if the listener cannot bind.
    pub async fn run(self) -> Result<(), HandError> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| HandError::Server(format!("bind error on {addr}: {e}")))?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound `listener`.
    ///
    /// # Errors
    ///
    /// Returns [`HandError::Server`] if the listener has no local address.
    pub async fn serve(self, listener: TcpListener) -> Result<(), HandError> {
        let local = listener
            .local_addr()
            .map_err(|e| HandError::Server(format!("listener address: {e}")))?;
        info!(%local, "dashboard listening");

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let bus = self.bus.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, peer, bus).await {
                            debug!(%peer, error = %e, "dashboard client dropped");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "accept failed"),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Per-connection handler
// ---------------------------------------------------------------------------

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    bus: EventBus,
) -> Result<(), HandError> {
    // `peek` leaves the request in the socket for the WebSocket handshake.
    let mut buf = [0u8; 1024];
    let n = stream
        .peek(&mut buf)
        .await
        .map_err(|e| HandError::Server(format!("peek error from {peer}: {e}")))?;

    if is_websocket_upgrade(&String::from_utf8_lossy(&buf[..n])) {
        stream_updates(stream, peer, bus).await
    } else {
        serve_html(stream).await
    }
}

fn is_websocket_upgrade(request_head: &str) -> bool {
    request_head.lines().any(|line| {
        let line = line.to_ascii_lowercase();
        line.starts_with("upgrade:") && line.contains("websocket")
    })
}

async fn serve_html(mut stream: TcpStream) -> Result<(), HandError> {
    // Drain the request head so closing the socket does not reset it.
    let mut request = [0u8; 1024];
    let _ = stream.read(&mut request).await;

    let response = format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/html; charset=utf-8\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        DASHBOARD_HTML.len(),
        DASHBOARD_HTML
    );
    stream
        .write_all(response.as_bytes())
        .await
        .map_err(|e| HandError::Server(format!("HTTP write error: {e}")))?;
    stream
        .shutdown()
        .await
        .map_err(|e| HandError::Server(format!("HTTP shutdown error: {e}")))
}

// ---------------------------------------------------------------------------
// WebSocket: EventBus → browser
// ---------------------------------------------------------------------------

async fn stream_updates(
    stream: TcpStream,
    peer: SocketAddr,
    bus: EventBus,
) -> Result<(), HandError> {
    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| HandError::Server(format!("WS handshake from {peer}: {e}")))?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    let mut updates = bus.subscribe();
    info!(%peer, "observer connected");

    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(update) = update else { break };
                let json = match serde_json::to_string(&update) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "state update not serializable");
                        continue;
                    }
                };
                if ws_tx.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Observers are read-only.
                Some(Ok(_)) => {}
            },
        }
    }

    info!(%peer, "observer disconnected");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
