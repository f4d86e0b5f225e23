//! WebSocket transport.
//!
//! Clients connect to `/mcp` and must offer the `mcp` subprotocol; the
//! upgrade is refused otherwise. Each connection gets a writer task fed by a
//! channel, and connection events flow to the transport over a second channel,
//! so the client set is only ever touched by the task that polls
//! [`Transport::recv`].

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::{header, HeaderMap, HeaderName, Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use linear_core::config::Routing;
use tokio::net::TcpListener;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{FrameError, TransportError};
use crate::protocol::{IncomingMessage, JsonRpcResponse};
use crate::transport::{ConnectionId, Inbound, Transport};

/// Subprotocol a client must offer during the handshake.
pub const MCP_SUBPROTOCOL: &str = "mcp";

/// Path of the WebSocket endpoint.
pub const MCP_PATH: &str = "/mcp";

/// Landing page naming the endpoint URL and the required subprotocol.
fn info_page_html(addr: SocketAddr) -> String {
    let url = format!("ws://{}{}", addr, MCP_PATH);
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Linear MCP Server</title></head>
<body>
<h1>Linear MCP Server</h1>
<p>This server speaks the Model Context Protocol over WebSocket.</p>
<p>Endpoint: <code>{url}</code> (subprotocol <code>{protocol}</code>)</p>
<pre><code>const ws = new WebSocket("{url}", "{protocol}");
ws.onopen = () => ws.send(JSON.stringify({{
  jsonrpc: "2.0", id: 1, method: "tools/list"
}}));
ws.onmessage = (event) => console.log(JSON.parse(event.data));
</code></pre>
</body>
</html>
"#,
        url = url,
        protocol = MCP_SUBPROTOCOL,
    )
}

type ErrorHook = Box<dyn Fn(&TransportError) + Send + Sync>;

/// Connection lifecycle and traffic, as seen by the socket tasks.
#[derive(Debug)]
enum Event {
    Connected(ConnectionId, UnboundedSender<Utf8Bytes>),
    Message(ConnectionId, String),
    Invalid(ConnectionId, String),
    Closed(ConnectionId),
}

#[derive(Clone)]
struct AppState {
    events: UnboundedSender<Event>,
    next_id: Arc<AtomicU64>,
    local_addr: SocketAddr,
}

/// Multi-client WebSocket transport.
pub struct WebSocketTransport {
    local_addr: SocketAddr,
    routing: Routing,
    events: UnboundedReceiver<Event>,
    clients: BTreeMap<ConnectionId, UnboundedSender<Utf8Bytes>>,
    on_error: Option<ErrorHook>,
    server: JoinHandle<()>,
}

impl WebSocketTransport {
    /// Bind `addr` and start accepting connections.
    pub async fn bind(addr: &str, routing: Routing) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let (events_tx, events) = mpsc::unbounded_channel();
        let state = AppState {
            events: events_tx,
            next_id: Arc::new(AtomicU64::new(1)),
            local_addr,
        };

        let app = router(state);
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("WebSocket server error: {}", e);
            }
        });

        tracing::info!(%local_addr, %routing, "WebSocket transport listening on ws://{}{}", local_addr, MCP_PATH);

        Ok(Self {
            local_addr,
            routing,
            events,
            clients: BTreeMap::new(),
            on_error: None,
            server,
        })
    }

    /// Call `hook` for every malformed inbound frame.
    pub fn with_error_hook(mut self, hook: impl Fn(&TransportError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn routing(&self) -> Routing {
        self.routing
    }

    /// Open connections the transport currently knows about.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    fn report(&self, error: TransportError) {
        tracing::warn!(error = %error, "Dropping inbound frame");
        if let Some(hook) = &self.on_error {
            hook(&error);
        }
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.server.abort();
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn recv(&mut self) -> Result<Option<Inbound>, TransportError> {
        while let Some(event) = self.events.recv().await {
            match event {
                Event::Connected(id, tx) => {
                    self.clients.insert(id, tx);
                    tracing::info!(connection = %id, clients = self.clients.len(), "Client connected");
                }
                Event::Closed(id) => {
                    self.clients.remove(&id);
                    tracing::info!(connection = %id, clients = self.clients.len(), "Client disconnected");
                }
                Event::Invalid(id, detail) => self.report(TransportError::Malformed {
                    origin: Some(id),
                    reason: FrameError::Parse(detail),
                }),
                Event::Message(id, text) => {
                    tracing::debug!(connection = %id, "Received: {}", text);
                    match IncomingMessage::parse(&text) {
                        Ok(message) => {
                            return Ok(Some(Inbound {
                                origin: Some(id),
                                message,
                            }))
                        }
                        Err(reason) => self.report(TransportError::Malformed {
                            origin: Some(id),
                            reason,
                        }),
                    }
                }
            }
        }

        Ok(None)
    }

    async fn send(
        &mut self,
        response: &JsonRpcResponse,
        target: Option<ConnectionId>,
    ) -> Result<(), TransportError> {
        let text = Utf8Bytes::from(serde_json::to_string(response)?);
        tracing::debug!("Sending: {}", text.as_str());

        let recipients: Vec<ConnectionId> = match (self.routing, target) {
            (Routing::Requester, Some(id)) => vec![id],
            _ => self.clients.keys().copied().collect(),
        };

        let mut gone = Vec::new();
        for id in recipients {
            match self.clients.get(&id) {
                Some(tx) => {
                    if tx.send(text.clone()).is_err() {
                        gone.push(id);
                    }
                }
                None => tracing::debug!(connection = %id, "Skipping closed connection"),
            }
        }

        for id in gone {
            self.clients.remove(&id);
        }

        Ok(())
    }
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]);

    Router::new()
        .route("/", get(info_page))
        .route(MCP_PATH, get(mcp_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn info_page(State(state): State<AppState>) -> Html<String> {
    Html(info_page_html(state.local_addr))
}

fn offers_subprotocol(headers: &HeaderMap, protocol: &str) -> bool {
    headers
        .get_all(header::SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|offered| offered.trim() == protocol)
}

async fn mcp_upgrade(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    if !offers_subprotocol(&headers, MCP_SUBPROTOCOL) {
        tracing::warn!("Rejected WebSocket client without the {} subprotocol", MCP_SUBPROTOCOL);
        return (
            StatusCode::BAD_REQUEST,
            format!("WebSocket subprotocol '{}' required", MCP_SUBPROTOCOL),
        )
            .into_response();
    }

    ws.protocols([MCP_SUBPROTOCOL])
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let id = ConnectionId(state.next_id.fetch_add(1, Ordering::Relaxed));
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Utf8Bytes>();

    if state.events.send(Event::Connected(id, tx)).is_err() {
        return;
    }

    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        let event = match frame {
            Ok(Message::Text(text)) => Event::Message(id, text.as_str().to_owned()),
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => Event::Message(id, text),
                Err(e) => Event::Invalid(id, format!("binary frame is not UTF-8: {}", e)),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(connection = %id, "WebSocket error: {}", e);
                break;
            }
        };

        if state.events.send(event).is_err() {
            break;
        }
    }

    let _ = state.events.send(Event::Closed(id));
    writer.abort();
}
