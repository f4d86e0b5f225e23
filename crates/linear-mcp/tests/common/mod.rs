//! Shared helpers for WebSocket tests.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long to wait for a frame that should arrive.
pub const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

pub fn endpoint(addr: SocketAddr) -> String {
    format!("ws://{}/mcp", addr)
}

/// Connect offering the `mcp` subprotocol.
pub async fn connect(addr: SocketAddr) -> Client {
    let mut request = endpoint(addr).into_client_request().unwrap();
    request
        .headers_mut()
        .insert("Sec-WebSocket-Protocol", HeaderValue::from_static("mcp"));

    let (client, response) = connect_async(request).await.unwrap();
    assert_eq!(
        response.headers().get("Sec-WebSocket-Protocol").unwrap(),
        "mcp"
    );
    client
}

pub async fn send_json(client: &mut Client, value: Value) {
    client
        .send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

pub async fn send_raw(client: &mut Client, text: &str) {
    client.send(Message::Text(text.to_string().into())).await.unwrap();
}

/// Next text frame parsed as JSON, or `None` if nothing arrives in `wait`.
pub async fn next_json(client: &mut Client, wait: Duration) -> Option<Value> {
    loop {
        let frame = tokio::time::timeout(wait, client.next()).await.ok()??.ok()?;
        if let Message::Text(text) = frame {
            return Some(serde_json::from_str(&text).unwrap());
        }
    }
}

pub fn ping(id: i64) -> Value {
    serde_json::json!({"jsonrpc": "2.0", "id": id, "method": "ping"})
}
