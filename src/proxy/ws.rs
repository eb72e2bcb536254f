//! WebSocket Bridging
//!
//! Bridges upgrade requests on upgrade-enabled prefixes to the planner
//! backend: the client upgrade is accepted with axum, a second websocket
//! connection is dialed to the backend, and frames are pumped in both
//! directions until either side closes. Each bridged connection is
//! independent; no state is shared across connections.

use axum::{
    extract::ws::{self, WebSocket, WebSocketUpgrade},
    extract::Request,
    http::{header, HeaderMap},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite, tungstenite::client::IntoClientRequest, MaybeTlsStream,
    WebSocketStream,
};

use super::error::ProxyResult;
use super::http::filter_request_headers;
use super::rules::{target_url, ProxyRule};

type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Swap an http(s) origin for its ws(s) equivalent
fn websocket_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        url.to_string()
    }
}

/// Headers carried over to the backend handshake.
///
/// Starts from the same filter as plain forwarding (hop-by-hop dropped,
/// `Host` derived from the target URL, `Origin` rewritten), then drops the
/// handshake-owned headers the upstream client generates itself.
/// `Sec-WebSocket-Protocol` passes through so the backend can negotiate a
/// subprotocol.
fn upstream_handshake_headers(headers: &HeaderMap, target_origin: &str) -> HeaderMap {
    let mut out = filter_request_headers(headers, target_origin);
    out.remove(header::SEC_WEBSOCKET_KEY);
    out.remove(header::SEC_WEBSOCKET_VERSION);
    out.remove(header::SEC_WEBSOCKET_EXTENSIONS);
    out
}

/// Accept a client upgrade and bridge it to the backend.
///
/// The client's request headers ride along on the backend handshake, and a
/// subprotocol negotiated by the backend is echoed back to the client. The
/// backend handshake happens before the client upgrade is accepted, so a
/// dead backend surfaces as an HTTP error instead of an upgrade that
/// immediately closes.
pub async fn bridge(ws: WebSocketUpgrade, rule: &ProxyRule, req: Request) -> ProxyResult<Response> {
    let url = websocket_url(&target_url(rule, req.uri()));

    tracing::debug!(url = %url, "Bridging websocket upgrade to backend");

    let mut handshake = url.into_client_request()?;
    for (name, value) in upstream_handshake_headers(req.headers(), rule.target()) {
        if let Some(name) = name {
            handshake.headers_mut().append(name, value);
        }
    }

    let (upstream, response) = connect_async(handshake).await?;

    let ws = match response
        .headers()
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|value| value.to_str().ok())
    {
        Some(protocol) => ws.protocols([protocol.to_string()]),
        None => ws,
    };

    Ok(ws.on_upgrade(move |client| pump(client, upstream)))
}

/// Relay frames between the two sockets until either side closes
async fn pump(client: WebSocket, upstream: UpstreamSocket) {
    let (mut upstream_tx, mut upstream_rx) = upstream.split();
    let (mut client_tx, mut client_rx) = client.split();

    let mut client_to_upstream = tokio::spawn(async move {
        while let Some(Ok(msg)) = client_rx.next().await {
            let closing = matches!(msg, ws::Message::Close(_));
            if upstream_tx.send(client_to_backend(msg)).await.is_err() {
                break;
            }
            if closing {
                break;
            }
        }
    });

    let mut upstream_to_client = tokio::spawn(async move {
        while let Some(Ok(msg)) = upstream_rx.next().await {
            let Some(msg) = backend_to_client(msg) else {
                continue;
            };
            let closing = matches!(msg, ws::Message::Close(_));
            if client_tx.send(msg).await.is_err() {
                break;
            }
            if closing {
                break;
            }
        }
    });

    // Whichever direction finishes first tears down the other
    tokio::select! {
        _ = &mut client_to_upstream => upstream_to_client.abort(),
        _ = &mut upstream_to_client => client_to_upstream.abort(),
    }

    tracing::debug!("Websocket bridge closed");
}

fn client_to_backend(msg: ws::Message) -> tungstenite::Message {
    match msg {
        ws::Message::Text(text) => tungstenite::Message::Text(text),
        ws::Message::Binary(data) => tungstenite::Message::Binary(data),
        ws::Message::Ping(data) => tungstenite::Message::Ping(data),
        ws::Message::Pong(data) => tungstenite::Message::Pong(data),
        ws::Message::Close(frame) => {
            tungstenite::Message::Close(frame.map(|f| tungstenite::protocol::CloseFrame {
                code: f.code.into(),
                reason: f.reason,
            }))
        }
    }
}

/// Translate a backend frame for the client.
///
/// Raw frames never surface from a read and are skipped.
fn backend_to_client(msg: tungstenite::Message) -> Option<ws::Message> {
    match msg {
        tungstenite::Message::Text(text) => Some(ws::Message::Text(text)),
        tungstenite::Message::Binary(data) => Some(ws::Message::Binary(data)),
        tungstenite::Message::Ping(data) => Some(ws::Message::Ping(data)),
        tungstenite::Message::Pong(data) => Some(ws::Message::Pong(data)),
        tungstenite::Message::Close(frame) => Some(ws::Message::Close(frame.map(|f| {
            ws::CloseFrame {
                code: f.code.into(),
                reason: f.reason,
            }
        }))),
        tungstenite::Message::Frame(_) => None,
    }
}
