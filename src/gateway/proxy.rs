//! Transparent reverse proxy to the automation backend.
//!
//! Plain HTTP requests are forwarded verbatim; WebSocket upgrades are where
//! new automation sessions begin, so each one triggers fingerprint
//! acquisition before the upgrade completes and is then bridged to the
//! backend frame for frame. Fingerprint failures never block the upgrade —
//! availability of the automation surface wins over identity freshness.

use axum::{
    body::Body,
    extract::{
        ws::{CloseFrame, Message as ClientMessage, WebSocket},
        FromRequestParts, Request, State, WebSocketUpgrade,
    },
    http::{header, uri::Uri, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::CloseFrame as UpstreamCloseFrame;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;
use tracing::{debug, info, warn};

use crate::gateway::server::GatewayState;

/// Headers that describe the connection rather than the payload; they are
/// never forwarded in either direction.
const HOP_BY_HOP: &[HeaderName] = &[
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

fn is_forwardable(name: &HeaderName) -> bool {
    !HOP_BY_HOP.contains(name)
        && name != &header::HOST
        && name != &header::CONTENT_LENGTH
        && name.as_str() != "keep-alive"
}

fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}

fn path_and_query(uri: &Uri) -> &str {
    uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/")
}

/// Fallback handler: everything that is not an introspection endpoint is
/// forwarded to the automation backend.
pub async fn proxy_handler(State(state): State<GatewayState>, request: Request) -> Response {
    if is_websocket_upgrade(request.headers()) {
        intercept_session(state, request).await
    } else {
        forward_http(state, request).await
    }
}

/// Forwards one plain HTTP request and relays the backend's response.
async fn forward_http(state: GatewayState, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let url = format!(
        "{}{}",
        state.settings.backend_http_url(),
        path_and_query(&parts.uri)
    );

    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "failed to read proxied request body");
            return (StatusCode::BAD_REQUEST, "invalid request body").into_response();
        }
    };

    let mut headers = HeaderMap::new();
    for (name, value) in parts.headers.iter() {
        if is_forwardable(name) {
            headers.insert(name.clone(), value.clone());
        }
    }

    debug!(method = %parts.method, %url, "proxying request");

    let upstream = state
        .http
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await;

    let upstream = match upstream {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, %url, "automation backend unreachable");
            return (
                StatusCode::BAD_GATEWAY,
                format!("upstream unreachable: {err}"),
            )
                .into_response();
        }
    };

    let status = upstream.status();
    let mut builder = Response::builder().status(status);
    if let Some(response_headers) = builder.headers_mut() {
        for (name, value) in upstream.headers().iter() {
            if is_forwardable(name) {
                response_headers.insert(name.clone(), value.clone());
            }
        }
    }

    match upstream.bytes().await {
        Ok(bytes) => builder
            .body(Body::from(bytes))
            .unwrap_or_else(|_| StatusCode::BAD_GATEWAY.into_response()),
        Err(err) => {
            warn!(error = %err, "failed to read upstream response body");
            (
                StatusCode::BAD_GATEWAY,
                format!("upstream unreachable: {err}"),
            )
                .into_response()
        }
    }
}

/// Handles a WebSocket upgrade: acquires a fingerprint for the new session,
/// records it, and bridges the connection to the backend.
///
/// Acquisition happens before the upgrade response is produced, so it is
/// synchronous from the client's perspective; its failure only costs the
/// session a fresh identity, never the connection.
async fn intercept_session(state: GatewayState, request: Request) -> Response {
    let (mut parts, _body) = request.into_parts();
    let target = format!(
        "{}{}",
        state.settings.backend_ws_url(),
        path_and_query(&parts.uri)
    );

    match state
        .fingerprint
        .fetch(&state.settings.os_type, state.settings.os_spec.as_deref())
        .await
    {
        Ok(descriptor) => {
            info!(
                session_id = %descriptor.session_id,
                user_agent = %descriptor.user_agent(),
                "new automation session"
            );
            state.registry.insert(&descriptor);
        }
        Err(err) => {
            warn!(error = %err, "session proceeds without a fingerprint");
        }
    }

    match WebSocketUpgrade::from_request_parts(&mut parts, &state).await {
        Ok(upgrade) => upgrade.on_upgrade(move |socket| bridge_session(socket, target)),
        Err(rejection) => rejection.into_response(),
    }
}

/// Relays frames between the client socket and the backend until either
/// side closes.
async fn bridge_session(client: WebSocket, target: String) {
    let upstream = match tokio_tungstenite::connect_async(target.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(err) => {
            warn!(error = %err, %target, "cannot open backend WebSocket");
            let mut client = client;
            let _ = client.send(ClientMessage::Close(None)).await;
            return;
        }
    };

    let (mut client_tx, mut client_rx) = client.split();
    let (mut upstream_tx, mut upstream_rx) = upstream.split();

    loop {
        tokio::select! {
            from_client = client_rx.next() => {
                let Some(Ok(message)) = from_client else { break };
                let closing = matches!(message, ClientMessage::Close(_));
                if let Some(translated) = client_to_upstream(message) {
                    if upstream_tx.send(translated).await.is_err() {
                        break;
                    }
                }
                if closing {
                    break;
                }
            }
            from_upstream = upstream_rx.next() => {
                let Some(Ok(message)) = from_upstream else { break };
                let closing = matches!(message, UpstreamMessage::Close(_));
                if let Some(translated) = upstream_to_client(message) {
                    if client_tx.send(translated).await.is_err() {
                        break;
                    }
                }
                if closing {
                    break;
                }
            }
        }
    }

    debug!(%target, "session bridge closed");
}

fn client_to_upstream(message: ClientMessage) -> Option<UpstreamMessage> {
    match message {
        ClientMessage::Text(text) => Some(UpstreamMessage::Text(text)),
        ClientMessage::Binary(data) => Some(UpstreamMessage::Binary(data)),
        ClientMessage::Ping(data) => Some(UpstreamMessage::Ping(data)),
        ClientMessage::Pong(data) => Some(UpstreamMessage::Pong(data)),
        ClientMessage::Close(frame) => Some(UpstreamMessage::Close(frame.map(|f| {
            UpstreamCloseFrame {
                code: f.code.into(),
                reason: f.reason,
            }
        }))),
    }
}

fn upstream_to_client(message: UpstreamMessage) -> Option<ClientMessage> {
    match message {
        UpstreamMessage::Text(text) => Some(ClientMessage::Text(text)),
        UpstreamMessage::Binary(data) => Some(ClientMessage::Binary(data)),
        UpstreamMessage::Ping(data) => Some(ClientMessage::Ping(data)),
        UpstreamMessage::Pong(data) => Some(ClientMessage::Pong(data)),
        UpstreamMessage::Close(frame) => Some(ClientMessage::Close(frame.map(|f| CloseFrame {
            code: f.code.into(),
            reason: f.reason,
        }))),
        // Raw frames are an internal tungstenite detail
        UpstreamMessage::Frame(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_websocket_upgrade_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_websocket_upgrade(&headers));

        headers.insert(header::UPGRADE, "websocket".parse().unwrap());
        assert!(is_websocket_upgrade(&headers));

        headers.insert(header::UPGRADE, "WebSocket".parse().unwrap());
        assert!(is_websocket_upgrade(&headers));

        headers.insert(header::UPGRADE, "h2c".parse().unwrap());
        assert!(!is_websocket_upgrade(&headers));
    }

    #[test]
    fn test_hop_by_hop_headers_filtered() {
        assert!(!is_forwardable(&header::CONNECTION));
        assert!(!is_forwardable(&header::UPGRADE));
        assert!(!is_forwardable(&header::HOST));
        assert!(!is_forwardable(&header::CONTENT_LENGTH));
        assert!(is_forwardable(&header::ACCEPT));
        assert!(is_forwardable(&header::AUTHORIZATION));
        assert!(is_forwardable(&header::USER_AGENT));
    }

    #[test]
    fn test_path_and_query_preserved() {
        let uri: Uri = "http://gateway/devtools/browser?token=abc".parse().unwrap();
        assert_eq!(path_and_query(&uri), "/devtools/browser?token=abc");

        let bare: Uri = "/".parse().unwrap();
        assert_eq!(path_and_query(&bare), "/");
    }

    #[test]
    fn test_close_frame_translation_roundtrip() {
        let frame = ClientMessage::Close(Some(CloseFrame {
            code: 1000,
            reason: "done".into(),
        }));

        let upstream = client_to_upstream(frame).unwrap();
        let UpstreamMessage::Close(Some(inner)) = &upstream else {
            panic!("expected close frame");
        };
        assert_eq!(u16::from(inner.code), 1000);

        let back = upstream_to_client(upstream).unwrap();
        let ClientMessage::Close(Some(inner)) = back else {
            panic!("expected close frame");
        };
        assert_eq!(inner.code, 1000);
        assert_eq!(inner.reason, "done");
    }
}
