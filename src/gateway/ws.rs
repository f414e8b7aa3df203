use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::envelope::{parse_inbound, Outbound, WELCOME_TEXT};
use super::AppState;
use crate::session::{ConnId, Turn};

/// Lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnState {
    Connecting,
    Open,
    Closing,
    Closed,
}

fn transition(conn: ConnId, state: &mut ConnState, next: ConnState) {
    debug!(conn = %conn, from = ?*state, to = ?next, "connection state");
    *state = next;
}

/// `GET /` and `GET /ws` upgrades to WebSocket.
pub(crate) async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Per-connection logic.
///
/// The session entry is held by a guard for the whole function, so it
/// is removed however the connection ends.
async fn handle_ws(socket: WebSocket, state: AppState) {
    let conn = ConnId::new();
    let mut lifecycle = ConnState::Connecting;
    let (mut sink, stream) = socket.split();

    let session = state.sessions.open(conn);
    transition(conn, &mut lifecycle, ConnState::Open);
    info!(conn = %conn, open = state.sessions.len(), "client connected");

    // Cancelled when the client goes away or the server shuts down.
    let cancel = state.shutdown.child_token();
    let (frames_tx, mut frames_rx) = mpsc::unbounded_channel::<String>();
    let reader = tokio::spawn(read_frames(stream, frames_tx, cancel.clone(), conn));

    if send(&mut sink, &Outbound::system(WELCOME_TEXT)).await.is_ok() {
        loop {
            let raw = tokio::select! {
                _ = cancel.cancelled() => break,
                frame = frames_rx.recv() => match frame {
                    Some(raw) => raw,
                    None => break,
                },
            };

            let Some(user_text) = parse_inbound(&raw) else {
                debug!(conn = %conn, "ignoring malformed or empty message");
                continue;
            };

            let history = session.history();
            let outcome = tokio::select! {
                _ = cancel.cancelled() => {
                    info!(conn = %conn, "connection closed mid-turn, dropping in-flight reply");
                    break;
                }
                r = state.agent.generate_reply(&history, &user_text) => r,
            };

            let envelope = match outcome {
                Ok(reply) => {
                    session.append([Turn::User(user_text), Turn::Assistant(reply.clone())]);
                    Outbound::agent(reply)
                }
                Err(e) => {
                    warn!(conn = %conn, error = %format!("{e:#}"), "turn failed");
                    Outbound::server_error(format!("{e:#}"))
                }
            };

            if send(&mut sink, &envelope).await.is_err() {
                break;
            }
        }
    }

    transition(conn, &mut lifecycle, ConnState::Closing);
    cancel.cancel();
    reader.abort();
    let _ = sink.close().await;
    drop(session);
    transition(conn, &mut lifecycle, ConnState::Closed);
    info!(conn = %conn, open = state.sessions.len(), "client disconnected");
}

/// Forward text frames to `tx` until the socket closes, then cancel.
async fn read_frames(
    mut stream: SplitStream<WebSocket>,
    tx: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
    conn: ConnId,
) {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if tx.send(text).is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // ping/pong/binary are ignored
            Err(e) => {
                debug!(conn = %conn, "ws recv error: {e}");
                break;
            }
        }
    }
    cancel.cancel();
}

async fn send(sink: &mut SplitSink<WebSocket, Message>, envelope: &Outbound) -> Result<(), ()> {
    let json = match serde_json::to_string(envelope) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "failed to serialize envelope");
            return Err(());
        }
    };
    sink.send(Message::Text(json)).await.map_err(|e| {
        debug!("ws send failed: {e}");
    })
}
