use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, timeout};

use crate::presence::ConnectionId;
use crate::state::AppState;

/// Close code sent when the peer stops answering pings ("going away").
const CLOSE_GOING_AWAY: u16 = 1001;

/// How long the writer may keep flushing queued frames after the reader stops.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Run one WebSocket connection until it closes.
///
/// Splits the socket into a writer task fed by an mpsc channel and a reader
/// loop. The channel sender is the handle the presence service uses to push
/// frames to this client; registration happens once the writer is running, and
/// the connection is unregistered after the reader loop ends. A missed pong
/// ends the reader loop the same way a closed socket does.
pub async fn run_connection(socket: WebSocket, state: AppState, user_id: Option<String>) {
    let connection_id = ConnectionId::new();
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    let mut writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    state
        .presence
        .on_connect(user_id.as_deref(), connection_id, tx.clone());

    tracing::info!(
        connection_id = %connection_id,
        user_id = user_id.as_deref().unwrap_or("-"),
        "WebSocket actor started"
    );

    let (pong_tx, mut pong_rx) = mpsc::unbounded_channel::<()>();
    // Fires (or is dropped) when the keepalive gives up on the peer.
    let (dead_tx, mut dead_rx) = oneshot::channel::<()>();

    let ping_tx = tx.clone();
    let keepalive = state.keepalive.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ping_timer = interval(keepalive.ping_interval);
        // First tick fires immediately.
        ping_timer.tick().await;

        loop {
            ping_timer.tick().await;

            if ping_tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
                break;
            }

            match timeout(keepalive.pong_timeout, pong_rx.recv()).await {
                Ok(Some(())) => {}
                _ => {
                    tracing::warn!(connection_id = %connection_id, "Pong timeout, closing connection");
                    let _ = ping_tx.send(Message::Close(Some(CloseFrame {
                        code: CLOSE_GOING_AWAY,
                        reason: "Pong timeout".into(),
                    })));
                    break;
                }
            }
        }
        let _ = dead_tx.send(());
    });

    loop {
        let next = tokio::select! {
            next = ws_receiver.next() => next,
            _ = &mut dead_rx => {
                tracing::info!(connection_id = %connection_id, "Keepalive ended, dropping connection");
                break;
            }
        };

        match next {
            Some(Ok(msg)) => match msg {
                Message::Pong(_) => {
                    let _ = pong_tx.send(());
                }
                Message::Ping(data) => {
                    let _ = tx.send(Message::Pong(data));
                }
                Message::Text(text) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        "Ignoring client text frame: {}",
                        text.chars().take(100).collect::<String>()
                    );
                }
                Message::Binary(data) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        len = data.len(),
                        "Ignoring client binary frame"
                    );
                }
                Message::Close(frame) => {
                    tracing::info!(
                        connection_id = %connection_id,
                        reason = ?frame,
                        "Client initiated close"
                    );
                    break;
                }
            },
            Some(Err(e)) => {
                tracing::warn!(
                    connection_id = %connection_id,
                    error = %e,
                    "WebSocket receive error"
                );
                break;
            }
            None => {
                tracing::info!(connection_id = %connection_id, "WebSocket stream ended");
                break;
            }
        }
    }

    ping_handle.abort();

    state.presence.on_disconnect(connection_id);

    // With every sender gone the writer flushes what is queued (such as the
    // close frame) and stops; a stuck peer is cut off after the drain timeout.
    drop(tx);
    if timeout(WRITER_DRAIN_TIMEOUT, &mut writer_handle).await.is_err() {
        writer_handle.abort();
    }

    tracing::info!(connection_id = %connection_id, "WebSocket actor stopped");
}

/// Forward frames from the channel to the socket until either side goes away.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            break;
        }
    }
}
