use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, info, warn};

use crate::board::BoardSnapshot;
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Pushes the current board and then every board change to the client.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut updates = BroadcastStream::new(state.board.subscribe());
    let initial = state.board.snapshot().await;

    info!("websocket client connected");

    let send_task = tokio::spawn(async move {
        if send_snapshot(&mut sender, &initial).await.is_err() {
            return;
        }

        while let Some(update) = updates.next().await {
            let snapshot = match update {
                Ok(snapshot) => snapshot,
                // Every snapshot is complete, so skipping ahead loses nothing.
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    debug!(skipped, "websocket client lagging behind board updates");
                    continue;
                }
            };

            if send_snapshot(&mut sender, &snapshot).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("websocket client disconnected");
}

async fn send_snapshot<S>(sender: &mut S, snapshot: &BoardSnapshot) -> Result<(), ()>
where
    S: SinkExt<Message> + Unpin,
{
    let json = match serde_json::to_string(snapshot) {
        Ok(json) => json,
        Err(err) => {
            warn!(error = %err, "failed to serialize board snapshot for ws");
            return Ok(());
        }
    };

    sender.send(Message::Text(json.into())).await.map_err(|_| ())
}
