use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::state::AppState;
use crate::stream::types::{ControlCommand, StatusMessage};

/// Outbound half of the socket, shared between the control loop and the
/// production task
type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Handle WebSocket upgrade for the line stream endpoint
pub async fn handle_websocket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle to a running production task. Cancellation must be followed by
/// awaiting the join handle, so a stop is observed only after the last frame.
struct StreamingTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl StreamingTask {
    /// Signal cancellation and wait for the production loop to exit
    async fn shut_down(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            error!("Production task failed to join: {}", e);
        }
    }
}

/// Per-connection session loop.
///
/// Multiplexes inbound control frames against the production task. The
/// session is Idle while `task` is None and Streaming while it is Some;
/// at most one production task exists per session at any time.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sender, mut receiver) = socket.split();
    let sender: WsSender = Arc::new(Mutex::new(sender));

    let session_id = state.registry.register();
    info!("Session {} connected", session_id);

    let mut task: Option<StreamingTask> = None;

    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Session {} transport error: {}", session_id, e);
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                let command = match serde_json::from_str::<ControlCommand>(&text) {
                    Ok(command) => command,
                    Err(e) => {
                        debug!("Session {} dropped malformed control frame: {}", session_id, e);
                        continue;
                    }
                };

                match command {
                    ControlCommand::Start => {
                        if task.is_some() {
                            debug!("Session {} already streaming, start ignored", session_id);
                            continue;
                        }
                        state.registry.set_streaming(&session_id, true);
                        let ack = StatusMessage::recording(state.scanner.width());
                        if !send_status(&sender, &ack).await {
                            break;
                        }
                        task = Some(spawn_production(
                            Arc::clone(&state),
                            Arc::clone(&sender),
                            session_id,
                        ));
                        info!("Session {} streaming started", session_id);
                    }
                    ControlCommand::Stop => {
                        if let Some(task) = task.take() {
                            task.shut_down().await;
                            state.registry.set_streaming(&session_id, false);
                            info!("Session {} streaming stopped", session_id);
                        }
                        if !send_status(&sender, &StatusMessage::stopped()).await {
                            break;
                        }
                    }
                    ControlCommand::Unknown => {
                        // Unrecognized actions get no reply and no transition.
                        debug!("Session {} ignored unrecognized action", session_id);
                    }
                }
            }
            Message::Close(_) => {
                info!("Session {} closed by client", session_id);
                break;
            }
            Message::Ping(data) => {
                if sender.lock().await.send(Message::Pong(data)).await.is_err() {
                    break;
                }
            }
            _ => {}
        }
    }

    // The production task must be fully terminated before the connection
    // is released; no send may race the closing socket.
    if let Some(task) = task.take() {
        task.shut_down().await;
    }
    state.registry.disconnect(&session_id);
    info!("Session {} disconnected", session_id);
}

/// Serialize and send a status acknowledgement. Returns false when the
/// transport is gone and the session loop should end.
async fn send_status(sender: &WsSender, status: &StatusMessage) -> bool {
    let json = match serde_json::to_string(status) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize status message: {}", e);
            return true;
        }
    };
    if let Err(e) = sender.lock().await.send(Message::Text(json.into())).await {
        warn!("Failed to send status message: {}", e);
        return false;
    }
    true
}

/// Launch the production loop: one binary row frame per tick until the
/// cancellation token fires or the client becomes unreachable.
///
/// Cancellation is checked `biased` ahead of both the send and the pacing
/// sleep, so a pending send is abandoned promptly rather than blocking a
/// stop behind a slow client.
fn spawn_production(state: Arc<AppState>, sender: WsSender, session_id: Uuid) -> StreamingTask {
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();

    let handle = tokio::spawn(async move {
        let interval = state.line_interval;
        loop {
            tokio::select! {
                biased;

                _ = task_cancel.cancelled() => {
                    debug!("Session {} production cancelled", session_id);
                    break;
                }

                sent = send_row(&state, &sender) => {
                    if !sent {
                        debug!("Session {} client unreachable, production ends", session_id);
                        break;
                    }
                }
            }

            tokio::select! {
                biased;

                _ = task_cancel.cancelled() => break,
                _ = sleep(interval) => {}
            }
        }
    });

    StreamingTask { cancel, handle }
}

/// Send one row as a binary frame. Returns false on transport failure.
async fn send_row(state: &AppState, sender: &WsSender) -> bool {
    let (row, _index) = state.scanner.next_row();
    sender.lock().await.send(Message::Binary(row)).await.is_ok()
}
