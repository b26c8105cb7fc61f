// End-to-end tests for the streaming session loop, driven through a real
// WebSocket client against a server bound to an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use futures_util::{SinkExt, StreamExt};
use linescan_server::{
    handlers::health_check, scan::LineBuffer, state::AppState, stream::handle_websocket,
};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);
const QUIET_WINDOW: Duration = Duration::from_millis(200);

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn test_state() -> Arc<AppState> {
    // 4x3 buffer with rows [0,0,0,0], [1,1,1,1], [2,2,2,2]
    let pixels: Vec<u8> = (0..3u8).flat_map(|row| [row; 4]).collect();
    let buffer = LineBuffer::from_pixels(4, 3, pixels).unwrap();
    Arc::new(AppState::new(buffer, Duration::from_millis(1)))
}

async fn spawn_server(state: Arc<AppState>) -> SocketAddr {
    let app = Router::new()
        .route("/ws/stream", get(handle_websocket))
        .route("/health", get(health_check))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> WsClient {
    let (socket, _) = connect_async(format!("ws://{}/ws/stream", addr))
        .await
        .expect("websocket connect failed");
    socket
}

async fn recv(socket: &mut WsClient) -> Message {
    timeout(RECV_TIMEOUT, socket.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("connection closed unexpectedly")
        .expect("transport error")
}

/// Assert that nothing arrives on the socket for a short window
async fn assert_quiet(socket: &mut WsClient) {
    let frame = timeout(QUIET_WINDOW, socket.next()).await;
    assert!(frame.is_err(), "unexpected frame: {:?}", frame);
}

fn parse_json(msg: &Message) -> serde_json::Value {
    match msg {
        Message::Text(text) => serde_json::from_str(text.as_str()).expect("invalid JSON frame"),
        other => panic!("expected text frame, got {:?}", other),
    }
}

async fn send_action(socket: &mut WsClient, action: &str) {
    socket
        .send(Message::text(format!(r#"{{"action":"{}"}}"#, action)))
        .await
        .unwrap();
}

#[tokio::test]
async fn start_streams_rows_and_stop_halts_them() {
    let addr = spawn_server(test_state()).await;
    let mut socket = connect(addr).await;

    send_action(&mut socket, "start").await;

    let ack = parse_json(&recv(&mut socket).await);
    assert_eq!(ack["status"], "recording");
    assert_eq!(ack["message"], "Recording started");
    assert_eq!(ack["width"], 4);
    assert_eq!(ack["maxLines"], 1200);

    // Rows flow as binary frames of exactly `width` bytes, cycling through
    // the buffer from the top.
    for i in 0..8u8 {
        match recv(&mut socket).await {
            Message::Binary(row) => {
                assert_eq!(row.len(), 4);
                assert!(row.iter().all(|&px| px == i % 3), "row {} out of order", i);
            }
            other => panic!("expected binary row, got {:?}", other),
        }
    }

    send_action(&mut socket, "stop").await;

    // Rows already in flight may still arrive, but the stopped ack must be
    // the next text frame and nothing may follow it.
    loop {
        let frame = recv(&mut socket).await;
        match frame {
            Message::Binary(row) => assert_eq!(row.len(), 4),
            Message::Text(_) => {
                let ack = parse_json(&frame);
                assert_eq!(ack["status"], "stopped");
                assert_eq!(ack["message"], "Recording stopped");
                break;
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    assert_quiet(&mut socket).await;
}

#[tokio::test]
async fn start_is_idempotent_while_streaming() {
    let addr = spawn_server(test_state()).await;
    let mut socket = connect(addr).await;

    send_action(&mut socket, "start").await;
    let ack = parse_json(&recv(&mut socket).await);
    assert_eq!(ack["status"], "recording");

    // A second start must not produce another acknowledgement or a second
    // production task; the only text frame from here on is the stopped ack.
    send_action(&mut socket, "start").await;
    send_action(&mut socket, "stop").await;

    loop {
        let frame = recv(&mut socket).await;
        match frame {
            Message::Binary(_) => {}
            Message::Text(_) => {
                let ack = parse_json(&frame);
                assert_eq!(ack["status"], "stopped");
                break;
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    assert_quiet(&mut socket).await;
}

#[tokio::test]
async fn stop_while_idle_is_acknowledged() {
    let addr = spawn_server(test_state()).await;
    let mut socket = connect(addr).await;

    send_action(&mut socket, "stop").await;

    let ack = parse_json(&recv(&mut socket).await);
    assert_eq!(ack["status"], "stopped");

    assert_quiet(&mut socket).await;
}

#[tokio::test]
async fn malformed_and_unknown_controls_are_ignored() {
    let addr = spawn_server(test_state()).await;
    let mut socket = connect(addr).await;

    send_action(&mut socket, "bogus").await;
    socket.send(Message::text("hello")).await.unwrap();

    // Neither frame gets a reply and neither is fatal.
    assert_quiet(&mut socket).await;

    // The session is still usable afterwards.
    send_action(&mut socket, "start").await;
    let ack = parse_json(&recv(&mut socket).await);
    assert_eq!(ack["status"], "recording");

    match recv(&mut socket).await {
        Message::Binary(row) => assert_eq!(row.len(), 4),
        other => panic!("expected binary row, got {:?}", other),
    }
}

#[tokio::test]
async fn health_reports_session_activity() {
    let state = test_state();
    let addr = spawn_server(Arc::clone(&state)).await;
    let mut socket = connect(addr).await;

    send_action(&mut socket, "start").await;
    let ack = parse_json(&recv(&mut socket).await);
    assert_eq!(ack["status"], "recording");

    let health: serde_json::Value = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["active_sessions"], 1);
    assert_eq!(health["streaming_sessions"], 1);
    assert_eq!(health["scan_width"], 4);
    assert_eq!(health["scan_height"], 3);

    send_action(&mut socket, "stop").await;
    loop {
        let frame = recv(&mut socket).await;
        if matches!(frame, Message::Text(_)) {
            assert_eq!(parse_json(&frame)["status"], "stopped");
            break;
        }
    }

    // Stopping clears the streaming flag but keeps the session registered.
    assert_eq!(state.registry.streaming_count(), 0);
    assert_eq!(state.registry.active_count(), 1);
}

#[tokio::test]
async fn disconnect_while_streaming_cleans_up() {
    let state = test_state();
    let addr = spawn_server(Arc::clone(&state)).await;
    let mut socket = connect(addr).await;

    send_action(&mut socket, "start").await;
    let ack = parse_json(&recv(&mut socket).await);
    assert_eq!(ack["status"], "recording");

    drop(socket);

    // The session loop cancels the production task and deregisters once it
    // observes the closed transport.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while state.registry.active_count() != 0 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "session was not cleaned up after disconnect"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
