// Test-specific lint overrides: integration tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::future_not_send,
    clippy::missing_panics_doc
)]

//! Integration tests for the plain-HTTP liveness response served on the
//! relay's WebSocket port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_tungstenite::tungstenite::Message;
use whiteboard_relay::relay::{self, HEALTH_BODY, RelayState};
use whiteboard_relay::room::RoomName;

/// Sends a bare HTTP/1.1 request and returns the raw response text.
async fn http_request(addr: SocketAddr, method: &str, path: &str) -> String {
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let request =
        format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_string(&mut response))
        .await
        .expect("timed out reading response")
        .unwrap();
    response
}

fn status_line(response: &str) -> &str {
    response.lines().next().unwrap_or_default()
}

fn body(response: &str) -> &str {
    response.split_once("\r\n\r\n").map_or("", |(_, body)| body)
}

#[tokio::test]
async fn get_root_returns_liveness_text() {
    let (addr, _handle) = relay::start_server("127.0.0.1:0").await.unwrap();

    let response = http_request(addr, "GET", "/").await;

    assert_eq!(status_line(&response), "HTTP/1.1 200 OK");
    assert!(
        response
            .to_ascii_lowercase()
            .contains("content-type: text/plain"),
        "got: {response}"
    );
    assert_eq!(body(&response), HEALTH_BODY);
}

#[tokio::test]
async fn get_any_path_returns_liveness_text() {
    let (addr, _handle) = relay::start_server("127.0.0.1:0").await.unwrap();

    for path in ["/session-42", "/a/b/c", "/x?y=z"] {
        let response = http_request(addr, "GET", path).await;
        assert_eq!(status_line(&response), "HTTP/1.1 200 OK", "path {path}");
        assert_eq!(body(&response), "Y-WebSocket Server Running\n", "path {path}");
    }
}

#[tokio::test]
async fn other_methods_are_not_routed() {
    let (addr, _handle) = relay::start_server("127.0.0.1:0").await.unwrap();

    let response = http_request(addr, "POST", "/").await;
    assert!(
        status_line(&response).starts_with("HTTP/1.1 405"),
        "got: {response}"
    );
}

#[tokio::test]
async fn health_check_does_not_disturb_open_channels() {
    let state = Arc::new(RelayState::new());
    let (addr, _handle) = relay::start_server_with_state("127.0.0.1:0", Arc::clone(&state))
        .await
        .unwrap();
    let room = RoomName::from("live");

    let (mut a, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/live"))
        .await
        .unwrap();
    let (mut b, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/live"))
        .await
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while state.registry.room_size(&room).await != 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let response = http_request(addr, "GET", "/live").await;
    assert_eq!(body(&response), HEALTH_BODY);
    assert_eq!(state.registry.room_size(&room).await, 2);

    a.send(Message::Text("ping-through".into())).await.unwrap();
    let received = tokio::time::timeout(Duration::from_secs(5), b.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(received, Message::Text("ping-through".into()));
}
