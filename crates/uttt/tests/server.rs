//! End-to-end tests: real server, real WebSocket clients.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use uttt::prelude::*;

type Client = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

// =========================================================================
// Helpers
// =========================================================================

struct TestServer {
    addr: SocketAddr,
    lobby: LobbyHandle,
    stop: oneshot::Sender<()>,
    task: JoinHandle<Result<(), UtttError>>,
}

async fn start(builder: UtttServerBuilder) -> TestServer {
    let server = builder.bind("127.0.0.1:0").build().await.expect("server should build");
    let addr = server.local_addr().expect("bound address");
    let lobby = server.lobby();
    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(server.run_until(async move {
        let _ = stopped.await;
    }));
    TestServer {
        addr,
        lobby,
        stop,
        task,
    }
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("client should connect");
    ws
}

async fn send(client: &mut Client, json: &str) {
    client
        .send(Message::Text(json.to_owned().into()))
        .await
        .expect("client send");
}

/// Next server event, failing the test after two seconds.
async fn recv(client: &mut Client) -> ServerMessage {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for server event")
            .expect("stream ended")
            .expect("frame error");
        if let Message::Text(text) = frame {
            return JsonCodec
                .decode(text.as_bytes())
                .expect("server sent a valid event");
        }
    }
}

/// Asserts nothing arrives for a short while.
async fn assert_silent(client: &mut Client) {
    let next = tokio::time::timeout(Duration::from_millis(150), client.next()).await;
    assert!(next.is_err(), "unexpected frame: {next:?}");
}

/// Keeps reading for `period` like a client waiting on its opponent.
/// Control frames are skipped; anything else fails the test.
async fn listen(client: &mut Client, period: Duration) {
    let deadline = tokio::time::Instant::now() + period;
    loop {
        match tokio::time::timeout_at(deadline, client.next()).await {
            Err(_) => return,
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => continue,
            Ok(other) => panic!("unexpected traffic while listening: {other:?}"),
        }
    }
}

async fn paired(addr: SocketAddr) -> (Client, Client) {
    let mut x = connect(addr).await;
    let mut o = connect(addr).await;
    send(&mut x, r#"{"event":"join"}"#).await;
    assert_eq!(recv(&mut x).await, ServerMessage::Waiting);
    send(&mut o, r#"{"event":"join"}"#).await;
    assert!(matches!(recv(&mut x).await, ServerMessage::MatchStart { mark: Mark::X, .. }));
    assert!(matches!(recv(&mut o).await, ServerMessage::MatchStart { mark: Mark::O, .. }));
    (x, o)
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_join_pair_and_move() {
    let server = start(UtttServer::builder()).await;
    let (mut x, mut o) = paired(server.addr).await;

    send(&mut x, r#"{"event":"move","data":{"boardIndex":4,"cellIndex":4}}"#).await;

    for client in [&mut x, &mut o] {
        let ServerMessage::StateUpdate(view) = recv(client).await else {
            panic!("expected stateUpdate");
        };
        assert_eq!(view.boards[4][4], Some(Mark::X));
        assert_eq!(view.active_board, Some(4));
        assert_eq!(view.current_player, Mark::O);
    }
}

#[tokio::test]
async fn test_match_start_wire_shape() {
    let server = start(UtttServer::builder()).await;
    let mut a = connect(server.addr).await;
    let mut b = connect(server.addr).await;
    send(&mut a, r#"{"event":"join"}"#).await;
    recv(&mut a).await;
    send(&mut b, r#"{"event":"join"}"#).await;

    let frame = tokio::time::timeout(Duration::from_secs(2), b.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();

    assert_eq!(json["event"], "matchStart");
    assert_eq!(json["data"]["mark"], "O");
    let state = &json["data"]["state"];
    assert_eq!(state["activeBoard"], serde_json::Value::Null);
    assert_eq!(state["currentPlayer"], "X");
    assert_eq!(state["draw"], false);
    assert_eq!(state["boards"].as_array().unwrap().len(), 9);
    assert!(state.get("players").is_none());
}

#[tokio::test]
async fn test_illegal_and_malformed_intents_are_silent() {
    let server = start(UtttServer::builder()).await;
    let (mut x, mut o) = paired(server.addr).await;

    send(&mut o, r#"{"event":"move","data":{"boardIndex":0,"cellIndex":0}}"#).await;
    send(&mut x, r#"{"event":"move","data":{"boardIndex":9,"cellIndex":0}}"#).await;
    send(&mut x, r#"{"event":"move","data":{"boardIndex":"4","cellIndex":4}}"#).await;
    send(&mut x, r#"{"event":"move","data":{"boardIndex":1.5,"cellIndex":4}}"#).await;
    send(&mut x, r#"{"event":"teleport"}"#).await;
    send(&mut x, "not json").await;

    assert_silent(&mut x).await;
    assert_silent(&mut o).await;

    // The connection is still usable afterwards.
    send(&mut x, r#"{"event":"move","data":{"boardIndex":0,"cellIndex":0}}"#).await;
    assert!(matches!(recv(&mut o).await, ServerMessage::StateUpdate(_)));
}

#[tokio::test]
async fn test_ping_gets_pong() {
    let server = start(UtttServer::builder()).await;
    let mut client = connect(server.addr).await;

    send(&mut client, r#"{"event":"ping","data":{"clientTime":1234}}"#).await;

    let ServerMessage::Pong { client_time, .. } = recv(&mut client).await else {
        panic!("expected pong");
    };
    assert_eq!(client_time, 1234);
}

#[tokio::test]
async fn test_disconnect_sends_opponent_left() {
    let server = start(UtttServer::builder()).await;
    let (x, mut o) = paired(server.addr).await;

    drop(x);

    assert_eq!(recv(&mut o).await, ServerMessage::OpponentLeft);

    // The survivor can queue again.
    send(&mut o, r#"{"event":"join"}"#).await;
    assert_eq!(recv(&mut o).await, ServerMessage::Waiting);
}

#[tokio::test]
async fn test_session_released_after_client_leaves() {
    let server = start(UtttServer::builder()).await;
    let mut client = connect(server.addr).await;
    send(&mut client, r#"{"event":"join"}"#).await;
    recv(&mut client).await;

    client.close(None).await.unwrap();

    let mut stats = server.lobby.stats().await.unwrap();
    for _ in 0..50 {
        if stats.sessions == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        stats = server.lobby.stats().await.unwrap();
    }
    assert_eq!(stats.sessions, 0);
    assert!(!stats.waiting);
}

#[tokio::test]
async fn test_silent_player_keeps_match() {
    let server = start(UtttServer::builder()).await;
    let (mut x, mut o) = paired(server.addr).await;

    // X sits and thinks while O keeps chatting.
    for client_time in 0..10 {
        let ping = format!(r#"{{"event":"ping","data":{{"clientTime":{client_time}}}}}"#);
        send(&mut o, &ping).await;
        assert!(matches!(recv(&mut o).await, ServerMessage::Pong { .. }));
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    send(&mut x, r#"{"event":"move","data":{"boardIndex":4,"cellIndex":4}}"#).await;
    let ServerMessage::StateUpdate(view) = recv(&mut o).await else {
        panic!("expected stateUpdate, not a forfeit");
    };
    assert_eq!(view.boards[4][4], Some(Mark::X));
}

#[tokio::test]
async fn test_idle_timeout_spares_listening_clients() {
    let server = start(UtttServer::builder().idle_timeout(Duration::from_millis(300))).await;
    let (mut x, mut o) = paired(server.addr).await;

    tokio::join!(
        listen(&mut x, Duration::from_secs(1)),
        listen(&mut o, Duration::from_secs(1)),
    );

    send(&mut x, r#"{"event":"move","data":{"boardIndex":0,"cellIndex":0}}"#).await;
    assert!(matches!(recv(&mut o).await, ServerMessage::StateUpdate(_)));
}

#[tokio::test]
async fn test_websocket_pings_keep_connection_open() {
    let server = start(UtttServer::builder().idle_timeout(Duration::from_millis(300))).await;
    let mut client = connect(server.addr).await;

    // Send pings without reading, so only inbound traffic can keep us alive.
    for _ in 0..10 {
        client.send(Message::Ping(Vec::new().into())).await.expect("client ping");
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    send(&mut client, r#"{"event":"join"}"#).await;
    assert_eq!(recv(&mut client).await, ServerMessage::Waiting);
}

#[tokio::test]
async fn test_idle_connection_is_closed() {
    let server = start(UtttServer::builder().idle_timeout(Duration::from_millis(200))).await;
    let mut client = connect(server.addr).await;

    // Not reading means server pings go unanswered.
    tokio::time::sleep(Duration::from_millis(600)).await;

    let ended = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match client.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;

    assert!(ended.is_ok(), "server should close an idle connection");
}

#[tokio::test]
async fn test_stalled_peer_does_not_block_other_clients() {
    let server = start(UtttServer::builder()).await;

    // Opens TCP and never sends the upgrade request.
    let _stalled = tokio::net::TcpStream::connect(server.addr)
        .await
        .expect("raw connect");
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut client = tokio::time::timeout(Duration::from_secs(2), connect(server.addr))
        .await
        .expect("second client should not wait on the stalled peer");
    send(&mut client, r#"{"event":"join"}"#).await;
    assert_eq!(recv(&mut client).await, ServerMessage::Waiting);
}

#[tokio::test]
async fn test_foreign_origin_is_refused() {
    let server = start(UtttServer::builder().allowed_origin("http://localhost:3000")).await;

    let mut request = format!("ws://{}", server.addr).into_client_request().unwrap();
    request
        .headers_mut()
        .insert("Origin", HeaderValue::from_static("http://evil.test"));
    assert!(tokio_tungstenite::connect_async(request).await.is_err());

    // The listener keeps serving after a refused upgrade.
    let mut request = format!("ws://{}", server.addr).into_client_request().unwrap();
    request
        .headers_mut()
        .insert("Origin", HeaderValue::from_static("http://localhost:3000"));
    let (mut client, _) = tokio_tungstenite::connect_async(request).await.unwrap();
    send(&mut client, r#"{"event":"join"}"#).await;
    assert_eq!(recv(&mut client).await, ServerMessage::Waiting);
}

#[tokio::test]
async fn test_run_until_stops_server() {
    let server = start(UtttServer::builder()).await;

    server.stop.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(2), server.task)
        .await
        .expect("server should stop")
        .expect("server task should not panic");

    assert!(result.is_ok());
    assert!(matches!(server.lobby.stats().await, Err(_)));
}
