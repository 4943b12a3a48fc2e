//! Per-connection handler: register with the lobby, then pump events.
//!
//! Each upgraded connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register with the lobby → get a SessionId and an outbound queue
//!   2. Loop: forward lobby events to the socket, and decoded client
//!      events to the lobby, until the peer leaves (or goes idle, when an
//!      idle timeout is configured)
//!   3. Drop guard tells the lobby the session is gone

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use uttt_lobby::LobbyHandle;
use uttt_protocol::{ClientMessage, Codec, ProtocolError, ServerMessage, SessionId};
use uttt_transport::{Connection, Frame, WebSocketConnection};

use crate::UtttError;
use crate::server::ServerState;

/// Drop guard that disconnects a session when the handler exits.
///
/// Runs on every exit path, including errors and panics. `Drop` is
/// synchronous, so the lobby call goes out on a fire-and-forget task.
struct SessionGuard {
    session_id: SessionId,
    lobby: LobbyHandle,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let session_id = self.session_id;
        let lobby = self.lobby.clone();
        tokio::spawn(async move {
            let _ = lobby.disconnect(session_id).await;
        });
    }
}

/// Handles a single connection from upgrade to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), UtttError> {
    let conn_id = conn.id();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();

    let session_id = state.lobby.connect(outbound_tx).await?;
    let _guard = SessionGuard {
        session_id,
        lobby: state.lobby.clone(),
    };
    tracing::debug!(%conn_id, %session_id, peer = %conn.peer_addr(), "connection registered");

    let start = Instant::now();
    let idle_timeout = state.idle_timeout;
    let mut idle_deadline = idle_timeout.map(|limit| start + limit);
    let mut heartbeat = idle_timeout.map(heartbeat_interval);

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => {
                // The lobby dropped our sender: it has shut down.
                let Some(msg) = outbound else { break };
                send_event(&conn, &state.codec, &msg).await?;
            }
            _ = expire(idle_deadline) => {
                tracing::info!(%session_id, "connection idle, closing");
                break;
            }
            _ = tick(&mut heartbeat) => {
                conn.send(Frame::Ping).await?;
            }
            inbound = conn.recv() => {
                let frame = match inbound {
                    Ok(Some(frame)) => frame,
                    Ok(None) => {
                        tracing::info!(%session_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%session_id, error = %e, "recv error");
                        break;
                    }
                };

                // Any inbound traffic, pongs included, proves the peer is alive.
                if let Some(limit) = idle_timeout {
                    idle_deadline = Some(Instant::now() + limit);
                }

                let data = match frame {
                    Frame::Text(text) => text.into_bytes(),
                    Frame::Binary(data) => data,
                    Frame::Ping => continue,
                };

                let msg: ClientMessage = match state.codec.decode(&data) {
                    Ok(msg) => msg,
                    Err(e) => {
                        tracing::debug!(%session_id, error = %e, "dropping undecodable frame");
                        continue;
                    }
                };

                match msg {
                    ClientMessage::Join => state.lobby.join(session_id).await?,
                    ClientMessage::Move(intent) => {
                        state.lobby.submit_move(session_id, intent).await?
                    }
                    ClientMessage::Ping { client_time } => {
                        let pong = ServerMessage::Pong {
                            client_time,
                            server_time: start.elapsed().as_millis() as u64,
                        };
                        send_event(&conn, &state.codec, &pong).await?;
                    }
                }
            }
        }
    }

    if let Err(e) = conn.close().await {
        tracing::debug!(%session_id, error = %e, "close failed");
    }
    // _guard drops here → lobby disconnect fires.
    Ok(())
}

/// Pings the peer twice per idle period so clients that only listen
/// still answer with pongs.
fn heartbeat_interval(idle_timeout: Duration) -> Interval {
    let period = (idle_timeout / 2).max(Duration::from_millis(1));
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Completes at `deadline`, or never when there is none.
async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Encodes one event and writes it as a single frame.
async fn send_event(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    msg: &ServerMessage,
) -> Result<(), UtttError> {
    conn.send(encode_frame(codec, msg)?).await?;
    Ok(())
}

/// Text codecs go out as text frames, which is what browser clients
/// expect for JSON. Everything else is binary.
fn encode_frame(codec: &impl Codec, msg: &ServerMessage) -> Result<Frame, ProtocolError> {
    let bytes = codec.encode(msg)?;
    if !codec.is_text() {
        return Ok(Frame::Binary(bytes));
    }
    Ok(String::from_utf8(bytes)
        .map(Frame::Text)
        .unwrap_or_else(|e| Frame::Binary(e.into_bytes())))
}

#[cfg(test)]
mod tests {
    use serde::Serialize;
    use serde::de::DeserializeOwned;
    use uttt_protocol::JsonCodec;

    use super::*;

    /// Same bytes as JSON, but does not claim to be text.
    struct OpaqueJson;

    impl Codec for OpaqueJson {
        fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
            JsonCodec.encode(value)
        }

        fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
            JsonCodec.decode(data)
        }
    }

    #[test]
    fn test_encode_frame_text_codec_sends_text() {
        let frame = encode_frame(&JsonCodec, &ServerMessage::Waiting).unwrap();
        assert_eq!(frame, Frame::Text(r#"{"event":"waiting"}"#.into()));
    }

    #[test]
    fn test_encode_frame_other_codec_sends_binary() {
        let frame = encode_frame(&OpaqueJson, &ServerMessage::Waiting).unwrap();
        assert_eq!(frame, Frame::Binary(br#"{"event":"waiting"}"#.to_vec()));
    }

    #[tokio::test]
    async fn test_expire_without_deadline_never_fires() {
        let fired = tokio::time::timeout(Duration::from_millis(100), expire(None)).await;
        assert!(fired.is_err());
    }

    #[tokio::test]
    async fn test_expire_fires_at_deadline() {
        let deadline = Instant::now() + Duration::from_millis(20);
        let fired = tokio::time::timeout(Duration::from_secs(2), expire(Some(deadline))).await;
        assert!(fired.is_ok());
        assert!(Instant::now() >= deadline);
    }

    #[tokio::test]
    async fn test_heartbeat_interval_is_half_the_idle_timeout() {
        let start = Instant::now();
        let mut interval = heartbeat_interval(Duration::from_millis(100));
        interval.tick().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
