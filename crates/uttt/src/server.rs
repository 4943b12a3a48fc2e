//! `UtttServer` builder and server loop.
//!
//! This is the entry point for running the game server. It ties together
//! all the layers: transport → protocol → lobby → engine.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use uttt_lobby::{LobbyHandle, spawn_lobby};
use uttt_protocol::{Codec, JsonCodec};
use uttt_transport::{Transport, Upgrade, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{ServerConfig, UtttError};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) lobby: LobbyHandle,
    pub(crate) codec: C,
    /// `None` keeps connections open for as long as the peer does.
    pub(crate) idle_timeout: Option<Duration>,
}

/// Builder for configuring and starting a server.
///
/// # Example
///
/// ```rust,no_run
/// use uttt::prelude::*;
///
/// # async fn start() -> Result<(), UtttError> {
/// let server = UtttServer::builder()
///     .bind("127.0.0.1:3001")
///     .allowed_origin("http://localhost:3000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct UtttServerBuilder {
    config: ServerConfig,
}

impl UtttServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::from_config(ServerConfig::default())
    }

    /// Creates a builder that starts from an existing configuration.
    pub fn from_config(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Closes connections that send nothing, not even a WebSocket pong,
    /// for `timeout`. Off unless set.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = Some(timeout);
        self
    }

    /// Refuses WebSocket upgrades from browsers on any other origin.
    pub fn allowed_origin(mut self, origin: impl Into<String>) -> Self {
        self.config.allowed_origin = Some(origin.into());
        self
    }

    /// Sets the capacity of the lobby's command queue.
    pub fn lobby_channel_size(mut self, size: usize) -> Self {
        self.config.lobby_channel_size = size;
        self
    }

    /// Binds the listener and starts the lobby.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<UtttServer<JsonCodec>, UtttError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr)
            .await?
            .with_allowed_origin(self.config.allowed_origin.clone());

        let state = Arc::new(ServerState {
            lobby: spawn_lobby(self.config.lobby_channel_size),
            codec: JsonCodec,
            idle_timeout: self.config.idle_timeout,
        });

        Ok(UtttServer { transport, state })
    }
}

impl Default for UtttServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct UtttServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl UtttServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> UtttServerBuilder {
        UtttServerBuilder::new()
    }
}

impl<C: Codec> UtttServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle to the lobby, for diagnostics.
    pub fn lobby(&self) -> LobbyHandle {
        self.state.lobby.clone()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), UtttError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes, then stops the
    /// lobby.
    ///
    /// Each accepted peer is upgraded and handled on its own task, so a
    /// slow handshake never holds up the next accept. A failed accept or
    /// upgrade is logged and the loop keeps going.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> Result<(), UtttError> {
        tracing::info!(addr = ?self.local_addr().ok(), "uttt server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(pending) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            let conn = match pending.upgrade().await {
                                Ok(conn) => conn,
                                Err(e) => {
                                    tracing::debug!(error = %e, "upgrade failed");
                                    return;
                                }
                            };
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                },
            }
        }

        if let Ok(stats) = self.state.lobby.stats().await {
            tracing::info!(
                sessions = stats.sessions,
                games = stats.games,
                "stopping lobby"
            );
        }
        self.state.lobby.shutdown().await?;
        Ok(())
    }
}
