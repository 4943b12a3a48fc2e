//! Error types for the lobby layer.

/// Errors returned by [`LobbyHandle`](crate::LobbyHandle).
///
/// Game-level problems (illegal moves, unknown sessions) are not errors
/// here: the matchmaker drops them without a reply. The only failure a
/// caller can observe is the actor itself going away.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// The lobby task has stopped and its command channel is closed.
    #[error("lobby is unavailable")]
    Unavailable,
}
