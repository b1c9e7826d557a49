//! Session data model shared between the registry and its consumers.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Opaque client handle identifying a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Wrap a raw client identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Session lifecycle state.
///
/// `Stale` marks a session idle past the autoclose window but retained by
/// the liveness floor. `Evicted` and `Disconnected` are terminal and only
/// appear on removal snapshots and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Session has renewed within the autoclose window.
    Active,
    /// Idle past the window, kept alive by the floor.
    Stale,
    /// Removed by the autoclose sweep.
    Evicted,
    /// Removed by a graceful close.
    Disconnected,
}

/// A tracked client session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Client handle.
    pub id: ClientId,
    /// Registry-assigned global id.
    pub gid: Uuid,
    /// Connection timestamp (clock milliseconds).
    pub connected_at: u64,
    /// Last renewal timestamp (clock milliseconds).
    pub last_renewed_at: u64,
    /// Current state.
    pub state: SessionState,
}

/// Handle returned to the caller on a successful connect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHandle {
    /// Client handle.
    pub id: ClientId,
    /// Registry-assigned global id.
    pub gid: Uuid,
    /// Connection timestamp (clock milliseconds).
    pub connected_at: u64,
}

/// Registry error.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("session already connected: {0}")]
    DuplicateSession(ClientId),
    #[error("unknown session: {0}")]
    UnknownSession(ClientId),
}
