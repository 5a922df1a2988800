//! Connection state management.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Lifecycle state of a connection.
///
/// `Disconnected -> Connecting -> Connected -> Closed`. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Created, never connected.
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Receive loop running.
    Connected,
    /// Finished; never reused.
    Closed,
}

impl ConnectionState {
    /// Returns true if the receive loop is running.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns true if the connection can no longer be used.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// State shared between a connection handle and its receive loop.
#[derive(Debug)]
pub(crate) struct InternalState {
    pub state: ConnectionState,
    pub created_at: Instant,
    pub connected_at: Option<Instant>,
    pub last_activity: Option<Instant>,
    pub messages_received: u64,
}

impl InternalState {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            created_at: Instant::now(),
            connected_at: None,
            last_activity: None,
            messages_received: 0,
        }
    }

    pub fn mark_connected(&mut self) {
        let now = Instant::now();
        self.state = ConnectionState::Connected;
        self.connected_at = Some(now);
        self.last_activity = Some(now);
    }

    pub fn mark_closed(&mut self) {
        self.state = ConnectionState::Closed;
    }

    /// Any received frame counts as activity, data or control.
    pub fn record_frame(&mut self) {
        self.last_activity = Some(Instant::now());
    }

    pub fn record_message(&mut self) {
        self.messages_received += 1;
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity
            .unwrap_or(self.created_at)
            .elapsed()
    }

    pub fn age(&self) -> Duration {
        self.connected_at.unwrap_or(self.created_at).elapsed()
    }
}
