//! WebSocket transport.
//!
//! A [`WebSocketConnection`] opens one socket, runs a receive loop that hands
//! every message to a [`ConnectionCallback`], and tracks the activity the
//! multiplexer's health checks read. Connections are single use: once
//! `Closed`, a new one is created in its place.

mod config;
mod connection;
mod state;

pub use config::{ConnectionConfig, ConnectionConfigBuilder};
pub use connection::{ConnectionCallback, ConnectionId, WebSocketConnection};
pub use state::ConnectionState;
