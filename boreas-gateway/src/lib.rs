//! # Boreas Gateway
//!
//! Market-stream multiplexing and outbound request admission for the Boreas
//! gateway.
//!
//! This crate provides:
//! - A single-use WebSocket connection with a receive loop and activity tracking
//! - A typed subscription registry keyed by stream name, plus event-type
//!   routing for the account (user-data) stream
//! - A multiplexer that packs streams onto a bounded pool of connections and
//!   rebuilds the pool when connections die, go silent or age out
//! - A weighted sliding-window rate limiter for requests and orders
//!
//! # Architecture
//!
//! - `ws` - transport connection
//! - `stream` - stream keys, handlers and the registry
//! - `multiplexer` - connection pool and rebuild cycle
//! - `rest` - request and order admission control
//!
//! # Example
//!
//! ```ignore
//! use boreas_gateway::prelude::*;
//!
//! let mux = StreamMultiplexer::new(MultiplexerConfig::default());
//! mux.start();
//! mux.subscribe(
//!     &StreamKey::partial_depth("BTCUSDT", DepthLevels::Five),
//!     Handler::new(|book: &serde_json::Value| println!("{book}")),
//! )?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

/// WebSocket transport
pub mod ws;

/// Stream naming and subscriptions
pub mod stream;

/// Connection pool and rebuild cycle
pub mod multiplexer;

/// Request admission control
pub mod rest;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::multiplexer::{MultiplexerConfig, RebuildReport, StreamMultiplexer, VenueProbe};
    pub use crate::rest::{RateLimitConfig, RateLimiter};
    pub use crate::stream::{
        DepthLevels, EventRouter, Handler, KlineInterval, PulseOutcome, StreamKey,
        SubscriptionRegistry, event_type,
    };
    pub use crate::ws::{ConnectionConfig, ConnectionState, WebSocketConnection};
}
