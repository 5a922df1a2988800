//! Connection pool for many logical streams.
//!
//! [`StreamMultiplexer`] packs registered streams onto connections of at
//! most `streams_per_socket` streams each. A rebuild cycle runs every
//! `rebuild_interval` and right after a new stream is registered:
//!
//! 1. optional [`VenueProbe`] check, skipping the cycle when it fails
//! 2. health sweep: dead, silent and (inside the rotation window) aged
//!    connections leave the active set and close after `close_grace`
//! 3. unassigned streams are packed into batches, folding in any active
//!    connection with spare room
//! 4. one connection is opened per batch; failed batches wait for the next cycle

mod client;
mod config;
mod health;
mod packing;
mod probe;
mod router;

pub use client::{RebuildReport, StreamMultiplexer};
pub use config::{MultiplexerConfig, MultiplexerConfigBuilder};
pub use health::{HealthSnapshot, assess};
pub use packing::{RepackPlan, plan};
pub use probe::VenueProbe;
