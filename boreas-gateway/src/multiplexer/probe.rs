//! Venue availability probe.

use async_trait::async_trait;
use boreas_core::error::BoreasError;

/// Checks that the venue is reachable before a rebuild cycle opens sockets.
///
/// Typically backed by a cheap REST call such as a server-time request.
#[async_trait]
pub trait VenueProbe: Send + Sync {
    /// Returns `Ok` when the venue is available.
    async fn check(&self) -> Result<(), BoreasError>;
}
