//! Stream naming and the subscription registry.

mod events;
mod handler;
mod key;
mod registry;

pub use events::{EventRouter, event_type};
pub use handler::{Handler, HandlerId};
pub use key::{DEFAULT_ENDPOINT, DepthLevels, KlineInterval, StreamKey, combined_endpoint};
pub use registry::{PulseOutcome, SubscriptionRegistry, TypedStream};
