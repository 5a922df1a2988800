//! Combined-stream envelope routing.

use async_trait::async_trait;
use boreas_core::error::DecodeError;
use boreas_telemetry::metrics::BoreasMetrics;
use serde::Deserialize;
use serde_json::value::RawValue;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::stream::{PulseOutcome, SubscriptionRegistry};
use crate::ws::{ConnectionCallback, ConnectionId};

/// `{"stream": "...", "data": {...}}`
#[derive(Debug, Deserialize)]
struct CombinedEnvelope<'a> {
    #[serde(borrow)]
    stream: Cow<'a, str>,
    #[serde(borrow)]
    data: &'a RawValue,
}

/// Unwraps envelopes and hands the payload to the registry.
pub(crate) struct EnvelopeRouter {
    registry: Arc<SubscriptionRegistry>,
}

impl EnvelopeRouter {
    pub(crate) fn new(registry: Arc<SubscriptionRegistry>) -> Self {
        Self { registry }
    }

    pub(crate) fn route(&self, text: &str) -> Result<PulseOutcome, DecodeError> {
        let envelope: CombinedEnvelope<'_> =
            serde_json::from_str(text).map_err(|e| DecodeError::Envelope {
                reason: e.to_string(),
            })?;
        Ok(self.registry.pulse(&envelope.stream, envelope.data.get()))
    }
}

#[async_trait]
impl ConnectionCallback for EnvelopeRouter {
    async fn on_message(&self, connection_id: ConnectionId, text: &str) {
        if let Err(e) = self.route(text) {
            warn!(connection.id = connection_id, error = %e, "Dropping message");
            BoreasMetrics::decode_failure("envelope");
        }
    }

    async fn on_disconnected(&self, connection_id: ConnectionId, reason: &str) {
        debug!(connection.id = connection_id, reason, "Connection left; next cycle will repack");
    }
}
