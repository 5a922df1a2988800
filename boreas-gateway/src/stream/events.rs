//! Event-type routing for streams that carry several payload shapes.
//!
//! The user-data stream delivers account, balance, order and order-list
//! updates on one listen key. Every message names its shape in the `e`
//! field, so one [`EventRouter`] subscribes to the stream and hands each
//! message to the handlers registered for its event type.
//!
//! ```ignore
//! let events = EventRouter::new(StreamKey::user_data(&listen_key));
//! events.on(event_type::EXECUTION_REPORT, Handler::new(|r: &ExecutionReport| { /* ... */ }))?;
//! mux.subscribe(events.key(), events.handler())?;
//! ```

use boreas_core::error::{DecodeError, SubscriptionError};
use boreas_telemetry::metrics::BoreasMetrics;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, warn};

use super::handler::Handler;
use super::key::StreamKey;
use super::registry::{PulseOutcome, SubscriptionRegistry};

/// Event types published on the user-data stream.
pub mod event_type {
    /// Full account snapshot (legacy).
    pub const OUTBOUND_ACCOUNT_INFO: &str = "outboundAccountInfo";
    /// Balances changed by an account update.
    pub const OUTBOUND_ACCOUNT_POSITION: &str = "outboundAccountPosition";
    /// Deposit, withdrawal or transfer.
    pub const BALANCE_UPDATE: &str = "balanceUpdate";
    /// Order placed, changed, filled or cancelled.
    pub const EXECUTION_REPORT: &str = "executionReport";
    /// OCO order-list update.
    pub const LIST_STATUS: &str = "listStatus";
}

/// `{"e": "...", ...}`
#[derive(Debug, Deserialize)]
struct EventTag<'a> {
    #[serde(rename = "e", borrow)]
    event: Cow<'a, str>,
}

/// Dispatches messages of one stream by their `e` field.
///
/// Handlers per event type are kept in a [`SubscriptionRegistry`] keyed by
/// event name, so typing, deduplication and decode failures behave exactly
/// like stream subscriptions.
pub struct EventRouter {
    key: StreamKey,
    events: Arc<SubscriptionRegistry>,
    handler: Handler<Box<RawValue>>,
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("key", &self.key)
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl EventRouter {
    /// Creates a router for the stream `key`.
    #[must_use]
    pub fn new(key: StreamKey) -> Self {
        let events = Arc::new(SubscriptionRegistry::new());
        let routed = Arc::clone(&events);
        let stream = key.clone();
        let handler = Handler::<Box<RawValue>>::new(move |raw| {
            if let Err(e) = route_event(&routed, &stream, raw.get()) {
                warn!(stream = %stream, error = %e, "Dropping message");
                BoreasMetrics::decode_failure("event");
            }
        });
        Self {
            key,
            events,
            handler,
        }
    }

    /// Stream this router serves.
    #[must_use]
    pub fn key(&self) -> &StreamKey {
        &self.key
    }

    /// The handler to subscribe to [`key`](Self::key). Every call returns the
    /// same handler, so subscribing it twice is a no-op.
    #[must_use]
    pub fn handler(&self) -> Handler<Box<RawValue>> {
        self.handler.clone()
    }

    /// Registers `handler` for messages whose `e` is `event_type`.
    ///
    /// Returns whether the event type was seen for the first time. An event
    /// type already bound to another payload type fails with
    /// [`SubscriptionError::TypeMismatch`].
    pub fn on<T>(&self, event_type: &str, handler: Handler<T>) -> Result<bool, SubscriptionError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.events.subscribe(&StreamKey::new(event_type), handler)
    }

    /// Removes `handler` from every event type. Returns how many held it.
    pub fn off<T>(&self, handler: &Handler<T>) -> usize {
        self.events.unsubscribe(handler)
    }

    /// Routes one message by its event type.
    pub fn route(&self, raw: &str) -> Result<PulseOutcome, DecodeError> {
        route_event(&self.events, &self.key, raw)
    }

    /// Event types with at least one registration, sorted.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.keys().into_iter().map(|key| key.to_string()).collect()
    }
}

fn route_event(
    events: &SubscriptionRegistry,
    stream: &StreamKey,
    raw: &str,
) -> Result<PulseOutcome, DecodeError> {
    let tag: EventTag<'_> = serde_json::from_str(raw).map_err(|e| DecodeError::EventType {
        stream: stream.to_string(),
        reason: e.to_string(),
    })?;

    if !events.contains(&tag.event) {
        debug!(stream = %stream, event = %tag.event, "No handler for event type");
        return Ok(PulseOutcome::UnknownStream);
    }
    Ok(events.pulse(&tag.event, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug, Deserialize, PartialEq)]
    struct BalanceUpdate {
        #[serde(rename = "a")]
        asset: String,
        #[serde(rename = "d")]
        delta: String,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct ExecutionReport {
        #[serde(rename = "s")]
        symbol: String,
        #[serde(rename = "x")]
        execution_type: String,
    }

    fn router() -> EventRouter {
        EventRouter::new(StreamKey::user_data("listen-key"))
    }

    #[test]
    fn test_routes_by_event_type() {
        let events = router();
        let balances = Arc::new(Mutex::new(Vec::new()));
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&balances);
        events
            .on(
                event_type::BALANCE_UPDATE,
                Handler::new(move |b: &BalanceUpdate| sink.lock().push(b.asset.clone())),
            )
            .unwrap();
        let sink = Arc::clone(&reports);
        events
            .on(
                event_type::EXECUTION_REPORT,
                Handler::new(move |r: &ExecutionReport| sink.lock().push(r.execution_type.clone())),
            )
            .unwrap();

        let outcome = events
            .route(r#"{"e":"balanceUpdate","E":1573200697110,"a":"BTC","d":"100.00000000"}"#)
            .unwrap();
        assert_eq!(outcome, PulseOutcome::Delivered(1));
        let outcome = events
            .route(r#"{"e":"executionReport","s":"ETHBTC","x":"TRADE"}"#)
            .unwrap();
        assert_eq!(outcome, PulseOutcome::Delivered(1));

        assert_eq!(*balances.lock(), vec!["BTC".to_string()]);
        assert_eq!(*reports.lock(), vec!["TRADE".to_string()]);
    }

    #[test]
    fn test_unhandled_event_is_dropped() {
        let events = router();
        events
            .on(event_type::BALANCE_UPDATE, Handler::new(|_: &BalanceUpdate| {}))
            .unwrap();

        let outcome = events.route(r#"{"e":"listStatus","s":"ETHBTC"}"#).unwrap();
        assert_eq!(outcome, PulseOutcome::UnknownStream);
    }

    #[test]
    fn test_missing_event_type() {
        let err = router().route(r#"{"a":"BTC"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::EventType { .. }));
        assert_eq!(err.stream(), Some("listen-key"));
    }

    #[test]
    fn test_bad_payload_only_affects_that_message() {
        let events = router();
        let seen = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&seen);
        events
            .on(
                event_type::BALANCE_UPDATE,
                Handler::new(move |_: &BalanceUpdate| *counter.lock() += 1),
            )
            .unwrap();

        let outcome = events.route(r#"{"e":"balanceUpdate","a":7}"#).unwrap();
        assert_eq!(outcome, PulseOutcome::DecodeFailed);
        events
            .route(r#"{"e":"balanceUpdate","a":"BNB","d":"1.0"}"#)
            .unwrap();
        assert_eq!(*seen.lock(), 1);
    }

    #[test]
    fn test_event_type_bound_to_one_payload_type() {
        let events = router();
        events
            .on(event_type::EXECUTION_REPORT, Handler::new(|_: &ExecutionReport| {}))
            .unwrap();
        let err = events
            .on(event_type::EXECUTION_REPORT, Handler::new(|_: &BalanceUpdate| {}))
            .unwrap_err();
        assert!(matches!(err, SubscriptionError::TypeMismatch { .. }));
    }

    #[test]
    fn test_off_and_event_types() {
        let events = router();
        let handler = Handler::new(|_: &serde_json::Value| {});
        events.on(event_type::LIST_STATUS, handler.clone()).unwrap();
        events
            .on(event_type::OUTBOUND_ACCOUNT_POSITION, handler.clone())
            .unwrap();
        assert_eq!(
            events.event_types(),
            vec!["listStatus".to_string(), "outboundAccountPosition".to_string()]
        );

        assert_eq!(events.off(&handler), 2);
        let outcome = events.route(r#"{"e":"listStatus"}"#).unwrap();
        assert_eq!(outcome, PulseOutcome::Delivered(0));
    }

    #[test]
    fn test_handler_identity_is_stable() {
        let events = router();
        let registry = SubscriptionRegistry::new();
        registry.subscribe(events.key(), events.handler()).unwrap();
        registry.subscribe(events.key(), events.handler()).unwrap();
        assert_eq!(registry.handler_count("listen-key"), Some(1));
    }

    #[test]
    fn test_end_to_end_through_stream_registry() {
        let events = router();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        events
            .on(
                event_type::EXECUTION_REPORT,
                Handler::new(move |r: &ExecutionReport| sink.lock().push(r.symbol.clone())),
            )
            .unwrap();

        let registry = SubscriptionRegistry::new();
        registry.subscribe(events.key(), events.handler()).unwrap();
        let outcome = registry.pulse(
            "listen-key",
            r#"{"e":"executionReport","s":"BNBUSDT","x":"NEW"}"#,
        );
        assert_eq!(outcome, PulseOutcome::Delivered(1));
        assert_eq!(*seen.lock(), vec!["BNBUSDT".to_string()]);
    }
}
