//! Subscription registry.
//!
//! Maps stream keys to typed subscriber lists. Entries are created on first
//! subscription and never removed; only their handlers come and go.

use boreas_core::error::{DecodeError, SubscriptionError};
use boreas_telemetry::metrics::BoreasMetrics;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::any::{Any, type_name};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, trace, warn};

use super::handler::{Handler, HandlerId};
use super::key::StreamKey;

/// Result of routing one payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseOutcome {
    /// No stream is registered under the key; the payload was dropped.
    UnknownStream,
    /// The payload was decoded and handed to this many handlers.
    Delivered(usize),
    /// The payload did not decode into the stream's type and was dropped.
    DecodeFailed,
}

/// Type-erased view of a [`TypedStream`].
trait StreamSink: Send + Sync {
    fn pulse(&self, raw: &str) -> PulseOutcome;
    fn remove_handler(&self, id: HandlerId) -> bool;
    fn handler_count(&self) -> usize;
    fn payload_type(&self) -> &'static str;
}

/// One stream and its subscribers.
pub struct TypedStream<T> {
    key: StreamKey,
    handlers: RwLock<Vec<Handler<T>>>,
}

impl<T> TypedStream<T> {
    fn new(key: StreamKey) -> Self {
        Self {
            key,
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Stream key.
    #[must_use]
    pub fn key(&self) -> &StreamKey {
        &self.key
    }

    /// Adds `handler` unless it is already subscribed. Returns whether it was added.
    pub fn add_handler(&self, handler: Handler<T>) -> bool {
        let mut handlers = self.handlers.write();
        if handlers.iter().any(|h| *h == handler) {
            return false;
        }
        handlers.push(handler);
        true
    }

    /// Current number of handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// True when nobody is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Hands `payload` to every handler in subscription order.
    ///
    /// The list is snapshotted first so handlers may subscribe or
    /// unsubscribe without deadlocking.
    pub fn dispatch(&self, payload: &T) -> usize {
        let handlers = self.handlers.read().clone();
        for handler in &handlers {
            handler.call(payload);
        }
        handlers.len()
    }
}

impl<T> StreamSink for TypedStream<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    fn pulse(&self, raw: &str) -> PulseOutcome {
        let payload: T = match serde_json::from_str(raw) {
            Ok(payload) => payload,
            Err(e) => {
                let error = DecodeError::Payload {
                    stream: self.key.to_string(),
                    payload_type: type_name::<T>().to_string(),
                    reason: e.to_string(),
                };
                warn!(stream = %self.key, error = %error, "Dropping undecodable payload");
                BoreasMetrics::decode_failure("payload");
                return PulseOutcome::DecodeFailed;
            }
        };

        BoreasMetrics::message_received(self.key.as_str());
        PulseOutcome::Delivered(self.dispatch(&payload))
    }

    fn remove_handler(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|h| h.id() != id);
        handlers.len() != before
    }

    fn handler_count(&self) -> usize {
        self.len()
    }

    fn payload_type(&self) -> &'static str {
        type_name::<T>()
    }
}

struct StreamEntry {
    sink: Arc<dyn StreamSink>,
    any: Arc<dyn Any + Send + Sync>,
}

/// Registry of all known streams.
pub struct SubscriptionRegistry {
    streams: DashMap<StreamKey, StreamEntry>,
    created: Arc<Notify>,
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("streams", &self.streams.len())
            .finish()
    }
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            streams: DashMap::new(),
            created: Arc::new(Notify::new()),
        }
    }

    /// Signalled every time a new stream is registered.
    #[must_use]
    pub fn stream_created(&self) -> Arc<Notify> {
        Arc::clone(&self.created)
    }

    /// Returns the stream for `key`, registering it if needed.
    ///
    /// The flag is true when the stream was created by this call.
    pub fn get_or_create<T>(
        &self,
        key: &StreamKey,
    ) -> Result<(Arc<TypedStream<T>>, bool), SubscriptionError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let (any, created) = match self.streams.entry(key.clone()) {
            Entry::Occupied(entry) => {
                let existing = entry.get();
                if existing.sink.payload_type() != type_name::<T>() {
                    return Err(SubscriptionError::TypeMismatch {
                        stream: key.to_string(),
                        registered: existing.sink.payload_type().to_string(),
                        requested: type_name::<T>().to_string(),
                    });
                }
                (Arc::clone(&existing.any), false)
            }
            Entry::Vacant(entry) => {
                let stream = Arc::new(TypedStream::<T>::new(key.clone()));
                entry.insert(StreamEntry {
                    sink: Arc::clone(&stream) as Arc<dyn StreamSink>,
                    any: Arc::clone(&stream) as Arc<dyn Any + Send + Sync>,
                });
                (stream as Arc<dyn Any + Send + Sync>, true)
            }
        };

        if created {
            debug!(stream = %key, payload_type = type_name::<T>(), "Stream registered");
            self.created.notify_one();
        }

        let stream = any
            .downcast::<TypedStream<T>>()
            .map_err(|_| SubscriptionError::TypeMismatch {
                stream: key.to_string(),
                registered: "unknown".to_string(),
                requested: type_name::<T>().to_string(),
            })?;
        Ok((stream, created))
    }

    /// Subscribes `handler` to `key`, creating the stream if needed.
    ///
    /// Subscribing the same handler twice is a no-op. Returns whether the
    /// stream was newly created.
    pub fn subscribe<T>(&self, key: &StreamKey, handler: Handler<T>) -> Result<bool, SubscriptionError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let (stream, created) = self.get_or_create::<T>(key)?;
        if !stream.add_handler(handler) {
            trace!(stream = %key, "Handler already subscribed");
        }
        Ok(created)
    }

    /// Removes `handler` from every stream. Returns how many streams held it.
    pub fn unsubscribe<T>(&self, handler: &Handler<T>) -> usize {
        let id = handler.id();
        let sinks: Vec<Arc<dyn StreamSink>> = self
            .streams
            .iter()
            .map(|entry| Arc::clone(&entry.value().sink))
            .collect();
        sinks.iter().filter(|sink| sink.remove_handler(id)).count()
    }

    /// Decodes `raw` as the payload type of `key` and dispatches it.
    pub fn pulse(&self, key: &str, raw: &str) -> PulseOutcome {
        let sink = match self.streams.get(key) {
            Some(entry) => Arc::clone(&entry.sink),
            None => {
                debug!(stream = key, "Dropping payload for unknown stream");
                BoreasMetrics::unknown_stream();
                return PulseOutcome::UnknownStream;
            }
        };
        sink.pulse(raw)
    }

    /// All registered keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<StreamKey> {
        let mut keys: Vec<StreamKey> = self.streams.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Number of registered streams.
    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    /// True when no stream is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// True when `key` is registered.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.streams.contains_key(key)
    }

    /// Handler count for `key`, `None` if unknown.
    #[must_use]
    pub fn handler_count(&self, key: &str) -> Option<usize> {
        self.streams.get(key).map(|entry| entry.sink.handler_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Trade {
        p: String,
        q: String,
    }

    fn recording<T: Clone + Send + 'static>() -> (Handler<T>, Arc<Mutex<Vec<T>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler = Handler::new(move |payload: &T| sink.lock().push(payload.clone()));
        (handler, seen)
    }

    #[test]
    fn test_subscribe_creates_once() {
        let registry = SubscriptionRegistry::new();
        let key = StreamKey::from("btcusdt@trade");
        let (handler, _) = recording::<String>();
        let (other, _) = recording::<String>();

        assert!(registry.subscribe(&key, handler).unwrap());
        assert!(!registry.subscribe(&key, other).unwrap());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.handler_count("btcusdt@trade"), Some(2));
    }

    #[test]
    fn test_subscribe_is_idempotent() {
        let registry = SubscriptionRegistry::new();
        let key = StreamKey::from("btcusdt@trade");
        let (handler, seen) = recording::<u64>();

        registry.subscribe(&key, handler.clone()).unwrap();
        registry.subscribe(&key, handler.clone()).unwrap();
        assert_eq!(registry.handler_count(key.as_str()), Some(1));

        assert_eq!(registry.pulse("btcusdt@trade", "7"), PulseOutcome::Delivered(1));
        assert_eq!(*seen.lock(), vec![7]);
    }

    #[test]
    fn test_type_mismatch() {
        let registry = SubscriptionRegistry::new();
        let key = StreamKey::from("btcusdt@trade");
        registry.subscribe(&key, Handler::new(|_: &u64| {})).unwrap();

        let err = registry
            .subscribe(&key, Handler::new(|_: &String| {}))
            .unwrap_err();
        assert!(matches!(err, SubscriptionError::TypeMismatch { .. }));
        assert_eq!(registry.handler_count(key.as_str()), Some(1));
    }

    #[test]
    fn test_pulse_outcomes() {
        let registry = SubscriptionRegistry::new();
        let key = StreamKey::from("btcusdt@trade");
        let (handler, seen) = recording::<String>();
        registry
            .subscribe(&key, Handler::new(move |t: &Trade| handler.call(&t.p)))
            .unwrap();

        assert_eq!(
            registry.pulse("btcusdt@trade", r#"{"p":"1.5","q":"2"}"#),
            PulseOutcome::Delivered(1)
        );
        assert_eq!(
            registry.pulse("btcusdt@trade", r#"{"p":1}"#),
            PulseOutcome::DecodeFailed
        );
        assert_eq!(
            registry.pulse("ethusdt@trade", r#"{"p":"1","q":"1"}"#),
            PulseOutcome::UnknownStream
        );
        assert_eq!(*seen.lock(), vec!["1.5".to_string()]);
    }

    #[test]
    fn test_delivery_order_follows_subscription() {
        let registry = SubscriptionRegistry::new();
        let key = StreamKey::from("s");
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b", "c"] {
            let order = Arc::clone(&order);
            registry
                .subscribe(&key, Handler::new(move |_: &u8| order.lock().push(tag)))
                .unwrap();
        }
        registry.pulse("s", "1");
        assert_eq!(*order.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unsubscribe_only_that_handler() {
        let registry = SubscriptionRegistry::new();
        let first = StreamKey::from("a@trade");
        let second = StreamKey::from("b@trade");
        let (kept, kept_seen) = recording::<u32>();
        let (removed, removed_seen) = recording::<u32>();

        registry.subscribe(&first, kept.clone()).unwrap();
        registry.subscribe(&first, removed.clone()).unwrap();
        registry.subscribe(&second, removed.clone()).unwrap();

        assert_eq!(registry.unsubscribe(&removed), 2);
        assert_eq!(registry.unsubscribe(&removed), 0);

        registry.pulse("a@trade", "1");
        registry.pulse("b@trade", "2");
        assert_eq!(*kept_seen.lock(), vec![1]);
        assert!(removed_seen.lock().is_empty());

        // Streams outlive their handlers.
        assert!(registry.contains("b@trade"));
        assert_eq!(registry.pulse("b@trade", "3"), PulseOutcome::Delivered(0));
    }

    #[test]
    fn test_handler_may_unsubscribe_itself() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let key = StreamKey::from("s");
        let slot: Arc<Mutex<Option<Handler<u8>>>> = Arc::new(Mutex::new(None));

        let handler = {
            let registry = Arc::clone(&registry);
            let slot = Arc::clone(&slot);
            Handler::new(move |_: &u8| {
                if let Some(me) = slot.lock().take() {
                    registry.unsubscribe(&me);
                }
            })
        };
        *slot.lock() = Some(handler.clone());
        registry.subscribe(&key, handler).unwrap();

        assert_eq!(registry.pulse("s", "1"), PulseOutcome::Delivered(1));
        assert_eq!(registry.pulse("s", "1"), PulseOutcome::Delivered(0));
    }

    #[tokio::test]
    async fn test_creation_notifies() {
        let registry = SubscriptionRegistry::new();
        let notify = registry.stream_created();
        registry
            .subscribe(&StreamKey::from("x"), Handler::new(|_: &u8| {}))
            .unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), notify.notified())
            .await
            .unwrap();
    }

    #[test]
    fn test_keys_sorted() {
        let registry = SubscriptionRegistry::new();
        for name in ["c", "a", "b"] {
            registry
                .subscribe(&StreamKey::from(name), Handler::new(|_: &u8| {}))
                .unwrap();
        }
        let keys: Vec<String> = registry.keys().iter().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }
}
