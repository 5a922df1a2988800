//! The stream multiplexer.

use boreas_core::error::BoreasError;
use boreas_telemetry::metrics::{BoreasMetrics, CloseReason};
use boreas_telemetry::spans::{connection_span, rebuild_span};
use chrono::{Timelike, Utc};
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant as StdInstant;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{Instrument, debug, info, warn};

use super::config::MultiplexerConfig;
use super::health::{HealthSnapshot, assess};
use super::packing::plan;
use super::probe::VenueProbe;
use super::router::EnvelopeRouter;
use crate::stream::{Handler, StreamKey, SubscriptionRegistry, combined_endpoint};
use crate::ws::{ConnectionCallback, ConnectionId, WebSocketConnection};

/// An active connection and the streams it carries.
struct ManagedConnection {
    connection: WebSocketConnection,
    streams: Vec<StreamKey>,
}

/// What one rebuild cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// Connections taken out of the active set.
    pub closed: usize,
    /// Connections opened.
    pub opened: usize,
    /// Batches whose connection failed; their streams wait for the next cycle.
    pub failed: usize,
    /// Unassigned streams found after the health sweep.
    pub orphans: usize,
    /// The cycle did nothing because the probe failed or the multiplexer is closed.
    pub skipped: bool,
}

impl RebuildReport {
    fn outcome(&self) -> &'static str {
        if self.skipped {
            "skipped"
        } else if self.failed > 0 {
            "partial"
        } else {
            "ok"
        }
    }
}

struct Inner {
    config: MultiplexerConfig,
    registry: Arc<SubscriptionRegistry>,
    router: Arc<EnvelopeRouter>,
    probe: RwLock<Option<Arc<dyn VenueProbe>>>,
    active: Mutex<Vec<Arc<ManagedConnection>>>,
    /// Close tasks of retired connections still in their grace period.
    retiring: Mutex<Vec<JoinHandle<()>>>,
    cycle: tokio::sync::Mutex<()>,
    cycles: AtomicU64,
    shutdown: watch::Sender<bool>,
}

/// Packs named streams onto a bounded pool of connections and keeps the
/// pool healthy with a periodic rebuild cycle.
///
/// # Example
///
/// ```ignore
/// use boreas_gateway::multiplexer::{MultiplexerConfig, StreamMultiplexer};
/// use boreas_gateway::stream::{Handler, KlineInterval, StreamKey};
///
/// let mux = StreamMultiplexer::new(MultiplexerConfig::default());
/// mux.start();
///
/// let handler = Handler::new(|kline: &serde_json::Value| println!("{kline}"));
/// mux.subscribe(&StreamKey::kline("BTCUSDT", KlineInterval::OneMinute), handler.clone())?;
/// // ...
/// mux.unsubscribe(&handler);
/// mux.close_all().await;
/// ```
pub struct StreamMultiplexer {
    inner: Arc<Inner>,
    scheduler: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for StreamMultiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamMultiplexer")
            .field("streams", &self.inner.registry.len())
            .field("connections", &self.connection_count())
            .finish_non_exhaustive()
    }
}

impl StreamMultiplexer {
    /// Creates a multiplexer with an empty registry. Nothing runs until [`start`](Self::start).
    #[must_use]
    pub fn new(config: MultiplexerConfig) -> Self {
        let _ = rustls::crypto::ring::default_provider().install_default();

        let registry = Arc::new(SubscriptionRegistry::new());
        let router = Arc::new(EnvelopeRouter::new(Arc::clone(&registry)));
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                config,
                registry,
                router,
                probe: RwLock::new(None),
                active: Mutex::new(Vec::new()),
                retiring: Mutex::new(Vec::new()),
                cycle: tokio::sync::Mutex::new(()),
                cycles: AtomicU64::new(0),
                shutdown,
            }),
            scheduler: Mutex::new(None),
        }
    }

    /// Checks venue availability with `probe` before every cycle.
    #[must_use]
    pub fn with_probe(self, probe: Arc<dyn VenueProbe>) -> Self {
        *self.inner.probe.write() = Some(probe);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &MultiplexerConfig {
        &self.inner.config
    }

    /// Returns the subscription registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.inner.registry
    }

    /// Spawns the rebuild scheduler. Calling it again is a no-op.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let mut scheduler = self.scheduler.lock();
        if scheduler.is_some() {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let created = inner.registry.stream_created();
        let mut shutdown_rx = inner.shutdown.subscribe();
        let period = inner.config.rebuild_interval();

        *scheduler = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                period_ms = inner.config.rebuild_interval_ms,
                "Rebuild scheduler started"
            );

            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {}
                    () = created.notified() => debug!("New stream registered, rebuilding"),
                }
                if *shutdown_rx.borrow() {
                    break;
                }
                inner.rebuild().await;
            }

            info!("Rebuild scheduler stopped");
        }));
    }

    /// Subscribes `handler` to `key`. The stream is served from the next cycle on.
    ///
    /// Returns whether the stream was newly created.
    pub fn subscribe<T>(&self, key: &StreamKey, handler: Handler<T>) -> Result<bool, BoreasError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        Ok(self.inner.registry.subscribe(key, handler)?)
    }

    /// Removes `handler` from every stream. Streams keep being served.
    pub fn unsubscribe<T>(&self, handler: &Handler<T>) -> usize {
        self.inner.registry.unsubscribe(handler)
    }

    /// Runs one rebuild cycle now, waiting for any cycle in progress first.
    pub async fn rebuild_now(&self) -> RebuildReport {
        self.inner.rebuild().await
    }

    /// Number of active connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.inner.active.lock().len()
    }

    /// Streams carried by each active connection.
    #[must_use]
    pub fn assignments(&self) -> BTreeMap<ConnectionId, Vec<StreamKey>> {
        self.inner
            .active
            .lock()
            .iter()
            .map(|managed| (managed.connection.id(), managed.streams.clone()))
            .collect()
    }

    /// Number of retired connections whose transport is not closed yet.
    #[must_use]
    pub fn retiring_count(&self) -> usize {
        let mut retiring = self.inner.retiring.lock();
        retiring.retain(|closer| !closer.is_finished());
        retiring.len()
    }

    /// Stops the scheduler and closes every connection, waiting for their
    /// receive loops to exit. Retired connections skip the rest of their
    /// grace period. The multiplexer cannot be restarted afterwards.
    pub async fn close_all(&self) {
        self.inner.shutdown.send_replace(true);

        let scheduler = self.scheduler.lock().take();
        if let Some(scheduler) = scheduler
            && let Err(e) = scheduler.await
        {
            warn!(error = %e, "Rebuild scheduler ended abnormally");
        }

        // Wait out a concurrent `rebuild_now`.
        let _cycle = self.inner.cycle.lock().await;

        let active: Vec<Arc<ManagedConnection>> = self.inner.active.lock().drain(..).collect();
        let retiring: Vec<JoinHandle<()>> = self.inner.retiring.lock().drain(..).collect();
        let count = active.len() + retiring.len();

        for _ in &active {
            BoreasMetrics::connection_closed(CloseReason::Shutdown);
        }

        // Closers observe the shutdown flag and close at once.
        let (_, closers) = tokio::join!(
            join_all(active.iter().map(|managed| managed.connection.close())),
            join_all(retiring),
        );
        for result in closers {
            if let Err(e) = result {
                warn!(error = %e, "Close task ended abnormally");
            }
        }

        BoreasMetrics::active_connections(0);
        info!(connections = count, "All connections closed");
    }
}

impl Drop for StreamMultiplexer {
    fn drop(&mut self) {
        // Stops the scheduler; connections close as the last references go.
        self.inner.shutdown.send_replace(true);
    }
}

impl Inner {
    async fn rebuild(&self) -> RebuildReport {
        let _cycle = self.cycle.lock().await;
        if *self.shutdown.borrow() {
            return RebuildReport {
                skipped: true,
                ..RebuildReport::default()
            };
        }

        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let started = StdInstant::now();
        let report = self.run_cycle().instrument(rebuild_span(cycle)).await;

        BoreasMetrics::rebuild_cycle(report.outcome(), started.elapsed().as_secs_f64());
        BoreasMetrics::active_connections(self.active.lock().len());
        report
    }

    async fn run_cycle(&self) -> RebuildReport {
        let mut report = RebuildReport::default();

        if !self.probe_venue().await {
            report.skipped = true;
            return report;
        }

        report.closed += self.sweep();

        let (assigned, active_streams): (HashSet<StreamKey>, Vec<Vec<StreamKey>>) = {
            let active = self.active.lock();
            (
                active.iter().flat_map(|m| m.streams.iter().cloned()).collect(),
                active.iter().map(|m| m.streams.clone()).collect(),
            )
        };
        let orphans: Vec<StreamKey> = self
            .registry
            .keys()
            .into_iter()
            .filter(|key| !assigned.contains(key))
            .collect();
        report.orphans = orphans.len();
        if orphans.is_empty() {
            return report;
        }

        let repack = plan(&active_streams, orphans, self.config.streams_per_socket);
        let folded: Vec<ConnectionId> = {
            let active = self.active.lock();
            repack
                .retire
                .iter()
                .filter_map(|&index| active.get(index).map(|m| m.connection.id()))
                .collect()
        };
        for id in folded {
            if self.retire(id, CloseReason::Repacked) {
                report.closed += 1;
            }
        }

        let opened = join_all(repack.batches.into_iter().map(|batch| self.open(batch))).await;
        for managed in opened {
            match managed {
                Some(managed) => {
                    self.active.lock().push(managed);
                    report.opened += 1;
                }
                None => report.failed += 1,
            }
        }

        info!(
            closed = report.closed,
            opened = report.opened,
            failed = report.failed,
            orphans = report.orphans,
            "Rebuild cycle complete"
        );
        report
    }

    async fn probe_venue(&self) -> bool {
        let probe = self.probe.read().clone();
        let Some(probe) = probe else {
            return true;
        };

        let attempts = self.config.probe_attempts.max(1);
        for attempt in 1..=attempts {
            match probe.check().await {
                Ok(()) => return true,
                Err(e) => warn!(attempt, attempts, error = %e, "Venue probe failed"),
            }
        }
        warn!("Venue unavailable, skipping rebuild cycle");
        false
    }

    /// Retires every unhealthy connection. Returns how many were retired.
    fn sweep(&self) -> usize {
        let second = Utc::now().second();
        let flagged: Vec<(ConnectionId, CloseReason)> = self
            .active
            .lock()
            .iter()
            .filter_map(|managed| {
                let snapshot = HealthSnapshot {
                    idle_for: managed.connection.idle_for(),
                    age: managed.connection.age(),
                    alive: managed.connection.is_alive(),
                };
                assess(&snapshot, second, &self.config).map(|reason| (managed.connection.id(), reason))
            })
            .collect();

        flagged
            .into_iter()
            .filter(|&(id, reason)| self.retire(id, reason))
            .count()
    }

    /// Moves a connection out of the active set and closes it after the grace period.
    fn retire(&self, id: ConnectionId, reason: CloseReason) -> bool {
        let managed = {
            let mut active = self.active.lock();
            let Some(position) = active.iter().position(|m| m.connection.id() == id) else {
                return false;
            };
            active.swap_remove(position)
        };

        info!(
            connection.id = id,
            reason = reason.as_str(),
            streams = managed.streams.len(),
            "Retiring connection"
        );
        BoreasMetrics::connection_closed(reason);

        let grace = self.config.close_grace();
        let mut shutdown = self.shutdown.subscribe();
        let closer = tokio::spawn(
            async move {
                tokio::select! {
                    () = tokio::time::sleep(grace) => {}
                    _ = shutdown.wait_for(|closed| *closed) => {}
                }
                managed.connection.close().await;
            }
            .in_current_span(),
        );

        let mut retiring = self.retiring.lock();
        retiring.retain(|closer| !closer.is_finished());
        retiring.push(closer);
        true
    }

    async fn open(&self, streams: Vec<StreamKey>) -> Option<Arc<ManagedConnection>> {
        let connection = WebSocketConnection::new(self.config.connection.clone());
        let span = connection_span(connection.id(), streams.len());
        let endpoint = combined_endpoint(&self.config.endpoint, &streams);
        let callback = Arc::clone(&self.router) as Arc<dyn ConnectionCallback>;

        match connection.connect(&endpoint, callback).instrument(span).await {
            Ok(()) => {
                BoreasMetrics::connection_opened();
                debug!(connection.id = connection.id(), streams = streams.len(), "Batch connected");
                Some(Arc::new(ManagedConnection {
                    connection,
                    streams,
                }))
            }
            Err(e) => {
                BoreasMetrics::connection_failed();
                warn!(
                    connection.id = connection.id(),
                    streams = streams.len(),
                    error = %e,
                    "Batch failed to connect; streams wait for the next cycle"
                );
                None
            }
        }
    }
}
