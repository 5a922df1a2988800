//! Weighted sliding-window rate limiter for requests and orders.

use super::config::RateLimitConfig;
use boreas_core::error::RateLimitError;
use boreas_telemetry::metrics::BoreasMetrics;
use boreas_telemetry::spans::admission_span;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{Instrument, debug, trace};

const ORDER_COUNT_HEADER_PREFIX: &str = "x-mbx-order-count-";

/// A rolling admission window.
///
/// Holds one timestamp per admitted unit. At any instant the number of
/// entries with `now - entry <= interval` never exceeds `capacity`.
#[derive(Debug)]
pub struct RateWindow {
    name: &'static str,
    capacity: u32,
    interval: Duration,
    entries: Mutex<VecDeque<Instant>>,
}

impl RateWindow {
    /// Creates an empty window.
    #[must_use]
    pub fn new(name: &'static str, capacity: u32, interval: Duration) -> Self {
        Self {
            name,
            capacity,
            interval,
            entries: Mutex::new(VecDeque::with_capacity(capacity as usize)),
        }
    }

    fn prune(entries: &mut VecDeque<Instant>, now: Instant, interval: Duration) {
        while let Some(&oldest) = entries.front() {
            if now.saturating_duration_since(oldest) > interval {
                entries.pop_front();
            } else {
                break;
            }
        }
    }

    fn check_weight(&self, weight: u32) -> Result<(), RateLimitError> {
        if weight > self.capacity {
            return Err(RateLimitError::CapacityExceeded {
                window: self.name.to_string(),
                requested: weight,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Admits `weight` units if they fit right now.
    pub fn try_admit(&self, weight: u32) -> Result<bool, RateLimitError> {
        self.check_weight(weight)?;
        if weight == 0 {
            return Ok(true);
        }

        let mut entries = self.entries.lock();
        let now = Instant::now();
        Self::prune(&mut entries, now, self.interval);
        if entries.len() + weight as usize > self.capacity as usize {
            return Ok(false);
        }
        entries.extend(std::iter::repeat_n(now, weight as usize));
        Ok(true)
    }

    /// Waits until `weight` units fit, records them and returns the time waited.
    ///
    /// Only the calling task is suspended; the lock is never held while sleeping.
    pub async fn admit(&self, weight: u32, poll_delay: Duration) -> Result<Duration, RateLimitError> {
        let started = Instant::now();
        while !self.try_admit(weight)? {
            tokio::time::sleep(poll_delay).await;
        }
        Ok(started.elapsed())
    }

    /// Number of units currently inside the window.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn in_window(&self) -> u32 {
        let mut entries = self.entries.lock();
        Self::prune(&mut entries, Instant::now(), self.interval);
        entries.len() as u32
    }

    /// Like [`in_window`](Self::in_window) but gives up after `timeout`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn try_in_window(&self, timeout: Duration) -> Option<u32> {
        let mut entries = self.entries.try_lock_for(timeout)?;
        Self::prune(&mut entries, Instant::now(), self.interval);
        Some(entries.len() as u32)
    }

    /// Forgets every admitted unit.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Window name used in errors, logs and metrics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Maximum units inside the window.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Window length.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Admission control for weighted requests and order submissions.
///
/// The two windows are independent and have their own locks.
///
/// ```
/// use boreas_gateway::rest::{RateLimitConfig, RateLimiter};
///
/// let limiter = RateLimiter::new(RateLimitConfig::default());
/// assert!(limiter.try_admit_request(5).unwrap());
/// // 5 units in a 10 s slice of a one-minute budget
/// assert_eq!(limiter.current_request_rate(), 30);
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    requests: RateWindow,
    orders: RateWindow,
    order_counts: Mutex<BTreeMap<String, u64>>,
}

impl RateLimiter {
    /// Creates a limiter from its configuration.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        let requests = RateWindow::new(
            "requests",
            config.request_capacity(),
            config.request_interval(),
        );
        let orders = RateWindow::new("orders", config.order_capacity(), config.order_interval());
        Self {
            config,
            requests,
            orders,
            order_counts: Mutex::new(BTreeMap::new()),
        }
    }

    /// Waits until `weight` request units can be admitted.
    ///
    /// Weight 0 returns at once. A weight above the window capacity fails
    /// immediately with [`RateLimitError::CapacityExceeded`].
    pub async fn admit_request(&self, weight: u32) -> Result<(), RateLimitError> {
        self.admit(&self.requests, weight).await
    }

    /// Waits until one order can be admitted.
    pub async fn admit_order(&self) -> Result<(), RateLimitError> {
        self.admit(&self.orders, 1).await
    }

    async fn admit(&self, window: &RateWindow, weight: u32) -> Result<(), RateLimitError> {
        if !self.config.enabled {
            return Ok(());
        }

        let waited = window
            .admit(weight, self.config.poll_delay())
            .instrument(admission_span(window.name(), weight))
            .await?;

        if !waited.is_zero() {
            debug!(
                window = window.name(),
                weight,
                waited_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                "Admission delayed"
            );
        }
        BoreasMetrics::rate_limit_admitted(window.name(), weight, waited.as_secs_f64());
        Ok(())
    }

    /// Admits `weight` request units only if they fit right now.
    pub fn try_admit_request(&self, weight: u32) -> Result<bool, RateLimitError> {
        if !self.config.enabled {
            return Ok(true);
        }
        self.requests.try_admit(weight)
    }

    /// Admits one order only if it fits right now.
    pub fn try_admit_order(&self) -> Result<bool, RateLimitError> {
        if !self.config.enabled {
            return Ok(true);
        }
        self.orders.try_admit(1)
    }

    /// Request weight in the current window, scaled to one minute.
    ///
    /// Returns the nominal per-minute capacity if the window lock cannot be
    /// taken within the snapshot timeout.
    #[must_use]
    pub fn current_request_rate(&self) -> u32 {
        let divisor = self.config.window_divisor.max(1);
        self.requests
            .try_in_window(self.config.snapshot_timeout())
            .unwrap_or_else(|| {
                trace!("Request window busy, reporting capacity");
                self.requests.capacity()
            })
            .saturating_mul(divisor)
    }

    /// Orders currently inside the order window.
    #[must_use]
    pub fn current_order_rate(&self) -> u32 {
        self.orders.in_window()
    }

    /// Stores a venue-reported order counter header.
    ///
    /// Only `x-mbx-order-count-*` headers with a numeric value are kept.
    /// Returns whether the header was recorded.
    pub fn record_order_count_header(&self, name: &str, value: &str) -> bool {
        let name = name.trim().to_ascii_lowercase();
        if !name.starts_with(ORDER_COUNT_HEADER_PREFIX) {
            return false;
        }
        let Ok(count) = value.trim().parse::<u64>() else {
            debug!(header = %name, value, "Ignoring non-numeric order count header");
            return false;
        };
        self.order_counts.lock().insert(name, count);
        true
    }

    /// Venue-reported order counters, sorted by header name.
    #[must_use]
    pub fn order_counts(&self) -> Vec<(String, u64)> {
        self.order_counts
            .lock()
            .iter()
            .map(|(name, count)| (name.clone(), *count))
            .collect()
    }

    /// Clears both windows and the recorded order counters.
    pub fn reset(&self) {
        self.requests.clear();
        self.orders.clear();
        self.order_counts.lock().clear();
    }

    /// The request weight window.
    #[must_use]
    pub fn request_window(&self) -> &RateWindow {
        &self.requests
    }

    /// The order window.
    #[must_use]
    pub fn order_window(&self) -> &RateWindow {
        &self.orders
    }

    /// The limiter configuration.
    #[must_use]
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const POLL: Duration = Duration::from_millis(20);

    fn full_rate_config() -> RateLimitConfig {
        RateLimitConfig::builder().rate_limit_factor(1.0).build()
    }

    #[tokio::test(start_paused = true)]
    async fn test_third_batch_waits_for_window() {
        let window = RateWindow::new("requests", 10, Duration::from_secs(1));
        let started = Instant::now();

        assert_eq!(window.admit(4, POLL).await.unwrap(), Duration::ZERO);
        assert_eq!(window.admit(4, POLL).await.unwrap(), Duration::ZERO);
        let waited = window.admit(4, POLL).await.unwrap();

        assert!(waited >= Duration::from_secs(1));
        assert!(started.elapsed() >= Duration::from_secs(1));
        assert_eq!(window.in_window(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_on_boundary_still_counts() {
        let window = RateWindow::new("orders", 1, Duration::from_secs(1));
        assert!(window.try_admit(1).unwrap());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!window.try_admit(1).unwrap());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(window.try_admit(1).unwrap());
    }

    #[test]
    fn test_oversized_weight_rejected() {
        let window = RateWindow::new("requests", 10, Duration::from_secs(1));
        let err = window.try_admit(11).unwrap_err();
        assert_eq!(
            err,
            RateLimitError::CapacityExceeded {
                window: "requests".to_string(),
                requested: 11,
                capacity: 10,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_admit_does_not_hang() {
        let limiter = RateLimiter::new(full_rate_config());
        let result = limiter.admit_request(201).await;
        assert!(matches!(
            result,
            Err(RateLimitError::CapacityExceeded { capacity: 200, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_weight_records_nothing() {
        let limiter = RateLimiter::new(full_rate_config());
        limiter.admit_request(0).await.unwrap();
        assert_eq!(limiter.request_window().in_window(), 0);
        assert_eq!(limiter.current_request_rate(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_never_exceeds_capacity() {
        let window = RateWindow::new("requests", 10, Duration::from_secs(1));
        for weight in [3, 7, 1, 9, 2, 2, 5, 10, 4, 6] {
            window.admit(weight, POLL).await.unwrap();
            assert!(window.in_window() <= 10);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_admissions() {
        let window = Arc::new(RateWindow::new("requests", 10, Duration::from_secs(1)));
        let handles: Vec<_> = (0..5)
            .map(|_| {
                let window = Arc::clone(&window);
                tokio::spawn(async move { window.admit(4, POLL).await })
            })
            .collect();

        let mut max_seen = 0;
        for handle in handles {
            handle.await.unwrap().unwrap();
            max_seen = max_seen.max(window.in_window());
        }
        assert!(max_seen <= 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_window_uses_stretched_interval() {
        let limiter = RateLimiter::new(full_rate_config());
        let started = Instant::now();
        for _ in 0..10 {
            limiter.admit_order().await.unwrap();
        }
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(limiter.current_order_rate(), 10);

        limiter.admit_order().await.unwrap();
        assert!(started.elapsed() > Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_negative_stretch_falls_back_to_one_second() {
        let config = RateLimitConfig::builder()
            .rate_limit_factor(1.0)
            .order_interval_factor(-1.0)
            .build();
        let limiter = RateLimiter::new(config);
        assert_eq!(limiter.order_window().interval(), Duration::from_secs(1));

        let started = Instant::now();
        for _ in 0..11 {
            limiter.admit_order().await.unwrap();
        }
        assert!(started.elapsed() >= Duration::from_secs(1));
        assert!(started.elapsed() < Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_and_order_windows_independent() {
        let limiter = RateLimiter::new(full_rate_config());
        limiter.admit_request(200).await.unwrap();
        assert!(!limiter.try_admit_request(1).unwrap());
        assert!(limiter.try_admit_order().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_current_request_rate_is_scaled() {
        let limiter = RateLimiter::new(full_rate_config());
        limiter.admit_request(5).await.unwrap();
        assert_eq!(limiter.current_request_rate(), 30);
    }

    #[test]
    fn test_snapshot_falls_back_to_capacity_when_busy() {
        let config = RateLimitConfig::builder()
            .rate_limit_factor(1.0)
            .snapshot_timeout(Duration::from_millis(10))
            .build();
        let limiter = RateLimiter::new(config);

        let _held = limiter.requests.entries.lock();
        assert_eq!(limiter.current_request_rate(), 1200);
    }

    #[tokio::test]
    async fn test_disabled_admits_everything() {
        let limiter = RateLimiter::new(RateLimitConfig::builder().enabled(false).build());
        limiter.admit_request(100_000).await.unwrap();
        assert!(limiter.try_admit_order().unwrap());
        assert_eq!(limiter.current_request_rate(), 0);
    }

    #[test]
    fn test_order_count_headers() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        assert!(limiter.record_order_count_header("X-MBX-ORDER-COUNT-1D", "42"));
        assert!(limiter.record_order_count_header("x-mbx-order-count-10s", "3"));
        assert!(!limiter.record_order_count_header("x-mbx-used-weight-1m", "10"));
        assert!(!limiter.record_order_count_header("x-mbx-order-count-1m", "n/a"));

        assert_eq!(
            limiter.order_counts(),
            vec![
                ("x-mbx-order-count-10s".to_string(), 3),
                ("x-mbx-order-count-1d".to_string(), 42),
            ]
        );

        limiter.reset();
        assert!(limiter.order_counts().is_empty());
    }
}
