//! Connection health assessment.

use boreas_telemetry::metrics::CloseReason;
use std::time::Duration;

use super::config::MultiplexerConfig;

/// Point-in-time view of one connection.
#[derive(Debug, Clone, Copy)]
pub struct HealthSnapshot {
    /// Time since the last received frame.
    pub idle_for: Duration,
    /// Time since the connection was established.
    pub age: Duration,
    /// Whether the receive loop is still running.
    pub alive: bool,
}

/// Decides whether a connection should be closed this cycle.
///
/// Dead and silent connections always go. Aged connections go only while
/// `second_of_minute` is strictly inside the rotation window, so minute
/// boundary events (kline closes) are never split across two sockets.
#[must_use]
pub fn assess(
    snapshot: &HealthSnapshot,
    second_of_minute: u32,
    config: &MultiplexerConfig,
) -> Option<CloseReason> {
    if !snapshot.alive {
        return Some(CloseReason::Dead);
    }
    if snapshot.idle_for > config.watchdog_timeout() {
        return Some(CloseReason::Watchdog);
    }
    let in_window = second_of_minute > config.rotation_window_start_sec
        && second_of_minute < config.rotation_window_end_sec;
    if snapshot.age > config.max_connection_age() && in_window {
        return Some(CloseReason::Aged);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy() -> HealthSnapshot {
        HealthSnapshot {
            idle_for: Duration::from_secs(1),
            age: Duration::from_secs(60),
            alive: true,
        }
    }

    #[test]
    fn test_healthy_is_kept() {
        let config = MultiplexerConfig::default();
        for second in 0..60 {
            assert_eq!(assess(&healthy(), second, &config), None);
        }
    }

    #[test]
    fn test_dead_is_closed() {
        let config = MultiplexerConfig::default();
        let snapshot = HealthSnapshot {
            alive: false,
            ..healthy()
        };
        assert_eq!(assess(&snapshot, 0, &config), Some(CloseReason::Dead));
    }

    #[test]
    fn test_watchdog() {
        let config = MultiplexerConfig::default();
        let snapshot = HealthSnapshot {
            idle_for: Duration::from_secs(31),
            ..healthy()
        };
        assert_eq!(assess(&snapshot, 59, &config), Some(CloseReason::Watchdog));

        let snapshot = HealthSnapshot {
            idle_for: Duration::from_secs(30),
            ..healthy()
        };
        assert_eq!(assess(&snapshot, 59, &config), None);
    }

    #[test]
    fn test_aged_only_inside_window() {
        let config = MultiplexerConfig::default();
        let snapshot = HealthSnapshot {
            age: Duration::from_secs(3 * 3600),
            ..healthy()
        };
        assert_eq!(assess(&snapshot, 15, &config), None);
        assert_eq!(assess(&snapshot, 16, &config), Some(CloseReason::Aged));
        assert_eq!(assess(&snapshot, 44, &config), Some(CloseReason::Aged));
        assert_eq!(assess(&snapshot, 45, &config), None);
        assert_eq!(assess(&snapshot, 0, &config), None);
    }
}
