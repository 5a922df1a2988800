//! Stream names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default combined-stream endpoint.
pub const DEFAULT_ENDPOINT: &str = "wss://stream.binance.com:9443/stream";

/// Name of one logical stream, e.g. `btcusdt@kline_1m`.
///
/// Opaque to the multiplexer; the builders below only produce names in the
/// venue's format.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamKey(String);

impl StreamKey {
    /// Wraps an arbitrary stream name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// `{symbol}@kline_{interval}`
    #[must_use]
    pub fn kline(symbol: &str, interval: KlineInterval) -> Self {
        Self(format!("{}@kline_{}", symbol.to_lowercase(), interval.as_str()))
    }

    /// `{symbol}@depth{levels}@1000ms`
    #[must_use]
    pub fn partial_depth(symbol: &str, levels: DepthLevels) -> Self {
        Self(format!(
            "{}@depth{}@1000ms",
            symbol.to_lowercase(),
            levels.count()
        ))
    }

    /// `{symbol}@depth`
    #[must_use]
    pub fn depth(symbol: &str) -> Self {
        Self(format!("{}@depth", symbol.to_lowercase()))
    }

    /// `{symbol}@aggTrade`
    #[must_use]
    pub fn agg_trade(symbol: &str) -> Self {
        Self(format!("{}@aggTrade", symbol.to_lowercase()))
    }

    /// `{symbol}@trade`
    #[must_use]
    pub fn trade(symbol: &str) -> Self {
        Self(format!("{}@trade", symbol.to_lowercase()))
    }

    /// Account and order updates for one listen key.
    ///
    /// The key is used verbatim; listen keys are case-sensitive.
    #[must_use]
    pub fn user_data(listen_key: &str) -> Self {
        Self(listen_key.to_string())
    }

    /// Returns the stream name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamKey {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for StreamKey {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl std::borrow::Borrow<str> for StreamKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for StreamKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Candlestick interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum KlineInterval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "3m")]
    ThreeMinutes,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "2h")]
    TwoHours,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "6h")]
    SixHours,
    #[serde(rename = "8h")]
    EightHours,
    #[serde(rename = "12h")]
    TwelveHours,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "3d")]
    ThreeDays,
    #[serde(rename = "1w")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
}

impl KlineInterval {
    /// Every interval, shortest first.
    pub const ALL: [Self; 15] = [
        Self::OneMinute,
        Self::ThreeMinutes,
        Self::FiveMinutes,
        Self::FifteenMinutes,
        Self::ThirtyMinutes,
        Self::OneHour,
        Self::TwoHours,
        Self::FourHours,
        Self::SixHours,
        Self::EightHours,
        Self::TwelveHours,
        Self::OneDay,
        Self::ThreeDays,
        Self::OneWeek,
        Self::OneMonth,
    ];

    /// Venue notation, e.g. `15m`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::ThreeMinutes => "3m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes => "30m",
            Self::OneHour => "1h",
            Self::TwoHours => "2h",
            Self::FourHours => "4h",
            Self::SixHours => "6h",
            Self::EightHours => "8h",
            Self::TwelveHours => "12h",
            Self::OneDay => "1d",
            Self::ThreeDays => "3d",
            Self::OneWeek => "1w",
            Self::OneMonth => "1M",
        }
    }
}

impl fmt::Display for KlineInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for KlineInterval {
    type Err = String;

    /// Case matters: `1m` is a minute, `1M` a month.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|interval| interval.as_str() == s)
            .ok_or_else(|| format!("unknown kline interval '{s}'"))
    }
}

/// Number of price levels in a partial book stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum DepthLevels {
    Five,
    Ten,
    Twenty,
}

impl DepthLevels {
    /// Level count.
    #[must_use]
    pub fn count(&self) -> u8 {
        match self {
            Self::Five => 5,
            Self::Ten => 10,
            Self::Twenty => 20,
        }
    }
}

impl TryFrom<u8> for DepthLevels {
    type Error = String;

    fn try_from(levels: u8) -> Result<Self, Self::Error> {
        match levels {
            5 => Ok(Self::Five),
            10 => Ok(Self::Ten),
            20 => Ok(Self::Twenty),
            other => Err(format!("depth levels must be 5, 10 or 20, got {other}")),
        }
    }
}

/// Builds `{base}?streams=a/b/c`.
#[must_use]
pub fn combined_endpoint<'a>(base: &str, keys: impl IntoIterator<Item = &'a StreamKey>) -> String {
    let streams: Vec<&str> = keys.into_iter().map(StreamKey::as_str).collect();
    format!("{base}?streams={}", streams.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        assert_eq!(
            StreamKey::kline("BTCUSDT", KlineInterval::OneMinute).as_str(),
            "btcusdt@kline_1m"
        );
        assert_eq!(
            StreamKey::partial_depth("ETHUSDT", DepthLevels::Ten).as_str(),
            "ethusdt@depth10@1000ms"
        );
        assert_eq!(StreamKey::depth("bnbbtc").as_str(), "bnbbtc@depth");
        assert_eq!(StreamKey::agg_trade("BnbBtc").as_str(), "bnbbtc@aggTrade");
        assert_eq!(StreamKey::trade("btcusdt").to_string(), "btcusdt@trade");
    }

    #[test]
    fn test_user_data_keeps_listen_key_case() {
        let key = StreamKey::user_data("pqia91ma19a5s61cv6a81va65sdf19v8a65a1a5s61cv6a81va65sdf19v8a65a1");
        assert_eq!(
            key.as_str(),
            "pqia91ma19a5s61cv6a81va65sdf19v8a65a1a5s61cv6a81va65sdf19v8a65a1"
        );
        assert_eq!(StreamKey::user_data("AbC").as_str(), "AbC");
    }

    #[test]
    fn test_interval_parsing_is_case_sensitive() {
        assert_eq!("1m".parse::<KlineInterval>(), Ok(KlineInterval::OneMinute));
        assert_eq!("1M".parse::<KlineInterval>(), Ok(KlineInterval::OneMonth));
        assert!("2m".parse::<KlineInterval>().is_err());
    }

    #[test]
    fn test_depth_levels() {
        assert_eq!(DepthLevels::try_from(20), Ok(DepthLevels::Twenty));
        assert!(DepthLevels::try_from(15).is_err());
    }

    #[test]
    fn test_combined_endpoint() {
        let keys = vec![StreamKey::from("a@trade"), StreamKey::from("b@trade")];
        assert_eq!(
            combined_endpoint(DEFAULT_ENDPOINT, &keys),
            "wss://stream.binance.com:9443/stream?streams=a@trade/b@trade"
        );
    }

    #[test]
    fn test_serde_transparent() {
        let key = StreamKey::from("btcusdt@trade");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"btcusdt@trade\"");
    }
}
