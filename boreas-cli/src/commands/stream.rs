//! Live stream subscription.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use boreas_gateway::multiplexer::StreamMultiplexer;
use boreas_gateway::stream::{
    DepthLevels, EventRouter, Handler, KlineInterval, StreamKey, event_type,
};
use clap::Parser;
use tracing::info;

use crate::config::BoreasConfig;

/// Arguments for the stream command
#[derive(Parser)]
pub struct StreamArgs {
    /// Raw stream names (e.g. btcusdt@aggTrade)
    pub keys: Vec<String>,

    /// Kline stream as SYMBOL:INTERVAL (e.g. BTCUSDT:1m)
    #[arg(long = "kline", value_name = "SYMBOL:INTERVAL")]
    pub klines: Vec<String>,

    /// Partial book stream as SYMBOL:LEVELS (e.g. ETHUSDT:5)
    #[arg(long = "depth", value_name = "SYMBOL:LEVELS")]
    pub depths: Vec<String>,

    /// Account stream listen key; prints account, balance and order events
    #[arg(long, value_name = "KEY")]
    pub listen_key: Option<String>,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(short, long, value_name = "SECS")]
    pub duration: Option<u64>,

    /// Only count messages, do not print them
    #[arg(short, long)]
    pub quiet: bool,
}

impl StreamArgs {
    fn stream_keys(&self) -> Result<Vec<StreamKey>> {
        let mut keys: Vec<StreamKey> = self.keys.iter().map(|k| StreamKey::from(k.as_str())).collect();

        for spec in &self.klines {
            let (symbol, interval) = split_pair(spec, "--kline")?;
            let interval: KlineInterval = interval.parse().map_err(anyhow::Error::msg)?;
            keys.push(StreamKey::kline(symbol, interval));
        }

        for spec in &self.depths {
            let (symbol, levels) = split_pair(spec, "--depth")?;
            let levels: u8 = levels
                .parse()
                .with_context(|| format!("--depth {spec}: levels must be a number"))?;
            let levels = DepthLevels::try_from(levels).map_err(anyhow::Error::msg)?;
            keys.push(StreamKey::partial_depth(symbol, levels));
        }

        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

fn split_pair<'a>(spec: &'a str, flag: &str) -> Result<(&'a str, &'a str)> {
    match spec.split_once(':') {
        Some((left, right)) if !left.is_empty() && !right.is_empty() => Ok((left, right)),
        _ => bail!("{flag} expects SYMBOL:VALUE, got '{spec}'"),
    }
}

/// Runs the stream command.
pub async fn run(args: StreamArgs, config: &BoreasConfig) -> Result<()> {
    let keys = args.stream_keys()?;
    if keys.is_empty() && args.listen_key.is_none() {
        bail!("no streams given; pass stream names, --kline, --depth or --listen-key");
    }

    let mux = StreamMultiplexer::new(config.multiplexer.clone());
    let mut counters: BTreeMap<StreamKey, Arc<AtomicU64>> = BTreeMap::new();

    for key in &keys {
        let counter = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&counter);
        let name = key.to_string();
        let quiet = args.quiet;
        let handler = Handler::new(move |payload: &serde_json::Value| {
            seen.fetch_add(1, Ordering::Relaxed);
            if !quiet {
                println!("{name} {payload}");
            }
        });
        mux.subscribe(key, handler)?;
        counters.insert(key.clone(), counter);
    }

    if let Some(listen_key) = &args.listen_key {
        let events = EventRouter::new(StreamKey::user_data(listen_key));
        let counter = Arc::new(AtomicU64::new(0));
        for name in [
            event_type::OUTBOUND_ACCOUNT_INFO,
            event_type::OUTBOUND_ACCOUNT_POSITION,
            event_type::BALANCE_UPDATE,
            event_type::EXECUTION_REPORT,
            event_type::LIST_STATUS,
        ] {
            let seen = Arc::clone(&counter);
            let quiet = args.quiet;
            events.on(
                name,
                Handler::new(move |payload: &serde_json::Value| {
                    seen.fetch_add(1, Ordering::Relaxed);
                    if !quiet {
                        println!("{name} {payload}");
                    }
                }),
            )?;
        }
        mux.subscribe(events.key(), events.handler())?;
        counters.insert(events.key().clone(), counter);
    }

    info!(
        streams = counters.len(),
        endpoint = %config.multiplexer.endpoint,
        "Starting multiplexer"
    );
    mux.start();

    match args.duration {
        Some(secs) => {
            tokio::select! {
                () = tokio::time::sleep(Duration::from_secs(secs)) => {}
                signal = tokio::signal::ctrl_c() => signal?,
            }
        }
        None => tokio::signal::ctrl_c().await?,
    }

    info!("Shutting down");
    mux.close_all().await;

    println!();
    println!("{:<40} {:>10}", "STREAM", "MESSAGES");
    for (key, counter) in &counters {
        println!("{:<40} {:>10}", key.as_str(), counter.load(Ordering::Relaxed));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &[&str]) -> StreamArgs {
        let mut argv = vec!["stream"];
        argv.extend_from_slice(line);
        StreamArgs::parse_from(argv)
    }

    #[test]
    fn test_keys_from_all_flags() {
        let keys = args(&[
            "btcusdt@aggTrade",
            "--kline",
            "BTCUSDT:1m",
            "--depth",
            "ethusdt:5",
            "--kline",
            "BTCUSDT:1m",
        ])
        .stream_keys()
        .unwrap();

        let names: Vec<&str> = keys.iter().map(StreamKey::as_str).collect();
        assert_eq!(
            names,
            vec!["btcusdt@aggTrade", "btcusdt@kline_1m", "ethusdt@depth5@1000ms"]
        );
    }

    #[test]
    fn test_bad_specs() {
        assert!(args(&["--kline", "BTCUSDT"]).stream_keys().is_err());
        assert!(args(&["--kline", "BTCUSDT:7m"]).stream_keys().is_err());
        assert!(args(&["--depth", "BTCUSDT:7"]).stream_keys().is_err());
        assert!(args(&["--depth", ":5"]).stream_keys().is_err());
    }

    #[test]
    fn test_listen_key_is_not_a_market_stream() {
        let parsed = args(&["--listen-key", "AbCdEf"]);
        assert_eq!(parsed.listen_key.as_deref(), Some("AbCdEf"));
        assert!(parsed.stream_keys().unwrap().is_empty());
    }
}
