//! Local rate limiter exercise.
//!
//! Drives the limiter with synthetic traffic so the effect of the
//! `rate_limit` settings can be observed without touching the venue.

use std::time::Instant;

use anyhow::Result;
use boreas_gateway::rest::RateLimiter;
use clap::Parser;

use crate::config::BoreasConfig;

/// Arguments for the limits command
#[derive(Parser)]
pub struct LimitsArgs {
    /// Number of requests to admit
    #[arg(short, long, default_value = "10")]
    pub requests: u32,

    /// Weight of each request
    #[arg(short, long, default_value = "1")]
    pub weight: u32,

    /// Number of orders to admit
    #[arg(short, long, default_value = "0")]
    pub orders: u32,
}

/// Runs the limits command.
pub async fn run(args: LimitsArgs, config: &BoreasConfig) -> Result<()> {
    let limiter = RateLimiter::new(config.rate_limit.clone());
    let windows = limiter.config();

    println!("Rate Limiter");
    println!("============");
    println!(
        "Requests: {} weight per {:?} (enabled: {})",
        windows.request_capacity(),
        windows.request_interval(),
        windows.enabled
    );
    println!(
        "Orders:   {} per {:?}",
        windows.order_capacity(),
        windows.order_interval()
    );
    println!();

    let started = Instant::now();
    for n in 1..=args.requests {
        let before = Instant::now();
        limiter.admit_request(args.weight).await?;
        println!(
            "request {n:>4}  weight {:>3}  waited {:>8.3}s  at {:>8.3}s  rate {}",
            args.weight,
            before.elapsed().as_secs_f64(),
            started.elapsed().as_secs_f64(),
            limiter.current_request_rate()
        );
    }

    for n in 1..=args.orders {
        let before = Instant::now();
        limiter.admit_order().await?;
        println!(
            "order   {n:>4}  waited {:>8.3}s  at {:>8.3}s  in window {}",
            before.elapsed().as_secs_f64(),
            started.elapsed().as_secs_f64(),
            limiter.current_order_rate()
        );
    }

    println!();
    println!("Current request rate: {} / min", limiter.current_request_rate());
    println!("Current order rate:   {}", limiter.current_order_rate());
    println!("Total time:           {:.3}s", started.elapsed().as_secs_f64());

    Ok(())
}
