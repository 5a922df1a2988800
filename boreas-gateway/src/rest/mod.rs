//! Outbound request admission control.
//!
//! The REST collaborator calls [`RateLimiter::admit_request`] with the
//! endpoint weight (or [`RateLimiter::admit_order`] for order submissions)
//! before every HTTP call, and feeds `x-mbx-order-count-*` response headers
//! back through [`RateLimiter::record_order_count_header`].
//!
//! # Example
//!
//! ```ignore
//! use boreas_gateway::rest::{RateLimitConfig, RateLimiter};
//!
//! let limiter = RateLimiter::new(RateLimitConfig::default());
//! limiter.admit_request(5).await?;
//! let response = http.get("/api/v3/depth").send().await?;
//! ```

mod config;
mod rate_limiter;

pub use config::{RateLimitConfig, RateLimitConfigBuilder};
pub use rate_limiter::{RateLimiter, RateWindow};
