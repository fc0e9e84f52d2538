//! The ordered-fallback resolution chain.

mod cache;
mod rate_limiter;
mod resolver;

pub use cache::PriceCache;
pub use rate_limiter::{RateLimitConfig, RateLimiter};
pub use resolver::PriceResolver;
