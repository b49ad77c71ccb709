//! Rate limiting and circuit breaking shared by every upstream client
//! (§4.A, §4.B).

pub mod circuit_breaker;
pub mod error;
pub mod rate_limiter;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState, SharedStateStore};
pub use error::{ResilienceError, Result};
pub use rate_limiter::RateLimiter;
