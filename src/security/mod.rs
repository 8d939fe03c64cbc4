//! Security module for the LeetCoach gateway
//!
//! Provides the gating and hardening stages of the request pipeline:
//! - Origin admission
//! - Sliding window rate limiting
//! - Security headers
//! - CORS configuration

mod admission;
mod headers;
mod middleware;
mod rate_limit;

pub use admission::*;
pub use headers::*;
pub use middleware::*;
pub use rate_limit::{spawn_sweeper, Admission, Clock, RateLimitStage, RateLimiter, SystemClock};

#[cfg(test)]
pub(crate) use rate_limit::tests::ManualClock;
