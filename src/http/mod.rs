//! HTTP client module
//!
//! Provides the HTTP transport used to reach the search backend.
//!
//! # Features
//!
//! - **Error Classification**: non-2xx payloads become typed backend errors
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Opt-in Retries**: Constant, linear, and exponential backoff (disabled by default)
//! - **Authentication**: Integration with auth module

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
