pub mod config;
pub mod error;
pub mod limiter;
pub mod http;
pub mod analytics;
pub mod utils;

pub use error::{AppError, LimiterError, Result};
pub use limiter::{AdmissionGate, Permit, RateLimiter, WindowUnit};
