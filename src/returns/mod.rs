//! Return series construction.
//!
//! Turns a close series into daily simple returns and a trailing sample
//! standard deviation of those returns:
//! - Returns rounded to a fixed number of decimals
//! - Volatility undefined until a full window of returns exists
//! - O(n) total cost via a running-sum window

pub mod builder;
pub mod rolling;

pub use builder::{ReturnSeriesBuilder, ReturnSeriesConfig, MAX_RETURN_DECIMALS};
pub use rolling::RollingStd;
