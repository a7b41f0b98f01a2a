//! Stratified sampling of tabular records and descriptive statistics on the
//! resulting sample.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod report;

pub use config::{SampleConfig, StatsConfig};
pub use error::{ErrorCategory, SampleError};
