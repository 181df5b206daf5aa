//! Strand Simulator Library
//!
//! Drives concurrent writers and a live projection against one shared
//! event log, then checks the log's ordering guarantees.
//!
//! # Components
//!
//! - **Workload**: writer tasks that append with conflict retry
//! - **Simulation**: spawns writers and the projection worker, verifies the log
//! - **Config**: Environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use strand_sim::{simulation, Config};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("Failed to load config");
//!     let report = simulation::run(&config, CancellationToken::new()).await.expect("Simulation error");
//!     assert!(report.consistent);
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod simulation;
pub mod workload;

// Re-exports for convenience
pub use config::{Config, LogFormat, WorkloadConfig};
pub use error::{SimError, SimResult};
pub use simulation::{run_with_log, SimReport};
pub use workload::{append_with_retry, SimEvent};
