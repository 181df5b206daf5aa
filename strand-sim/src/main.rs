//! Strand Simulator
//!
//! # Usage
//!
//! ```bash
//! # Run with default workload
//! cargo run -p strand-sim
//!
//! # Heavier contention, JSON logs
//! STRAND_WRITERS=32 STRAND_SHARED_AGGREGATES=1 STRAND_LOG_FORMAT=json cargo run -p strand-sim
//! ```
//!
//! # Environment Variables
//!
//! - `STRAND_LOG_FORMAT`: pretty or json (default: pretty)
//! - `STRAND_WRITERS`: Concurrent writers (default: 8)
//! - `STRAND_BATCHES_PER_WRITER`: Appends per writer (default: 25)
//! - `STRAND_BATCH_SIZE`: Events per append (default: 3)
//! - `STRAND_SHARED_AGGREGATES`: Contended aggregates (default: 2)
//! - `STRAND_MAX_ATTEMPTS`: Attempts per append on conflict (default: 100)
//! - `STRAND_NOTIFY_CAPACITY`: Buffered commit notices, 1 to 65536 (default: 1024)
//! - `STRAND_PROJECTION_PAGE_SIZE`: Global range width (default: 1000)
//! - `STRAND_PROJECTION_POLL_MS`: Projection poll interval (default: 100)

use strand_sim::{simulation, Config, LogFormat};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive("strand_sim=info".parse()?);
    match config.log_format {
        LogFormat::Pretty => tracing_subscriber::registry().with(fmt::layer()).with(filter).init(),
        LogFormat::Json => tracing_subscriber::registry().with(fmt::layer().json()).with(filter).init(),
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        writers = config.workload.writers,
        "Strand simulator"
    );

    // Ctrl-C cancels writers and the projection
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling");
                cancel.cancel();
            }
        });
    }

    let report = simulation::run(&config, cancel).await?;
    if !report.consistent {
        anyhow::bail!("event log failed verification");
    }

    Ok(())
}
