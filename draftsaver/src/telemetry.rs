//! Tracing initialization.
//!
//! Installs a `tracing-subscriber` registry with a console fmt layer. Verbosity is taken from
//! `RUST_LOG` and defaults to `info`:
//!
//! ```bash
//! RUST_LOG=draftsaver=debug draftsaver -f draftsaver.yaml
//! ```

use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::error::Result;

/// Initialize tracing for the process.
///
/// Log lines go to stderr so they do not interleave with the interactive
/// output on stdout.
pub fn init_telemetry() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    info!("Telemetry initialized");
    Ok(())
}
