#![warn(missing_docs)]
//! lapbench Runner
//!
//! Application layer over the measurement engine:
//! - `LapConfig` loads `lapbench.toml`
//! - `Runner` measures every registered case and streams events to reporters
//! - `init_logging` installs the `tracing` subscriber
//!
//! # Example
//!
//! ```ignore
//! use lapbench_runner::{LapConfig, Runner, TracingReporter, init_logging};
//! use std::sync::Arc;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LapConfig::discover().unwrap_or_default();
//!     init_logging(config.runner.verbose);
//!
//!     let mut runner = Runner::from_config(&config)?;
//!     runner.add_case(Arc::new(my_case()));
//!     runner.add_reporter(Box::new(TracingReporter));
//!     runner.run()?;
//!     Ok(())
//! }
//! ```

mod config;
mod reporter;
mod runner;

pub use config::*;
pub use reporter::{Reporter, TracingReporter};
pub use runner::{RunSummary, Runner};

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber
///
/// `RUST_LOG` wins when set; otherwise `lapbench=debug` when `verbose`, else
/// `lapbench=info`. Calling this again after a subscriber is installed is a no-op.
pub fn init_logging(verbose: bool) {
    let default_directive = if verbose {
        "lapbench=debug"
    } else {
        "lapbench=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice() {
        init_logging(true);
        init_logging(false);
        tracing::info!("logging initialised");
    }
}
