use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize structured logging with tracing.
///
/// `RUST_LOG` wins when set. Otherwise the crate logs at `info`, or at
/// `debug` when `verbose` is requested from the command line.
pub fn init_logging(verbose: bool) {
    let default_directive = if verbose {
        "info,mo_agent_core=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}
