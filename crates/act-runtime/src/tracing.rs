//! # Observability & Tracing
//!
//! Every lifecycle step of a process is logged with structured fields:
//!
//! ```text
//! INFO Process started pid=2 name="c1" template="counter" state=0
//! DEBUG Received pid=2 message=Message { id: "inc", args: [5] }
//! INFO Handled pid=2 name="c1" state=5
//! INFO Process destroyed pid=2 reason=Handled
//! ```
//!
//! Logs go to stderr so stdout only carries program output (`show` lines).
//!
//! ```bash
//! RUST_LOG=debug act script.act
//! RUST_LOG=act_runtime::scheduler=trace act script.act
//! ```

use tracing_subscriber::EnvFilter;

/// Initializes the global subscriber. `RUST_LOG` wins over `verbose`.
pub fn setup_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
