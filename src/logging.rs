//! Logging setup.
//!
//! Logs go to stderr so they never mix with patch text on stdout.
//!
//! ## Environment Variables
//!
//! 1. **`PATCHWORK_LOG`** (highest priority): a bare level such as `debug`
//!    applies to this crate only; anything with `=`, `:` or `,` is used as a
//!    full filter
//! 2. **`RUST_LOG`**: standard tracing filter
//! 3. **Default**: `warn` globally, `info` for this crate (`debug` with
//!    `--verbose`)

use std::env;
use tracing_subscriber::{EnvFilter, fmt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Install the stderr subscriber.
///
/// Safe to call more than once; later calls report an error and change
/// nothing.
pub fn init(verbose: bool) -> Result<(), BoxError> {
    fmt()
        .with_env_filter(create_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
}

/// Initialize logging for tests. Never fails, even if another test got there
/// first.
pub fn test() {
    let _ = fmt()
        .with_env_filter(create_filter(false))
        .with_test_writer()
        .try_init();
}

fn create_filter(verbose: bool) -> EnvFilter {
    if let Ok(level) = env::var("PATCHWORK_LOG") {
        return expand_patchwork_log(&level);
    }

    if let Ok(rust_log) = env::var("RUST_LOG") {
        return EnvFilter::new(rust_log);
    }

    if verbose {
        EnvFilter::new("warn,git_patchwork=debug")
    } else {
        EnvFilter::new("warn,git_patchwork=info")
    }
}

fn expand_patchwork_log(value: &str) -> EnvFilter {
    if value.contains('=') || value.contains(':') || value.contains(',') {
        return EnvFilter::new(value);
    }
    EnvFilter::new(format!("warn,git_patchwork={value}"))
}
