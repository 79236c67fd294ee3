// tfredact/src/logger.rs
//! Logger setup for the `tfredact` binary.
//!
//! Logs always go to stderr so they never mix with a filtered document on stdout.
//! `RUST_LOG` is honored unless the caller passes an explicit level.

use env_logger::{Builder, Env, Target};
use log::LevelFilter;

/// Default filter when neither `RUST_LOG` nor a flag says otherwise.
pub const DEFAULT_FILTER: &str = "warn";

/// Initializes the global logger. Safe to call more than once; later calls are no-ops.
pub fn init_logger(level_override: Option<LevelFilter>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or(DEFAULT_FILTER));
    if let Some(level) = level_override {
        builder.filter_level(level);
    }
    builder.target(Target::Stderr).format_timestamp(None);
    let _ = builder.try_init();
}

/// Maps the `--quiet` / `--debug` flags to a level override.
pub fn level_from_flags(quiet: bool, debug: bool) -> Option<LevelFilter> {
    match (quiet, debug) {
        (true, _) => Some(LevelFilter::Off),
        (false, true) => Some(LevelFilter::Debug),
        (false, false) => None,
    }
}
