//! Log setup for hosts embedding the executor.
//!
//! The crate itself only emits `tracing` events; `init` installs a stderr
//! subscriber. `RUST_LOG` wins when set, otherwise `FROZENFLOW_TRACE` picks
//! the level (`1` for debug, `full` for trace, anything else for warn).
use std::env;

use tracing_subscriber::EnvFilter;

pub const TRACE_ENV: &str = "FROZENFLOW_TRACE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceLevel {
    Off,
    Basic,
    Full,
}

impl TraceLevel {
    fn directive(self) -> &'static str {
        match self {
            TraceLevel::Off => "warn",
            TraceLevel::Basic => "frozenflow=debug,warn",
            TraceLevel::Full => "frozenflow=trace,warn",
        }
    }
}

pub fn parse_trace_level(value: &str) -> TraceLevel {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" => TraceLevel::Basic,
        "full" => TraceLevel::Full,
        _ => TraceLevel::Off,
    }
}

pub fn trace_level() -> TraceLevel {
    env::var(TRACE_ENV)
        .ok()
        .as_deref()
        .map(parse_trace_level)
        .unwrap_or(TraceLevel::Off)
}

/// Install the global subscriber. Calling it again is a no-op.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(trace_level().directive()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
