//! Logging for the flourish binary.

mod args;
mod logging;

pub use args::LogArgs;
pub use logging::{build_filter, init_logging};
